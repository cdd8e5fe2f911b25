//! Hierarchical state machine execution engine

use crate::{QStateReturn, StateHierarchy, StateId, StatePath};
use qf4rs_core::QEvent;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of dispatching one event through the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A state in the active chain consumed the event without transition
    Handled,
    /// The event triggered a transition; `to` is the resting leaf after
    /// the initial-transition cascade
    Transition { from: StateId, to: StateId },
    /// No state from the leaf up to the root handled the event.
    /// Normal protocol behavior, not an error; the leaf is unchanged.
    Unhandled,
}

/// State machine execution context
///
/// Holds the current leaf position against a shared, read-only
/// [`StateHierarchy`]. The leaf is owned by whichever thread drives
/// `dispatch`; concurrent readers must synchronize externally (the
/// active-object layer wraps the whole engine in a mutex).
pub struct QHsm {
    hierarchy: Arc<StateHierarchy>,
    leaf: StateId,
}

impl QHsm {
    /// Create a new machine resting on the hierarchy root
    ///
    /// No actions run until [`init`](Self::init) performs the start-up
    /// cascade.
    pub fn new(hierarchy: Arc<StateHierarchy>) -> Self {
        let leaf = hierarchy.root();
        Self { hierarchy, leaf }
    }

    /// The shared hierarchy this machine executes against
    pub fn hierarchy(&self) -> &Arc<StateHierarchy> {
        &self.hierarchy
    }

    /// The current leaf state
    pub fn leaf(&self) -> StateId {
        self.leaf
    }

    /// Name of the current leaf state
    pub fn current_name(&self) -> &str {
        self.hierarchy.name(self.leaf)
    }

    /// Whether the machine is in `state`
    ///
    /// True for the current leaf and every state on its ancestor chain.
    pub fn is_in(&self, state: StateId) -> bool {
        self.hierarchy.is_descendant(self.leaf, state)
    }

    /// Execute the top-most initial transition
    ///
    /// Enters the root and cascades through initial-transition targets
    /// until a resting leaf is reached. Must run before the first
    /// `dispatch`; the active-object layer calls it when its thread
    /// starts.
    pub fn init(&mut self) {
        let root = self.hierarchy.root();
        self.leaf = root;
        self.hierarchy.enter(root);
        self.run_initial_cascade();
        debug!(leaf = %self.current_name(), "initialized");
    }

    /// Dispatch one event through the state hierarchy
    ///
    /// The handler of the current leaf runs first; states that ignore
    /// the event defer to their ancestors, so behavior is inherited up
    /// the chain until the root is exhausted.
    pub fn dispatch(&mut self, event: &dyn QEvent) -> DispatchOutcome {
        let mut cursor = Some(self.leaf);
        while let Some(state) = cursor {
            match self.hierarchy.handle(state, event) {
                QStateReturn::Handled => {
                    trace!(signal = %event.signal(), state = %self.hierarchy.name(state), "handled");
                    return DispatchOutcome::Handled;
                }
                QStateReturn::Transition(target) => {
                    let from = self.leaf;
                    self.transition(target);
                    debug!(
                        signal = %event.signal(),
                        from = %self.hierarchy.name(from),
                        to = %self.current_name(),
                        "transition"
                    );
                    return DispatchOutcome::Transition { from, to: self.leaf };
                }
                QStateReturn::Ignored => cursor = self.hierarchy.parent_of(state),
            }
        }
        trace!(signal = %event.signal(), leaf = %self.current_name(), "unhandled");
        DispatchOutcome::Unhandled
    }

    /// Execute a transition from the current leaf to `target`
    fn transition(&mut self, target: StateId) {
        let source = self.leaf;

        // Exit/entry boundary. When the target already lies on the
        // source's ancestor chain (self-transition included) the
        // boundary moves to the target's parent, so the target is
        // exited and re-entered rather than skipped.
        let boundary = if self.hierarchy.is_descendant(source, target) {
            self.hierarchy.parent_of(target)
        } else {
            self.hierarchy.lca(source, target)
        };

        // Exit set: source up to the boundary, leaf-most first.
        let mut cursor = Some(source);
        while let Some(state) = cursor {
            if Some(state) == boundary {
                break;
            }
            self.hierarchy.exit(state);
            cursor = self.hierarchy.parent_of(state);
        }

        // Entry set: boundary (exclusive) down to the target, top-down.
        self.enter_down_to(boundary, target);
        self.leaf = target;

        self.run_initial_cascade();
    }

    /// Resolve initial transitions until the machine rests on a leaf
    ///
    /// Mandatory after every transition and at start: a composite state
    /// reached without a deeper target drills into its initial target,
    /// recursively, entering every state along the way.
    fn run_initial_cascade(&mut self) {
        while let Some(target) = self.hierarchy.initial_of(self.leaf) {
            trace!(
                from = %self.current_name(),
                to = %self.hierarchy.name(target),
                "initial transition"
            );
            self.enter_down_to(Some(self.leaf), target);
            self.leaf = target;
        }
    }

    /// Enter every state strictly below `boundary` on the path to
    /// `target`, outermost first
    fn enter_down_to(&mut self, boundary: Option<StateId>, target: StateId) {
        let mut entry_set = StatePath::new();
        for state in self.hierarchy.ancestor_chain(target) {
            if Some(state) == boundary {
                break;
            }
            // Depth was validated at build time; the push cannot fail.
            if entry_set.push(state).is_err() {
                break;
            }
        }
        for state in entry_set.iter().rev() {
            self.hierarchy.enter(*state);
        }
    }
}
