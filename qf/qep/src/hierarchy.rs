//! Immutable state hierarchy: arena of state nodes with parent links
//!
//! The hierarchy is built once by [`HierarchyBuilder`], validated at
//! construction, and never mutated afterwards, so it can be shared by
//! reference across machine instances and threads without locking.

use crate::MAX_STATE_DEPTH;
use core::fmt;
use qf4rs_core::QEvent;
use tracing::trace;

/// Identifier of a state node within its [`StateHierarchy`]
///
/// An index into the node arena. Parent links are ids rather than
/// references, so the tree has no lifetime or cycle concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub(crate) usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({})", self.0)
    }
}

/// State handler return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QStateReturn {
    /// Event was handled in this state
    Handled,
    /// Event was not handled, try the parent state
    Ignored,
    /// Transition to a new state
    Transition(StateId),
}

/// Event handler capability attached to a state node
pub type StateHandler = Box<dyn Fn(&dyn QEvent) -> QStateReturn + Send + Sync>;

/// Entry or exit action attached to a state node
pub type StateAction = Box<dyn Fn() + Send + Sync>;

/// Bounded leaf-to-root path through the hierarchy
pub type StatePath = heapless::Vec<StateId, MAX_STATE_DEPTH>;

/// Malformed-hierarchy errors, detected by [`HierarchyBuilder::build`]
///
/// Structural problems are fatal at construction time; a hierarchy that
/// builds successfully can never fail structurally during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// The builder contains no root state
    #[error("hierarchy has no root state")]
    NoRoot,
    /// More than one state has no parent
    #[error("hierarchy has multiple roots: {first:?} and {second:?}")]
    MultipleRoots { first: String, second: String },
    /// A parent chain does not terminate at the root
    #[error("parent chain of state {state:?} does not terminate")]
    CycleDetected { state: String },
    /// A state is nested deeper than [`MAX_STATE_DEPTH`]
    #[error("state {state:?} exceeds the maximum nesting depth of {MAX_STATE_DEPTH}")]
    DepthExceeded { state: String },
    /// An initial-transition target is not a strict descendant of its owner
    #[error("initial target {target:?} is not a strict descendant of {state:?}")]
    InitialTargetNotDescendant { state: String, target: String },
}

struct StateNode {
    name: String,
    parent: Option<StateId>,
    initial: Option<StateId>,
    entry: Option<StateAction>,
    exit: Option<StateAction>,
    handler: Option<StateHandler>,
}

/// Builder for an immutable [`StateHierarchy`]
///
/// States are added top-down ([`state`](Self::state) for the root,
/// [`child`](Self::child) below it), behavior is attached per node, and
/// [`build`](Self::build) validates the whole structure.
#[derive(Default)]
pub struct HierarchyBuilder {
    nodes: Vec<StateNode>,
}

impl HierarchyBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a root-level state
    ///
    /// A valid hierarchy has exactly one; a second call makes
    /// [`build`](Self::build) fail with `MultipleRoots`.
    pub fn state(&mut self, name: &str) -> StateId {
        self.add(name, None)
    }

    /// Add a state nested under `parent`
    pub fn child(&mut self, name: &str, parent: StateId) -> StateId {
        self.add(name, Some(parent))
    }

    fn add(&mut self, name: &str, parent: Option<StateId>) -> StateId {
        let id = StateId(self.nodes.len());
        self.nodes.push(StateNode {
            name: name.to_owned(),
            parent,
            initial: None,
            entry: None,
            exit: None,
            handler: None,
        });
        id
    }

    /// Attach an entry action to a state
    pub fn on_entry(&mut self, state: StateId, action: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.nodes[state.0].entry = Some(Box::new(action));
        self
    }

    /// Attach an exit action to a state
    pub fn on_exit(&mut self, state: StateId, action: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.nodes[state.0].exit = Some(Box::new(action));
        self
    }

    /// Attach the event handler capability of a state
    ///
    /// A state without a handler ignores every event, deferring to its
    /// ancestors.
    pub fn on_event(
        &mut self,
        state: StateId,
        handler: impl Fn(&dyn QEvent) -> QStateReturn + Send + Sync + 'static,
    ) -> &mut Self {
        self.nodes[state.0].handler = Some(Box::new(handler));
        self
    }

    /// Set the initial-transition target of a composite state
    ///
    /// The target must be a strict descendant of `state`; it is entered
    /// automatically whenever `state` is reached without a deeper
    /// explicit target.
    pub fn initial(&mut self, state: StateId, target: StateId) -> &mut Self {
        self.nodes[state.0].initial = Some(target);
        self
    }

    /// Validate the structure and freeze it into a [`StateHierarchy`]
    pub fn build(self) -> Result<StateHierarchy, StructuralError> {
        let mut root = None;
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.parent.is_none() {
                match root {
                    None => root = Some(StateId(idx)),
                    Some(first) => {
                        return Err(StructuralError::MultipleRoots {
                            first: self.nodes[first.0].name.clone(),
                            second: node.name.clone(),
                        })
                    }
                }
            }
        }
        let root = root.ok_or(StructuralError::NoRoot)?;

        let hierarchy = StateHierarchy { nodes: self.nodes, root };

        // Every parent chain must terminate at the root within the
        // depth bound; ids are handed out parent-first, but the walk
        // guards against future construction paths all the same.
        for idx in 0..hierarchy.nodes.len() {
            let mut depth = 1;
            let mut cursor = StateId(idx);
            while let Some(parent) = hierarchy.parent_of(cursor) {
                depth += 1;
                if depth > hierarchy.nodes.len() {
                    return Err(StructuralError::CycleDetected {
                        state: hierarchy.nodes[idx].name.clone(),
                    });
                }
                cursor = parent;
            }
            if cursor != root {
                return Err(StructuralError::CycleDetected {
                    state: hierarchy.nodes[idx].name.clone(),
                });
            }
            if depth > MAX_STATE_DEPTH {
                return Err(StructuralError::DepthExceeded {
                    state: hierarchy.nodes[idx].name.clone(),
                });
            }
        }

        // Initial-transition targets must be strict descendants of the
        // state that declares them.
        for idx in 0..hierarchy.nodes.len() {
            if let Some(target) = hierarchy.nodes[idx].initial {
                let owner = StateId(idx);
                if target == owner || !hierarchy.is_descendant(target, owner) {
                    return Err(StructuralError::InitialTargetNotDescendant {
                        state: hierarchy.nodes[idx].name.clone(),
                        target: hierarchy.nodes[target.0].name.clone(),
                    });
                }
            }
        }

        Ok(hierarchy)
    }
}

/// Immutable tree of state nodes, shared read-only by machine instances
pub struct StateHierarchy {
    nodes: Vec<StateNode>,
    root: StateId,
}

impl StateHierarchy {
    /// The single root of the hierarchy
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Name of a state
    pub fn name(&self, state: StateId) -> &str {
        &self.nodes[state.0].name
    }

    /// Parent of a state, `None` for the root
    pub fn parent_of(&self, state: StateId) -> Option<StateId> {
        self.nodes[state.0].parent
    }

    /// Initial-transition target of a composite state
    pub fn initial_of(&self, state: StateId) -> Option<StateId> {
        self.nodes[state.0].initial
    }

    /// Number of states in the hierarchy
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the hierarchy holds no states
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Path from a state up to the root, the state itself first
    pub fn ancestor_chain(&self, state: StateId) -> StatePath {
        let mut path = StatePath::new();
        let mut cursor = Some(state);
        while let Some(s) = cursor {
            // Depth was validated at build time; the push cannot fail.
            if path.push(s).is_err() {
                break;
            }
            cursor = self.parent_of(s);
        }
        path
    }

    /// Least common ancestor of two states
    ///
    /// Always `Some` for states of the same hierarchy, since the tree is
    /// single-rooted.
    pub fn lca(&self, a: StateId, b: StateId) -> Option<StateId> {
        let path_a = self.ancestor_chain(a);
        for candidate in self.ancestor_chain(b) {
            if path_a.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Whether `state` is a strict or non-strict descendant of `ancestor`
    pub(crate) fn is_descendant(&self, state: StateId, ancestor: StateId) -> bool {
        self.ancestor_chain(state).contains(&ancestor)
    }

    pub(crate) fn enter(&self, state: StateId) {
        trace!(state = %self.name(state), "enter");
        if let Some(action) = &self.nodes[state.0].entry {
            action();
        }
    }

    pub(crate) fn exit(&self, state: StateId) {
        trace!(state = %self.name(state), "exit");
        if let Some(action) = &self.nodes[state.0].exit {
            action();
        }
    }

    pub(crate) fn handle(&self, state: StateId, event: &dyn QEvent) -> QStateReturn {
        match &self.nodes[state.0].handler {
            Some(handler) => handler(event),
            None => QStateReturn::Ignored,
        }
    }
}
