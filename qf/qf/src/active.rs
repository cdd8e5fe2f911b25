//! Active object trait and thread-per-object implementation

use crate::{EventQueue, OverflowPolicy, PriorityRegistry, DEFAULT_QUEUE_CAPACITY};
use core::fmt;
use parking_lot::Mutex;
use qf4rs_core::{QError, QEvent, QPriority, QResult};
use qf4rs_qep::{QHsm, StateHierarchy, StateId};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info_span, trace};

/// Public contract of an active object
///
/// Active objects are encapsulated, event-driven concurrent objects that:
/// - Have their own event queue
/// - Execute in their own thread of control
/// - Communicate via asynchronous message passing
/// - Implement hierarchical state machines
pub trait QActive: Send + Sync {
    /// Start the object's thread of execution under a unique priority
    ///
    /// Returns `AlreadyStarted` on a second call (the object keeps
    /// running under its original priority) and `PriorityConflict` when
    /// another object holds the priority (the object stays not-started).
    fn start(&self, priority: QPriority) -> QResult<()>;

    /// Stop the object: terminate its thread after any in-flight
    /// dispatch completes and discard the queued backlog
    fn stop(&self) -> QResult<()>;

    /// The priority of this object; `QPriority::UNSET` before start
    fn priority(&self) -> QPriority;

    /// Post an event at the tail of the object's queue (FIFO)
    fn post_fifo(&self, event: Box<dyn QEvent>) -> QResult<()>;

    /// Post an event at the head of the object's queue (LIFO)
    fn post_lifo(&self, event: Box<dyn QEvent>) -> QResult<()>;

    /// Whether the state machine is in the given state
    ///
    /// A machine whose current leaf is `s` is in `s` and in every
    /// ancestor of `s`.
    fn is_in_state(&self, state: StateId) -> bool;

    /// Name of the deepest state the machine is currently in
    fn current_state_name(&self) -> String;
}

/// Active object lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QLifecycleState {
    /// Constructed, thread not yet launched; posts are queued
    NotStarted,
    /// Thread running, events being dispatched
    Running,
    /// Thread terminated, backlog discarded
    Stopped,
}

impl fmt::Display for QLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QLifecycleState::NotStarted => write!(f, "NotStarted"),
            QLifecycleState::Running => write!(f, "Running"),
            QLifecycleState::Stopped => write!(f, "Stopped"),
        }
    }
}

struct Shared<const N: usize> {
    queue: EventQueue<N>,
    hsm: Mutex<QHsm>,
    // Raw priority value; 0 is the unset sentinel. Written once at
    // start, read by producers without taking the control lock.
    priority: AtomicU8,
}

struct Control {
    lifecycle: QLifecycleState,
    thread: Option<JoinHandle<()>>,
}

/// Thread-per-object active object
///
/// Binds one [`QHsm`] to one [`EventQueue`], one priority identity, and
/// one dedicated thread. Dispatch is run-to-completion: the engine mutex
/// is held for the whole of each dispatch, so producers reading
/// [`current_state_name`](QActive::current_state_name) observe either
/// the state before an event or the state after it, never a half-done
/// transition.
pub struct ActiveObject<const N: usize = DEFAULT_QUEUE_CAPACITY> {
    shared: Arc<Shared<N>>,
    registry: Arc<PriorityRegistry>,
    control: Mutex<Control>,
}

impl<const N: usize> ActiveObject<N> {
    /// Create a not-yet-started active object over a shared hierarchy
    ///
    /// The queue uses the default reject-new overflow policy. Events may
    /// be posted immediately; they are drained once the thread starts.
    pub fn new(hierarchy: Arc<StateHierarchy>, registry: Arc<PriorityRegistry>) -> Self {
        Self::with_policy(hierarchy, registry, OverflowPolicy::RejectNew)
    }

    /// Create an active object with an explicit queue overflow policy
    pub fn with_policy(
        hierarchy: Arc<StateHierarchy>,
        registry: Arc<PriorityRegistry>,
        policy: OverflowPolicy,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: EventQueue::with_policy(policy),
                hsm: Mutex::new(QHsm::new(hierarchy)),
                priority: AtomicU8::new(QPriority::UNSET.raw()),
            }),
            registry,
            control: Mutex::new(Control {
                lifecycle: QLifecycleState::NotStarted,
                thread: None,
            }),
        }
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> QLifecycleState {
        self.control.lock().lifecycle
    }

    /// Number of events waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }
}

impl<const N: usize> QActive for ActiveObject<N> {
    fn start(&self, priority: QPriority) -> QResult<()> {
        let mut control = self.control.lock();
        if control.lifecycle != QLifecycleState::NotStarted {
            return Err(QError::AlreadyStarted);
        }
        self.registry.acquire(priority)?;

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name(format!("qf-ao-{}", priority.raw()))
            .spawn(move || event_loop(shared, priority));
        let handle = match handle {
            Ok(handle) => handle,
            Err(_) => {
                self.registry.release(priority);
                return Err(QError::Internal);
            }
        };

        self.shared.priority.store(priority.raw(), Ordering::Release);
        control.lifecycle = QLifecycleState::Running;
        control.thread = Some(handle);
        Ok(())
    }

    fn stop(&self) -> QResult<()> {
        let mut control = self.control.lock();
        if control.lifecycle == QLifecycleState::Stopped {
            return Ok(());
        }
        control.lifecycle = QLifecycleState::Stopped;

        // Closing discards the backlog and wakes the consumer, which
        // exits after finishing whatever dispatch is in flight.
        self.shared.queue.close();
        if let Some(handle) = control.thread.take() {
            let _ = handle.join();
        }

        let priority = self.priority();
        if priority.is_set() {
            self.registry.release(priority);
        }
        Ok(())
    }

    fn priority(&self) -> QPriority {
        QPriority::new_unchecked(self.shared.priority.load(Ordering::Acquire))
    }

    fn post_fifo(&self, event: Box<dyn QEvent>) -> QResult<()> {
        self.shared.queue.post_fifo(event)
    }

    fn post_lifo(&self, event: Box<dyn QEvent>) -> QResult<()> {
        self.shared.queue.post_lifo(event)
    }

    fn is_in_state(&self, state: StateId) -> bool {
        self.shared.hsm.lock().is_in(state)
    }

    fn current_state_name(&self) -> String {
        self.shared.hsm.lock().current_name().to_owned()
    }
}

impl<const N: usize> Drop for ActiveObject<N> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Dedicated thread body: top-most initial transition, then one event
/// at a time until the queue closes
fn event_loop<const N: usize>(shared: Arc<Shared<N>>, priority: QPriority) {
    let span = info_span!("active_object", %priority);
    let _guard = span.enter();

    shared.hsm.lock().init();

    while let Some(event) = shared.queue.take_next() {
        let mut hsm = shared.hsm.lock();
        let outcome = hsm.dispatch(event.as_ref());
        trace!(signal = %event.signal(), ?outcome, "dispatched");
    }
}
