//! Priority registry: process-wide uniqueness of active-object priorities
//!
//! The registry is an explicit collaborator handed to each active object
//! at construction rather than a hidden global, so uniqueness is an
//! auditable, testable collaboration. It is the one genuinely shared
//! mutable structure in the framework and serializes concurrent `start`
//! calls behind its mutex.

use parking_lot::Mutex;
use qf4rs_core::{QError, QPriority, QPriorityMask, QResult};
use tracing::debug;

/// Registry of priorities currently held by running active objects
#[derive(Default)]
pub struct PriorityRegistry {
    taken: Mutex<QPriorityMask>,
}

impl PriorityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            taken: Mutex::new(QPriorityMask::new()),
        }
    }

    /// Claim a priority for a starting active object
    ///
    /// Fails with `InvalidPriority` outside the valid range and with
    /// `PriorityConflict` when another object already holds it; in both
    /// cases the registry is unchanged.
    pub fn acquire(&self, priority: QPriority) -> QResult<()> {
        if !priority.is_set() || priority > QPriority::MAX {
            return Err(QError::InvalidPriority);
        }
        let mut taken = self.taken.lock();
        if taken.is_set(priority) {
            return Err(QError::PriorityConflict);
        }
        taken.set(priority);
        debug!(%priority, "priority acquired");
        Ok(())
    }

    /// Release a priority held by a stopping active object
    pub fn release(&self, priority: QPriority) {
        let mut taken = self.taken.lock();
        taken.clear(priority);
        debug!(%priority, "priority released");
    }

    /// Whether a priority is currently held
    pub fn is_taken(&self, priority: QPriority) -> bool {
        self.taken.lock().is_set(priority)
    }

    /// Number of priorities currently held
    pub fn len(&self) -> usize {
        self.taken.lock().len()
    }

    /// Whether no priorities are held
    pub fn is_empty(&self) -> bool {
        self.taken.lock().is_empty()
    }
}
