//! Priority management for active objects

use crate::{QError, QResult};
use core::fmt;

/// Type-safe priority level for active objects
///
/// A priority identifies exactly one active object in the process once
/// it has started. Before `start` the priority is the `UNSET` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QPriority(u8);

impl QPriority {
    /// Sentinel for an active object that has not been started
    pub const UNSET: QPriority = QPriority(0);

    /// Minimum valid priority level
    pub const MIN: QPriority = QPriority(1);

    /// Maximum valid priority level (width of [`QPriorityMask`])
    pub const MAX: QPriority = QPriority(64);

    /// Create a new priority level
    pub fn new(priority: u8) -> QResult<Self> {
        if priority == 0 || priority > Self::MAX.0 {
            Err(QError::InvalidPriority)
        } else {
            Ok(QPriority(priority))
        }
    }

    /// Create a priority without validation (const fn)
    pub const fn new_unchecked(priority: u8) -> Self {
        QPriority(priority)
    }

    /// Get the raw priority value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Check if this priority has been assigned
    pub const fn is_set(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for QPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

/// Priority mask for efficient priority set operations
///
/// One bit per valid priority level; bit `p - 1` corresponds to priority
/// `p`. Used by the priority registry to track which identities are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QPriorityMask(u64);

impl QPriorityMask {
    /// Empty priority mask
    pub const EMPTY: Self = Self(0);

    /// Create a new empty priority mask
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Set a priority in the mask
    pub fn set(&mut self, priority: QPriority) {
        if priority.is_set() && priority.0 <= QPriority::MAX.0 {
            self.0 |= 1u64 << (priority.0 - 1);
        }
    }

    /// Clear a priority in the mask
    pub fn clear(&mut self, priority: QPriority) {
        if priority.is_set() && priority.0 <= QPriority::MAX.0 {
            self.0 &= !(1u64 << (priority.0 - 1));
        }
    }

    /// Check if a priority is set in the mask
    pub const fn is_set(&self, priority: QPriority) -> bool {
        if priority.0 == 0 || priority.0 > QPriority::MAX.0 {
            false
        } else {
            (self.0 & (1u64 << (priority.0 - 1))) != 0
        }
    }

    /// Check if the mask is empty
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Count the priorities held in the mask
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

impl Default for QPriorityMask {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_creation() {
        assert!(QPriority::new(0).is_err());
        assert!(QPriority::new(1).is_ok());
        assert!(QPriority::new(64).is_ok());
        assert!(QPriority::new(65).is_err());
    }

    #[test]
    fn test_unset_sentinel() {
        assert!(!QPriority::UNSET.is_set());
        assert!(QPriority::MIN.is_set());
    }

    #[test]
    fn test_priority_mask() {
        let mut mask = QPriorityMask::new();
        assert!(mask.is_empty());

        let p1 = QPriority::new(1).unwrap();
        let p5 = QPriority::new(5).unwrap();

        mask.set(p1);
        mask.set(p5);

        assert!(mask.is_set(p1));
        assert!(mask.is_set(p5));
        assert!(!mask.is_set(QPriority::new(3).unwrap()));
        assert_eq!(mask.len(), 2);

        mask.clear(p1);
        assert!(!mask.is_set(p1));
        assert!(mask.is_set(p5));
    }

    #[test]
    fn test_mask_ignores_unset() {
        let mut mask = QPriorityMask::new();
        mask.set(QPriority::UNSET);
        assert!(mask.is_empty());
        assert!(!mask.is_set(QPriority::UNSET));
    }
}
