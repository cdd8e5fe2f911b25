#![forbid(unsafe_code)]

//! # qf4rs Event Processor (QEP)
//!
//! Hierarchical state machine engine implementing UML statecharts.
//! Provides the core state machine execution engine with:
//! - Entry and exit actions
//! - State transitions through the least common ancestor
//! - Hierarchical state nesting with behavior inherited from ancestors
//! - Initial-transition cascades into composite states
//!
//! The state hierarchy is an immutable arena of nodes built once by
//! [`HierarchyBuilder`] and shared read-only by every machine instance;
//! each [`QHsm`] owns only its current-leaf position.

pub mod hierarchy;
pub mod hsm;

pub use hierarchy::*;
pub use hsm::*;

/// Maximum nesting depth for hierarchical states
pub const MAX_STATE_DEPTH: usize = 16;
