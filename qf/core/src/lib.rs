#![forbid(unsafe_code)]

//! # qf4rs Core
//!
//! Core types and traits shared by the qf4rs framework layers: event
//! signals and payloads, active-object priorities, and the common error
//! taxonomy. Higher layers build on these — `qf4rs-qep` for the
//! hierarchical state machine engine and `qf4rs-qf` for active objects.

pub mod events;
pub mod priorities;

pub use events::*;
pub use priorities::*;

/// qf4rs framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the qf4rs framework
pub type QResult<T> = Result<T, QError>;

/// Runtime error types for framework operations.
///
/// These are returned to the caller as explicit results; they are never
/// propagated across an active object's dispatch thread, which must not
/// be interrupted mid run-to-completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QError {
    /// Event queue is full under the reject-new overflow policy
    #[error("event queue is full")]
    QueueFull,
    /// A second `start` call on an already running active object
    #[error("active object already started")]
    AlreadyStarted,
    /// The requested priority is held by another active object
    #[error("priority already held by another active object")]
    PriorityConflict,
    /// Priority outside the valid range
    #[error("invalid priority level")]
    InvalidPriority,
    /// Internal framework error (e.g. the OS refused to spawn a thread)
    #[error("internal framework error")]
    Internal,
}
