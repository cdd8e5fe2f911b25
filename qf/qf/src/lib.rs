#![forbid(unsafe_code)]

//! # qf4rs Framework (QF)
//!
//! The Framework layer provides active objects, event queues, and the
//! process-wide priority registry for building concurrent, event-driven
//! systems.
//!
//! Active objects are encapsulated, event-driven concurrent objects that
//! communicate through asynchronous message passing. Each active object
//! binds one hierarchical state machine to one event queue, one unique
//! priority identity, and one dedicated thread of control with
//! run-to-completion dispatch.

pub mod active;
pub mod queue;
pub mod registry;

pub use qf4rs_core::*;
pub use qf4rs_qep::*;

pub use active::*;
pub use queue::*;
pub use registry::*;

/// Default event queue capacity for active objects
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
