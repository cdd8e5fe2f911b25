//! Event types and signal definitions for the qf4rs framework

use core::any::Any;
use core::fmt;

/// Type-safe event signal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QSignal(pub u16);

impl QSignal {
    /// Create a new signal from a raw value
    pub const fn new(signal: u16) -> Self {
        QSignal(signal)
    }

    /// Get the raw signal value
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for QSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QSignal({})", self.0)
    }
}

/// Base trait for all events in the qf4rs framework
///
/// An event is an immutable signal tag plus an optional payload. Events
/// are created by producers, posted to an active object's queue (which
/// takes ownership), dispatched exactly once, then dropped.
pub trait QEvent: Send + Sync + 'static {
    /// Get the signal identifier for this event
    fn signal(&self) -> QSignal;

    /// Access the concrete event for payload downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Static event that carries no data
#[derive(Debug, Clone, Copy)]
pub struct QStaticEvent {
    pub signal: QSignal,
}

impl QStaticEvent {
    /// Create a new static event
    pub const fn new(signal: QSignal) -> Self {
        Self { signal }
    }
}

impl QEvent for QStaticEvent {
    fn signal(&self) -> QSignal {
        self.signal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dynamic event that can carry arbitrary data
pub struct QDynamicEvent<T> {
    pub signal: QSignal,
    pub data: T,
}

impl<T> QDynamicEvent<T> {
    /// Create a new dynamic event with data
    pub const fn new(signal: QSignal, data: T) -> Self {
        Self { signal, data }
    }
}

impl<T: Send + Sync + 'static> QEvent for QDynamicEvent<T> {
    fn signal(&self) -> QSignal {
        self.signal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for QDynamicEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QDynamicEvent")
            .field("signal", &self.signal)
            .field("data", &self.data)
            .finish()
    }
}
