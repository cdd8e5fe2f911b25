//! Event queue implementation for active objects
//!
//! A bounded, single-consumer, multi-producer queue of owned events.
//! Producers post from any thread; the owning active object's thread is
//! the only consumer and blocks in [`EventQueue::take_next`] when empty.

use heapless::Deque;
use parking_lot::{Condvar, Mutex};
use qf4rs_core::{QError, QEvent, QResult};
use tracing::warn;

/// Policy applied when a post finds the queue full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Refuse the new event and return `QueueFull` to the producer
    #[default]
    RejectNew,
    /// Evict a queued event to make room: a FIFO post evicts the
    /// delivery-order head, a LIFO post evicts the tail
    DropOldest,
    /// Block the producer until the consumer frees a slot
    BlockProducer,
}

struct Inner<const N: usize> {
    events: Deque<Box<dyn QEvent>, N>,
    closed: bool,
}

/// Bounded blocking event queue
///
/// Ordering: events already queued are never reordered by a later post.
/// A FIFO post lands at the tail; a LIFO post lands at the head and is
/// therefore delivered before everything queued earlier, but after
/// whatever event the consumer is currently dispatching (that event has
/// already left the queue).
pub struct EventQueue<const N: usize> {
    inner: Mutex<Inner<N>>,
    not_empty: Condvar,
    not_full: Condvar,
    policy: OverflowPolicy,
}

impl<const N: usize> EventQueue<N> {
    /// Create an empty queue with the default reject-new policy
    pub fn new() -> Self {
        Self::with_policy(OverflowPolicy::RejectNew)
    }

    /// Create an empty queue with an explicit overflow policy
    pub fn with_policy(policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: Deque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            policy,
        }
    }

    /// Post an event at the tail of the queue (FIFO)
    pub fn post_fifo(&self, event: Box<dyn QEvent>) -> QResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            // The consumer is gone; accept and discard.
            return Ok(());
        }
        if inner.events.is_full() {
            match self.policy {
                OverflowPolicy::RejectNew => return Err(QError::QueueFull),
                OverflowPolicy::DropOldest => {
                    let dropped = inner.events.pop_front();
                    if let Some(evt) = dropped {
                        warn!(signal = %evt.signal(), "queue full, dropping oldest event");
                    }
                }
                OverflowPolicy::BlockProducer => {
                    while inner.events.is_full() && !inner.closed {
                        self.not_full.wait(&mut inner);
                    }
                    if inner.closed {
                        return Ok(());
                    }
                }
            }
        }
        if inner.events.push_back(event).is_err() {
            return Err(QError::QueueFull);
        }
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Post an event at the head of the queue (LIFO)
    pub fn post_lifo(&self, event: Box<dyn QEvent>) -> QResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        if inner.events.is_full() {
            match self.policy {
                OverflowPolicy::RejectNew => return Err(QError::QueueFull),
                OverflowPolicy::DropOldest => {
                    let dropped = inner.events.pop_back();
                    if let Some(evt) = dropped {
                        warn!(signal = %evt.signal(), "queue full, dropping tail event");
                    }
                }
                OverflowPolicy::BlockProducer => {
                    while inner.events.is_full() && !inner.closed {
                        self.not_full.wait(&mut inner);
                    }
                    if inner.closed {
                        return Ok(());
                    }
                }
            }
        }
        if inner.events.push_front(event).is_err() {
            return Err(QError::QueueFull);
        }
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the next event, blocking until one is available
    ///
    /// Returns `None` once the queue has been closed, which is the
    /// consumer thread's signal to exit its dispatch loop.
    pub fn take_next(&self) -> Option<Box<dyn QEvent>> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(event) = inner.events.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Some(event);
            }
            if inner.closed {
                return None;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Close the queue and discard any queued backlog
    ///
    /// Wakes the blocked consumer (and any blocked producers). Later
    /// posts are accepted and silently dropped; the backlog is not
    /// drained into the consumer.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.events.clear();
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of events currently queued
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    /// Maximum queue capacity
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
