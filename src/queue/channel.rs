//! Owned Sender/Receiver halves over a shared [`MpscQueue`]
//!
//! [`channel`] puts one queue behind an `Arc` and hands out a cloneable [`Sender`] and a
//! single [`Receiver`]. The receiver is the queue's only consumer for its whole lifetime,
//! so it dequeues without any per-call claim.
//!
//! Nothing here blocks. `try_recv` reports [`Error::Empty`] while senders remain and
//! [`Error::Disconnected`] once they are all gone and the queue has been drained.
//!
//! ```rust
//! use inflow::{channel, Error};
//! use std::thread;
//!
//! let (tx, mut rx) = channel();
//!
//! let worker = thread::spawn(move || {
//!     for i in 0..10 {
//!         tx.send(i).unwrap();
//!     }
//! });
//! worker.join().unwrap();
//!
//! let received: Vec<_> = rx.try_iter().collect();
//! assert_eq!(received, (0..10).collect::<Vec<_>>());
//! assert_eq!(rx.try_recv(), Err(Error::Disconnected));
//! ```

use super::MpscQueue;
use crate::metrics::{MetricsCollector, QueueMetrics};
use crate::trace::debug;
use crate::{Error, Result};
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

struct Shared<T> {
    queue: MpscQueue<T>,
    senders: AtomicUsize,
    receiver_alive: AtomicBool,
}

/// Create a channel backed by a new [`MpscQueue`]
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        queue: MpscQueue::new(),
        senders: AtomicUsize::new(1),
        receiver_alive: AtomicBool::new(true),
    });

    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

/// The error returned by [`Sender::send`] when the [`Receiver`] has been dropped
///
/// Holds the value that could not be sent.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sending on a channel whose receiver was dropped")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Take back the value that was not sent
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendError { .. }")
    }
}

/// The sending half of a channel; clone it to add producers
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Enqueue a value
    ///
    /// Never blocks. If the receiver is dropped concurrently the value may be accepted and
    /// then dropped along with the queue.
    ///
    /// # Errors
    ///
    /// [`SendError`] carrying `value` if the receiver has already been dropped.
    pub fn send(&self, value: T) -> core::result::Result<(), SendError<T>> {
        if !self.shared.receiver_alive.load(Ordering::Acquire) {
            return Err(SendError(value));
        }
        self.shared.queue.enqueue(value);
        Ok(())
    }

    /// Whether the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        !self.shared.receiver_alive.load(Ordering::Acquire)
    }

    /// Counters of the underlying queue
    pub fn metrics(&self) -> QueueMetrics {
        self.shared.queue.metrics()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        // Release makes every enqueue by this sender visible to a receiver that Acquires
        // a count of zero.
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("last sender dropped");
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("senders", &self.shared.senders.load(Ordering::Relaxed))
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The receiving half of a channel
///
/// Not `Clone`: it is the queue's single consumer.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Take the oldest value without blocking
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if nothing is available but senders remain
    /// - [`Error::Disconnected`] if nothing is available and every sender is gone
    pub fn try_recv(&mut self) -> Result<T> {
        if let Some(value) = self.dequeue() {
            return Ok(value);
        }

        if self.shared.senders.load(Ordering::Acquire) != 0 {
            return Err(Error::Empty);
        }

        // The last sender may have enqueued between the first attempt and its drop.
        self.dequeue().ok_or(Error::Disconnected)
    }

    /// Whether a `try_recv` right now would find nothing
    pub fn is_empty(&self) -> bool {
        // Safety: dequeueing needs `&mut self`, so no dequeue runs during this borrow.
        unsafe { self.shared.queue.is_empty_unchecked() }
    }

    /// Whether every sender has been dropped
    pub fn is_disconnected(&self) -> bool {
        self.shared.senders.load(Ordering::Acquire) == 0
    }

    /// Iterate over the values available right now, stopping at the first empty observation
    pub fn try_iter(&mut self) -> TryIter<'_, T> {
        TryIter { receiver: self }
    }

    /// Counters of the underlying queue
    pub fn metrics(&self) -> QueueMetrics {
        self.shared.queue.metrics()
    }

    #[inline]
    fn dequeue(&mut self) -> Option<T> {
        // Safety: the receiver is unique and dequeueing needs `&mut self`.
        unsafe { self.shared.queue.dequeue_unchecked() }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.shared.receiver_alive.store(false, Ordering::Release);
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("queue", &self.shared.queue)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

/// Iterator returned by [`Receiver::try_iter`]
pub struct TryIter<'a, T> {
    receiver: &'a mut Receiver<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.dequeue()
    }
}

impl<T> fmt::Debug for TryIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryIter").finish_non_exhaustive()
    }
}
