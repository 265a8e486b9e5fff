//! # Inflow
//!
//! An unbounded, lock-free, multi-producer single-consumer FIFO queue for handing work
//! from many threads to one draining thread.
//!
//! ## Features
//!
//! - **MPSC Queue**: producers insert with a single atomic exchange, never a CAS loop
//! - **Consumer handle**: a claimed, non-cloneable handle that makes the single-consumer
//!   rule a property of the type system instead of a comment
//! - **Channel split**: owned `Sender`/`Receiver` halves with disconnect detection
//! - **Metrics**: optional per-queue counters (`metrics` feature, on by default)
//! - **Tracing**: optional structured logging (`tracing` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use inflow::MpscQueue;
//!
//! let queue = MpscQueue::new();
//! queue.enqueue(1);
//! queue.enqueue(2);
//!
//! let mut consumer = queue.try_consumer()?;
//! assert_eq!(consumer.dequeue(), Some(1));
//! assert_eq!(consumer.dequeue(), Some(2));
//! assert_eq!(consumer.dequeue(), None);
//! # Ok::<(), inflow::Error>(())
//! ```
//!
//! ## Thread Safety
//!
//! `MpscQueue<T>` is `Send + Sync` whenever `T: Send`. Any number of threads may call
//! [`MpscQueue::enqueue`] at once. Removal is only ever performed through one
//! [`Consumer`] at a time, or through the `unsafe` unchecked methods whose contract is
//! the same rule.
//!
//! ## Performance
//!
//! - One allocation and one `swap` per enqueue, no retries
//! - No allocation on dequeue, one deallocation
//! - `head` and `tail` live on separate cache lines

#![no_std]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

mod loom;
pub mod metrics;
pub mod queue;
pub mod trace;

pub use crate::queue::channel::{channel, Receiver, SendError, Sender};
pub use crate::queue::{Consumer, MpscQueue};

/// Common utilities and helper types
pub(crate) mod util {
    use core::ops::Deref;

    /// Cache line size assumed by [`CachePadded`]
    pub(crate) const CACHE_LINE_SIZE: usize = 64;

    // `repr(align)` needs a literal; keep it in step with the constant.
    const _: () = assert!(core::mem::align_of::<CachePadded<u8>>() == CACHE_LINE_SIZE);

    /// Pad a value to cache line size so neighbouring hot fields do not share a line
    #[repr(align(64))]
    pub(crate) struct CachePadded<T> {
        value: T,
    }

    impl<T> CachePadded<T> {
        #[inline]
        pub(crate) const fn new(value: T) -> Self {
            Self { value }
        }
    }

    impl<T> Deref for CachePadded<T> {
        type Target = T;

        #[inline]
        fn deref(&self) -> &T {
            &self.value
        }
    }

    impl<T: core::fmt::Debug> core::fmt::Debug for CachePadded<T> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            core::fmt::Debug::fmt(&self.value, f)
        }
    }
}

/// Error types for Inflow operations
///
/// Enqueueing never fails and an empty queue is reported as `None`/`false`, so these only
/// surface from the consumer claim and from the channel halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Another [`Consumer`] currently holds the consumer side of the queue
    #[error("queue already has an active consumer")]
    ConsumerBusy,
    /// Nothing to receive right now
    #[error("queue is empty")]
    Empty,
    /// Nothing to receive, and every sender has been dropped
    #[error("all senders have disconnected")]
    Disconnected,
}

/// Result type for Inflow operations
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_cache_padded() {
        let padded = util::CachePadded::new(42u8);
        assert_eq!(*padded, 42);
        assert_eq!(core::mem::size_of_val(&padded), util::CACHE_LINE_SIZE);
        assert_eq!(std::format!("{:?}", padded), "42");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::ConsumerBusy.to_string(), "queue already has an active consumer");
        assert_eq!(Error::Empty.to_string(), "queue is empty");
        assert_eq!(Error::Disconnected.to_string(), "all senders have disconnected");
    }
}
