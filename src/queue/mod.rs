//! Queue implementations
//!
//! ## Available Queues
//!
//! - [`MpscQueue`]: unbounded multi-producer, single-consumer queue
//! - [`channel`](channel::channel): owned `Sender`/`Receiver` halves over an `MpscQueue`
//!
//! ## Design
//!
//! - **Lock-free**: producers use one atomic exchange, the consumer plain loads and stores
//! - **Memory ordering**: a single Release/Acquire pair per element publishes its payload
//! - **Eager reclamation**: the consumer frees each node as it passes it
//! - **Cache optimization**: `head` and `tail` are padded onto separate cache lines
//! - **Testing**: unit tests, stress tests, property tests and loom model checking
//!
//! ## Performance Characteristics
//!
//! | Operation | Cost | Fails? | Blocks? |
//! |-----------|------|--------|---------|
//! | enqueue   | O(1), 1 alloc + 1 swap | never | never |
//! | dequeue   | O(1), 1 free | `None` when empty | never |
//! | is_empty  | O(1), 2 loads | - | never |
//!
//! ## Examples
//!
//! ```rust
//! use inflow::queue::MpscQueue;
//!
//! let queue = MpscQueue::new();
//! queue.enqueue(42);
//!
//! let mut consumer = queue.try_consumer()?;
//! assert_eq!(consumer.dequeue(), Some(42));
//! # Ok::<(), inflow::Error>(())
//! ```
pub mod channel;
pub mod mpsc;

pub use mpsc::{Consumer, Drain, MpscQueue};


#[cfg(all(test, not(loom)))]
mod proptests;
