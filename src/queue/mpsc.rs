//! Multi-Producer, Single-Consumer (MPSC) Queue
//!
//! An unbounded FIFO queue built as a singly linked list of heap nodes with a stub node in
//! front of the real data. Producers only ever touch `head`, the consumer only ever touches
//! `tail`, and the two meet through each node's `next` pointer.
//!
//! ## Algorithm
//!
//! ```text
//!   tail                                head
//!    |                                   |
//!    v                                   v
//! [stub] --next--> [ a ] --next--> [ b ] --next--> null
//!  None           Some(a)         Some(b)
//! ```
//!
//! - **Enqueue**: allocate a node, `swap` it into `head` to obtain the previous head, then
//!   store the new node into the previous head's `next`. One atomic exchange, no retries.
//! - **Dequeue**: read `tail.next`. Null means empty. Otherwise move the payload out of
//!   `next`, advance `tail` to it and free the old tail. The node that was `next` becomes
//!   the new stub.
//!
//! Between a producer's `swap` and its `next` store the new node is reachable from `head`
//! but not yet from `tail`. During that window the consumer sees the queue as ending just
//! before it, and also cannot see anything enqueued after it. The element appears as soon
//! as the link store lands. Dequeue never waits for it.
//!
//! ## Memory Ordering Model
//!
//! ```text
//! Producer (enqueue)                     Consumer (dequeue)
//! ------------------                     ------------------
//! write payload into node
//! head.swap(node)        (AcqRel)
//! prev.next.store(node)  (Release) ----> tail.next.load()  (Acquire)
//!                                        take payload
//!                                        tail.store(next)  (Release)
//! ```
//!
//! The release store of `next` paired with the consumer's acquire load is the only edge
//! needed for the payload to be visible. `tail` is loaded `Relaxed`: only the consumer
//! writes it.
//!
//! ## Reclamation
//!
//! Nodes are freed eagerly by the consumer, with no epochs or hazard pointers. A producer
//! that was descheduled after its `swap` still holds a pointer to the previous head and
//! will write that node's `next` when it resumes. That node cannot have been freed in the
//! meantime: the consumer frees a node only after it has loaded a non-null `next` from it,
//! and the delayed producer's store is the only write that can make it non-null. Until that
//! store lands the consumer stops at that node. After it, the producer never touches the
//! node again.
//!
//! ## Single Consumer
//!
//! Nothing inside dequeue protects two consumers from each other. The safe API hands out
//! removal through [`Consumer`], which is claimed once per handle through
//! [`MpscQueue::try_consumer`] or by exclusive borrow through [`MpscQueue::consumer_mut`].
//! [`MpscQueue::dequeue_unchecked`] skips the claim for callers that enforce the rule
//! themselves.
//!
//! ## Example
//!
//! ```rust
//! use inflow::MpscQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(MpscQueue::new());
//!
//! let producers: Vec<_> = (0..4)
//!     .map(|id| {
//!         let queue = Arc::clone(&queue);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 queue.enqueue(id * 100 + i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for producer in producers {
//!     producer.join().unwrap();
//! }
//!
//! let mut consumer = queue.try_consumer()?;
//! assert_eq!(consumer.drain().count(), 400);
//! # Ok::<(), inflow::Error>(())
//! ```

use crate::loom::cell::UnsafeCell;
use crate::loom::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use crate::metrics::{AtomicMetrics, MetricsCollector, QueueMetrics};
use crate::trace::{debug, trace};
use crate::util::CachePadded;
use crate::{Error, Result};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::ptr;

/// A link in the queue's chain.
///
/// `payload` is `None` for the stub in front of the data, which is either the node created
/// by [`MpscQueue::new`] or the last node the consumer took a payload from.
struct Node<T> {
    payload: UnsafeCell<Option<T>>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn alloc(payload: Option<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            payload: UnsafeCell::new(payload),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

/// An unbounded multi-producer, single-consumer lock-free queue
///
/// # Memory Ordering
///
/// - `enqueue`: `AcqRel` exchange on `head`, then `Release` store of the predecessor's `next`
/// - `dequeue`: `Relaxed` load of `tail`, `Acquire` load of `tail.next`, `Release` store of `tail`
/// - `is_empty`: same loads as `dequeue`, no stores
///
/// # Performance Characteristics
///
/// - **Enqueue**: O(1), one allocation and one `swap`; never fails, never retries
/// - **Dequeue**: O(1), one deallocation; never allocates, never blocks
/// - **Memory**: one node per queued element plus the stub
///
/// # Examples
///
/// ```rust
/// use inflow::MpscQueue;
///
/// let queue = MpscQueue::new();
/// queue.enqueue("hello");
///
/// let mut consumer = queue.try_consumer()?;
/// assert!(!consumer.is_empty());
/// assert_eq!(consumer.dequeue(), Some("hello"));
/// assert!(consumer.is_empty());
/// # Ok::<(), inflow::Error>(())
/// ```
pub struct MpscQueue<T> {
    // Insertion frontier, swapped by every producer
    head: CachePadded<AtomicPtr<Node<T>>>,

    // Removal frontier, written only by the consumer; always points at the stub
    tail: CachePadded<AtomicPtr<Node<T>>>,

    // Set while a `Consumer` claimed through `try_consumer` is alive
    has_consumer: AtomicBool,

    metrics: AtomicMetrics,

    _marker: PhantomData<T>,
}

// Safety: elements move from producer threads to the consumer thread, so `T: Send` is
// required and sufficient. No `&T` is ever shared between threads.
unsafe impl<T: Send> Send for MpscQueue<T> {}
unsafe impl<T: Send> Sync for MpscQueue<T> {}

impl<T> MpscQueue<T> {
    /// Create a new, empty queue
    ///
    /// Allocates the stub node and points both `head` and `tail` at it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use inflow::MpscQueue;
    ///
    /// let queue: MpscQueue<u64> = MpscQueue::new();
    /// # let _ = queue;
    /// ```
    pub fn new() -> Self {
        let stub = Node::alloc(None);
        trace!("created queue");

        Self {
            head: CachePadded::new(AtomicPtr::new(stub)),
            tail: CachePadded::new(AtomicPtr::new(stub)),
            has_consumer: AtomicBool::new(false),
            metrics: AtomicMetrics::default(),
            _marker: PhantomData,
        }
    }

    /// Push an element to the back of the queue
    ///
    /// Safe to call from any number of threads at once. The element is moved into a new
    /// node; callers that want to keep their copy pass a clone.
    ///
    /// # Memory Ordering
    ///
    /// The `AcqRel` exchange orders producers among themselves. The `Release` store into the
    /// previous head's `next` publishes the node, payload included, to the consumer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use inflow::MpscQueue;
    ///
    /// let queue = MpscQueue::new();
    /// queue.enqueue(String::from("job"));
    /// ```
    #[inline]
    pub fn enqueue(&self, value: T) {
        let node = Node::alloc(Some(value));
        self.metrics.record_enqueue();

        let prev = self.head.swap(node, Ordering::AcqRel);

        // Safety: `prev` is non-null because `head` starts at the stub and is only ever
        // replaced by freshly allocated nodes. It is still allocated because the consumer
        // frees a node only after reading a non-null `next` from it, and this store is the
        // one write that makes it non-null. No other producer received `prev` from the
        // exchange, so nobody else writes this `next`.
        unsafe { (*prev).next.store(node, Ordering::Release) };
    }

    /// Push every element of an iterator, in order
    ///
    /// Elements from one call keep their relative order but may be interleaved with
    /// elements from other producers.
    ///
    /// # Returns
    ///
    /// Number of elements enqueued
    ///
    /// # Examples
    ///
    /// ```rust
    /// use inflow::MpscQueue;
    ///
    /// let queue = MpscQueue::new();
    /// assert_eq!(queue.enqueue_batch(vec![1, 2, 3]), 3);
    /// ```
    pub fn enqueue_batch<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut enqueued = 0;
        for value in values {
            self.enqueue(value);
            enqueued += 1;
        }
        enqueued
    }

    /// Claim the consumer side of the queue
    ///
    /// The returned [`Consumer`] is the only safe way to remove elements through a shared
    /// reference. The claim is released when it is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::ConsumerBusy`] if another `Consumer` obtained from this method is alive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use inflow::{Error, MpscQueue};
    ///
    /// let queue: MpscQueue<i32> = MpscQueue::new();
    /// let first = queue.try_consumer()?;
    /// assert_eq!(queue.try_consumer().unwrap_err(), Error::ConsumerBusy);
    /// drop(first);
    /// assert!(queue.try_consumer().is_ok());
    /// # Ok::<(), inflow::Error>(())
    /// ```
    pub fn try_consumer(&self) -> Result<Consumer<'_, T>> {
        // Acquire pairs with the Release in `Consumer::drop`, so the new consumer sees the
        // previous one's `tail` updates.
        if self
            .has_consumer
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("rejected consumer claim, queue already has a consumer");
            return Err(Error::ConsumerBusy);
        }

        Ok(Consumer {
            queue: self,
            claimed: true,
        })
    }

    /// Get a [`Consumer`] through an exclusive borrow, without touching the claim flag
    pub fn consumer_mut(&mut self) -> Consumer<'_, T> {
        Consumer {
            queue: self,
            claimed: false,
        }
    }

    /// Pop the element at the front of the queue without checking for other consumers
    ///
    /// Returns `None` if the queue looked empty. That includes the case where a producer has
    /// swapped `head` but not yet linked its node.
    ///
    /// # Safety
    ///
    /// Only one thread may be in `dequeue_unchecked` or `is_empty_unchecked` at a time, and
    /// never while a [`Consumer`] for this queue is in use on another thread.
    #[inline]
    pub unsafe fn dequeue_unchecked(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);

        // Safety: `tail` always points at a live node that only the consumer can free.
        let next = unsafe { (*tail).next.load(Ordering::Acquire) };
        if next.is_null() {
            self.metrics.record_empty_poll();
            return None;
        }

        // Safety: the Acquire load above synchronizes with the producer's Release store, so
        // the payload written before publication is visible. After publication only the
        // consumer touches payloads.
        let value = unsafe { (*next).payload.with_mut(|slot| (*slot).take()) };
        debug_assert!(value.is_some(), "node after the stub has no payload");

        self.tail.store(next, Ordering::Release);

        // Safety: the old tail is no longer reachable from `tail`, `head` moved past it when
        // `next` was swapped in, and its `next` has already been written, so no producer
        // will touch it again.
        drop(unsafe { Box::from_raw(tail) });

        self.metrics.record_dequeue();
        value
    }

    /// Check whether a dequeue right now would return `None`
    ///
    /// A snapshot: a concurrent enqueue can make it stale immediately.
    ///
    /// # Safety
    ///
    /// Same contract as [`dequeue_unchecked`](Self::dequeue_unchecked): no concurrent
    /// dequeue on another thread, since it could free the node being read.
    #[inline]
    pub unsafe fn is_empty_unchecked(&self) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        // Safety: see `dequeue_unchecked`.
        unsafe { (*tail).next.load(Ordering::Acquire).is_null() }
    }
}

impl<T> Default for MpscQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for MpscQueue<T> {
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables, unused_assignments))]
    fn drop(&mut self) {
        let mut drained = 0usize;

        // Safety: `&mut self` rules out concurrent producers and consumers.
        while unsafe { self.dequeue_unchecked() }.is_some() {
            drained += 1;
        }

        // Every node but the stub has been freed by the drain.
        let stub = self.tail.load(Ordering::Relaxed);
        // Safety: allocated by `Node::alloc` and no longer referenced by anything else.
        drop(unsafe { Box::from_raw(stub) });

        debug!(drained, "dropped queue");
    }
}

impl<T> MetricsCollector for MpscQueue<T> {
    fn metrics(&self) -> QueueMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics.set_enabled(enabled);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics.is_enabled()
    }
}

impl<T> fmt::Debug for MpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpscQueue")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("has_consumer", &self.has_consumer.load(Ordering::Relaxed))
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

/// Exclusive access to the consumer side of an [`MpscQueue`]
///
/// Removal takes `&mut self`, so a `Consumer` shared between threads can only be used to
/// check [`is_empty`](Self::is_empty).
pub struct Consumer<'a, T> {
    queue: &'a MpscQueue<T>,
    claimed: bool,
}

impl<'a, T> Consumer<'a, T> {
    /// Pop the element at the front of the queue
    ///
    /// # Returns
    ///
    /// * `Some(value)` for the oldest element
    /// * `None` if the queue is empty, or its front element is still being linked in
    #[inline]
    pub fn dequeue(&mut self) -> Option<T> {
        // Safety: this handle is the only consumer, by claim or by exclusive borrow.
        unsafe { self.queue.dequeue_unchecked() }
    }

    /// Pop the front element into `out`
    ///
    /// Returns `false` and leaves `out` untouched if the queue is empty. The previous value
    /// of `out` is dropped on success.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use inflow::MpscQueue;
    ///
    /// let queue = MpscQueue::new();
    /// queue.enqueue(7);
    ///
    /// let mut consumer = queue.try_consumer()?;
    /// let mut out = 0;
    /// assert!(consumer.dequeue_into(&mut out));
    /// assert_eq!(out, 7);
    /// assert!(!consumer.dequeue_into(&mut out));
    /// assert_eq!(out, 7);
    /// # Ok::<(), inflow::Error>(())
    /// ```
    #[inline]
    pub fn dequeue_into(&mut self, out: &mut T) -> bool {
        match self.dequeue() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Check whether a dequeue right now would return `None`
    #[inline]
    pub fn is_empty(&self) -> bool {
        // Safety: removal needs `&mut self`, so no dequeue can run while this borrow lives.
        unsafe { self.queue.is_empty_unchecked() }
    }

    /// Pop up to `max_values` elements
    ///
    /// Stops early at the first empty observation.
    pub fn dequeue_batch(&mut self, max_values: usize) -> Vec<T> {
        let mut values = Vec::new();
        while values.len() < max_values {
            match self.dequeue() {
                Some(value) => values.push(value),
                None => break,
            }
        }
        values
    }

    /// Iterate over elements until the queue is observed empty
    ///
    /// The iterator is not fused: a later `next` may yield again after new enqueues.
    pub fn drain(&mut self) -> Drain<'_, 'a, T> {
        Drain { consumer: self }
    }

    /// The queue this handle consumes from
    pub fn queue(&self) -> &'a MpscQueue<T> {
        self.queue
    }
}

impl<T> Drop for Consumer<'_, T> {
    fn drop(&mut self) {
        if self.claimed {
            self.queue.has_consumer.store(false, Ordering::Release);
        }
    }
}

impl<T> fmt::Debug for Consumer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("queue", self.queue)
            .field("claimed", &self.claimed)
            .finish()
    }
}

/// Iterator returned by [`Consumer::drain`]
pub struct Drain<'c, 'a, T> {
    consumer: &'c mut Consumer<'a, T>,
}

impl<T> Iterator for Drain<'_, '_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.consumer.dequeue()
    }
}

impl<T> fmt::Debug for Drain<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain")
            .field("consumer", &self.consumer)
            .finish()
    }
}
