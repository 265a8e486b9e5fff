//! Property-based tests for the MPSC queue using proptest
//!
//! These check the queue against a `VecDeque` model under arbitrary single-threaded
//! operation sequences, and per-producer ordering under arbitrary thread counts.

use crate::queue::MpscQueue;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::vec::Vec;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(i32),
    Dequeue,
    DequeueInto,
    IsEmpty,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => any::<i32>().prop_map(Op::Enqueue),
        2 => Just(Op::Dequeue),
        2 => Just(Op::DequeueInto),
        1 => Just(Op::IsEmpty),
    ]
}

mod single_thread_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_fifo_ordering_single_thread(
            batches in prop::collection::vec(
                prop::collection::vec(any::<i32>(), 1..10),
                1..5
            )
        ) {
            let queue = MpscQueue::new();
            let mut expected = Vec::new();

            for batch in &batches {
                queue.enqueue_batch(batch.iter().copied());
                expected.extend(batch.iter().copied());
            }

            let mut consumer = queue.try_consumer().unwrap();
            for expected_value in expected {
                prop_assert_eq!(consumer.dequeue(), Some(expected_value));
            }

            prop_assert!(consumer.is_empty());
            prop_assert_eq!(consumer.dequeue(), None);
        }

        #[test]
        fn test_matches_vecdeque_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let queue = MpscQueue::new();
            let mut consumer = queue.try_consumer().unwrap();
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Op::Enqueue(value) => {
                        queue.enqueue(value);
                        model.push_back(value);
                    }
                    Op::Dequeue => {
                        prop_assert_eq!(consumer.dequeue(), model.pop_front());
                    }
                    Op::DequeueInto => {
                        let sentinel = i32::MIN;
                        let mut out = sentinel;
                        let expected = model.pop_front();
                        let ok = consumer.dequeue_into(&mut out);
                        prop_assert_eq!(ok, expected.is_some());
                        prop_assert_eq!(out, expected.unwrap_or(sentinel));
                    }
                    Op::IsEmpty => {
                        prop_assert_eq!(consumer.is_empty(), model.is_empty());
                    }
                }
            }
        }

        #[test]
        fn test_no_memory_leaks(
            values in prop::collection::vec(any::<u16>(), 0..100),
            dequeue_count in 0usize..120
        ) {
            let drops = Arc::new(AtomicUsize::new(0));

            struct DropTracker(Arc<AtomicUsize>);

            impl Drop for DropTracker {
                fn drop(&mut self) {
                    self.0.fetch_add(1, Ordering::Relaxed);
                }
            }

            let queue = MpscQueue::new();
            for _ in &values {
                queue.enqueue(DropTracker(Arc::clone(&drops)));
            }

            {
                let mut consumer = queue.try_consumer().unwrap();
                for _ in 0..dequeue_count {
                    drop(consumer.dequeue());
                }
            }
            prop_assert_eq!(
                drops.load(Ordering::Relaxed),
                dequeue_count.min(values.len())
            );

            drop(queue);
            prop_assert_eq!(drops.load(Ordering::Relaxed), values.len());
        }
    }
}

mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_per_producer_order_preserved(
            num_producers in 1usize..6,
            items_per_producer in 1usize..300
        ) {
            let queue = Arc::new(MpscQueue::new());

            let handles: Vec<_> = (0..num_producers)
                .map(|producer_id| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for seq in 0..items_per_producer {
                            queue.enqueue((producer_id, seq));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let mut consumer = queue.try_consumer().unwrap();
            let mut next_seq = std::vec![0usize; num_producers];
            let mut total = 0;
            for (producer_id, seq) in consumer.drain() {
                prop_assert_eq!(seq, next_seq[producer_id]);
                next_seq[producer_id] += 1;
                total += 1;
            }

            prop_assert_eq!(total, num_producers * items_per_producer);
            prop_assert!(next_seq.iter().all(|&n| n == items_per_producer));
        }
    }
}
