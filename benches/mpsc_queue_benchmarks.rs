//! Performance benchmarks for the MPSC queue
//!
//! This benchmark suite compares `inflow::MpscQueue` against:
//! - std::sync::mpsc (standard library channel)
//! - crossbeam::queue::SegQueue (unbounded MPMC)
//! - crossbeam::channel::unbounded

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crossbeam::channel::unbounded as crossbeam_unbounded;
use crossbeam::queue::SegQueue;
use inflow::MpscQueue;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;

const OPERATIONS: usize = 10_000;
const PRODUCER_COUNTS: &[usize] = &[1, 2, 4, 8];

// Single-threaded enqueue followed by a full drain
fn bench_single_thread_enqueue_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread_enqueue_dequeue");
    group.throughput(Throughput::Elements(OPERATIONS as u64));

    group.bench_function("inflow_mpsc", |b| {
        b.iter(|| {
            let queue = MpscQueue::new();
            for i in 0..OPERATIONS {
                queue.enqueue(black_box(i));
            }
            let mut consumer = queue.try_consumer().unwrap();
            while let Some(value) = consumer.dequeue() {
                black_box(value);
            }
        });
    });

    group.bench_function("crossbeam_seg_queue", |b| {
        b.iter(|| {
            let queue = SegQueue::new();
            for i in 0..OPERATIONS {
                queue.push(black_box(i));
            }
            while let Some(value) = queue.pop() {
                black_box(value);
            }
        });
    });

    group.bench_function("std_mpsc", |b| {
        b.iter(|| {
            let (tx, rx) = std_mpsc::channel();
            for i in 0..OPERATIONS {
                tx.send(black_box(i)).unwrap();
            }
            while let Ok(value) = rx.try_recv() {
                black_box(value);
            }
        });
    });

    group.finish();
}

// N producers, one consumer draining concurrently
fn bench_multi_producer_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_producer_handoff");

    for &producers in PRODUCER_COUNTS {
        let per_producer = OPERATIONS / producers;
        let total = per_producer * producers;
        group.throughput(Throughput::Elements(total as u64));

        group.bench_with_input(
            BenchmarkId::new("inflow_mpsc", producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let queue = Arc::new(MpscQueue::new());
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let queue = Arc::clone(&queue);
                            thread::spawn(move || {
                                for i in 0..per_producer {
                                    queue.enqueue(i);
                                }
                            })
                        })
                        .collect();

                    let mut consumer = queue.try_consumer().unwrap();
                    let mut received = 0;
                    while received < total {
                        if let Some(value) = consumer.dequeue() {
                            black_box(value);
                            received += 1;
                        }
                    }
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("crossbeam_seg_queue", producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let queue = Arc::new(SegQueue::new());
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let queue = Arc::clone(&queue);
                            thread::spawn(move || {
                                for i in 0..per_producer {
                                    queue.push(i);
                                }
                            })
                        })
                        .collect();

                    let mut received = 0;
                    while received < total {
                        if let Some(value) = queue.pop() {
                            black_box(value);
                            received += 1;
                        }
                    }
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("crossbeam_channel", producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let (tx, rx) = crossbeam_unbounded();
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let tx = tx.clone();
                            thread::spawn(move || {
                                for i in 0..per_producer {
                                    tx.send(i).unwrap();
                                }
                            })
                        })
                        .collect();
                    drop(tx);

                    for value in rx.iter() {
                        black_box(value);
                    }
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("inflow_channel", producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let (tx, mut rx) = inflow::channel();
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let tx = tx.clone();
                            thread::spawn(move || {
                                for i in 0..per_producer {
                                    tx.send(i).unwrap();
                                }
                            })
                        })
                        .collect();
                    drop(tx);

                    loop {
                        match rx.try_recv() {
                            Ok(value) => {
                                black_box(value);
                            }
                            Err(inflow::Error::Disconnected) => break,
                            Err(_) => std::hint::spin_loop(),
                        }
                    }
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_thread_enqueue_dequeue,
    bench_multi_producer_handoff
);
criterion_main!(benches);
