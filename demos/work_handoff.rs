//! Work handoff example
//!
//! Several worker threads compute results and hand them to a single aggregator thread
//! through an `MpscQueue`. Workers never contend on a lock; the aggregator polls and
//! backs off on its own when the queue is empty.
//!
//! Run with `cargo run --example work_handoff --features tracing` to see queue logs.

use inflow::metrics::MetricsCollector;
use inflow::MpscQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct WorkResult {
    worker: usize,
    item: u64,
    checksum: u64,
}

fn checksum(item: u64) -> u64 {
    (0..64).fold(item, |acc, round| acc.rotate_left(5) ^ (acc >> 3) ^ round)
}

fn main() {
    inflow::trace::init_tracing();

    println!("Work Handoff Example");
    println!("====================");

    let num_workers = 4;
    let items_per_worker = 50_000u64;

    let queue = Arc::new(MpscQueue::new());
    let workers_running = Arc::new(AtomicUsize::new(num_workers));

    println!("Configuration:");
    println!("  Workers: {}", num_workers);
    println!("  Items per worker: {}", items_per_worker);
    println!("  Total items: {}\n", num_workers as u64 * items_per_worker);

    let start_time = Instant::now();

    let workers: Vec<_> = (0..num_workers)
        .map(|worker| {
            let queue = Arc::clone(&queue);
            let workers_running = Arc::clone(&workers_running);
            thread::spawn(move || {
                for item in 0..items_per_worker {
                    queue.enqueue(WorkResult {
                        worker,
                        item,
                        checksum: checksum(item),
                    });
                }
                workers_running.fetch_sub(1, Ordering::Release);
            })
        })
        .collect();

    let aggregator = {
        let queue = Arc::clone(&queue);
        let workers_running = Arc::clone(&workers_running);
        thread::spawn(move || {
            let mut consumer = match queue.try_consumer() {
                Ok(consumer) => consumer,
                Err(err) => panic!("aggregator could not claim the queue: {err}"),
            };
            let mut per_worker = vec![0u64; num_workers];
            let mut combined = 0u64;
            let mut idle_polls = 0u64;

            loop {
                let mut progressed = false;
                for result in consumer.drain() {
                    debug_assert_eq!(result.checksum, checksum(result.item));
                    per_worker[result.worker] += 1;
                    combined ^= result.checksum;
                    progressed = true;
                }

                if !progressed {
                    if workers_running.load(Ordering::Acquire) == 0 && consumer.is_empty() {
                        break;
                    }
                    idle_polls += 1;
                    thread::sleep(Duration::from_micros(10));
                }
            }

            (per_worker, combined, idle_polls)
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    let (per_worker, combined, idle_polls) = aggregator.join().unwrap();
    let elapsed = start_time.elapsed();

    let total: u64 = per_worker.iter().sum();
    let metrics = queue.metrics();

    println!("Results:");
    for (worker, count) in per_worker.iter().enumerate() {
        println!("  Worker {}: {} results", worker, count);
    }
    println!("  Combined checksum: {:#018x}", combined);
    println!("  Idle polls: {}", idle_polls);
    println!("  Elapsed: {:?}", elapsed);
    println!(
        "  Throughput: {:.0} items/sec",
        total as f64 / elapsed.as_secs_f64()
    );
    println!(
        "  Queue metrics: enqueued={} dequeued={} empty_polls={} backlog={}",
        metrics.enqueued,
        metrics.dequeued,
        metrics.empty_polls,
        metrics.backlog()
    );

    assert_eq!(total, num_workers as u64 * items_per_worker);
}
