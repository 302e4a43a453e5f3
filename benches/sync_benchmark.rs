/*!
 * Synchronization Primitives Benchmarks
 *
 * Compare atomic cell, scoped mutex and worker pool throughput
 */

use concur_kit::{AtomicCell, Mutex, WorkerPool};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::thread;

const OPS_PER_THREAD: u64 = 10_000;

fn bench_single_thread_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter_single_thread");

    let cell = AtomicCell::new(0_u64);
    group.bench_function("atomic_increment", |b| {
        b.iter(|| black_box(cell.increment()));
    });

    let lock = Mutex::new(0_u64);
    group.bench_function("mutex_increment", |b| {
        b.iter(|| {
            let mut guard = lock.scoped_acquire();
            *guard += 1;
            black_box(*guard)
        });
    });

    let std_lock = std::sync::Mutex::new(0_u64);
    group.bench_function("std_mutex_increment", |b| {
        b.iter(|| {
            let mut guard = std_lock.lock().unwrap();
            *guard += 1;
            black_box(*guard)
        });
    });

    group.finish();
}

fn bench_contended_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter_contended");

    for threads in [2_usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("atomic", threads), &threads, |b, &threads| {
            b.iter(|| {
                let cell = Arc::new(AtomicCell::new(0_u64));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let cell = cell.clone();
                        thread::spawn(move || {
                            for _ in 0..OPS_PER_THREAD {
                                cell.increment();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
                black_box(cell.load())
            });
        });

        group.bench_with_input(BenchmarkId::new("mutex", threads), &threads, |b, &threads| {
            b.iter(|| {
                let lock = Arc::new(Mutex::new(0_u64));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let lock = lock.clone();
                        thread::spawn(move || {
                            for _ in 0..OPS_PER_THREAD {
                                lock.with(|value| *value += 1);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
                black_box(lock.with(|value| *value))
            });
        });
    }

    group.finish();
}

fn bench_pool_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_submit");

    for workers in [1_usize, 4] {
        let pool = WorkerPool::with_workers(workers).unwrap();

        group.bench_with_input(BenchmarkId::new("submit_wait_100", workers), &pool, |b, pool| {
            b.iter(|| {
                let handles: Vec<_> = (0..100_u64)
                    .map(|n| pool.submit(move || black_box(n * 2)).unwrap())
                    .collect();
                pool.wait_all(&handles);
            });
        });

        pool.shutdown();
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_thread_counter,
    bench_contended_counter,
    bench_pool_submit
);
criterion_main!(benches);
