use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use skein_executor::{Executor, ManualExecutor, Priority, Task, ThreadPool};

const ITERS: usize = 2_000;
const SAMPLES: usize = 7;

fn main() {
    println!("skein executor microbench (iterations={ITERS}, samples={SAMPLES})");
    bench_manual_submit();
    bench_pool_submit(1);
    bench_pool_submit(4);
    bench_pool_bound();
}

fn bench_manual_submit() {
    let mut samples = Vec::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        let ex = ManualExecutor::new();
        let start = Instant::now();
        for _ in 0..ITERS {
            for i in 0..128usize {
                ex.submit(Task::new(move || {
                    black_box(i);
                }))
                .unwrap();
            }
            ex.run_all();
        }
        let elapsed = start.elapsed();
        samples.push(elapsed.as_secs_f64() * 1e9 / ITERS as f64);
    }
    println!(
        "manual_submit/128: median {:.1} ns/iter",
        median(&mut samples)
    );
}

fn bench_pool_submit(workers: usize) {
    let mut samples = Vec::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        let pool = ThreadPool::new(workers).unwrap();
        let handle = pool.handle();
        let start = Instant::now();
        for _ in 0..ITERS {
            let remaining = Arc::new(AtomicUsize::new(128));
            let (tx, rx) = mpsc::channel();
            for _ in 0..128 {
                let remaining = remaining.clone();
                let tx = tx.clone();
                handle
                    .submit(Task::new(move || {
                        if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                            tx.send(()).unwrap();
                        }
                    }))
                    .unwrap();
            }
            rx.recv().unwrap();
        }
        let elapsed = start.elapsed();
        samples.push(elapsed.as_secs_f64() * 1e9 / ITERS as f64);
    }
    println!(
        "pool_submit/{workers}x128: median {:.1} ns/iter",
        median(&mut samples)
    );
}

fn bench_pool_bound() {
    let mut samples = Vec::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        let pool = ThreadPool::new(4).unwrap();
        let handle = pool.handle();
        let start = Instant::now();
        for _ in 0..ITERS {
            let (tx, rx) = mpsc::channel();
            for i in 0..64u64 {
                let tx = tx.clone();
                handle
                    .submit(
                        Task::new(move || tx.send(i).unwrap())
                            .bound(i % 4)
                            .with_priority(Priority::Emergency),
                    )
                    .unwrap();
            }
            drop(tx);
            black_box(rx.iter().count());
        }
        let elapsed = start.elapsed();
        samples.push(elapsed.as_secs_f64() * 1e9 / ITERS as f64);
    }
    println!(
        "pool_bound/64: median {:.1} ns/iter",
        median(&mut samples)
    );
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}
