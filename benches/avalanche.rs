//! Benchmark a burst of independent jobs.

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use bencher::{run_tests_console, Bencher, TestDesc, TestDescAndFn, TestFn, TestOpts};
use skein_executor::ThreadPool;
use skein_future::{sequence, tasks};

/// Submit `jobs` empty fire-and-forget jobs and wait for the last one.
struct EmptyAvalanche {
    workers: usize,
    jobs: usize,
}

impl bencher::TDynBenchFn for EmptyAvalanche {
    fn run(&self, b: &mut Bencher) {
        let pool = ThreadPool::new(self.workers).unwrap();
        let handle = pool.handle();
        b.iter(|| {
            let remaining = Arc::new(AtomicUsize::new(self.jobs));
            let (tx, rx) = mpsc::channel();
            for _ in 0..self.jobs {
                let remaining = remaining.clone();
                let tx = tx.clone();
                tasks::run_and_forget(&handle, move || {
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        tx.send(()).unwrap();
                    }
                })
                .unwrap();
            }
            rx.recv().unwrap();
        });
    }
}

/// Submit `jobs` jobs returning futures and wait on their sequence.
struct FutureAvalanche {
    workers: usize,
    jobs: usize,
}

impl bencher::TDynBenchFn for FutureAvalanche {
    fn run(&self, b: &mut Bencher) {
        let pool = ThreadPool::new(self.workers).unwrap();
        let handle = pool.handle();
        b.iter(|| {
            let futures: Vec<_> = (0..self.jobs)
                .map(|i| tasks::run(&handle, move || i))
                .collect();
            let all = sequence(futures);
            all.wait();
            all.get().unwrap().len()
        });
    }
}

pub fn benches() -> ::std::vec::Vec<TestDescAndFn> {
    let mut benches = vec![];
    for workers in [1, 4] {
        for jobs in [1_000, 10_000] {
            benches.push(TestDescAndFn {
                desc: TestDesc {
                    name: Cow::from(format!("avalanche_empty/workers={}/jobs={}", workers, jobs)),
                    ignore: false,
                },
                testfn: TestFn::DynBenchFn(Box::new(EmptyAvalanche { workers, jobs })),
            });
            benches.push(TestDescAndFn {
                desc: TestDesc {
                    name: Cow::from(format!("avalanche_future/workers={}/jobs={}", workers, jobs)),
                    ignore: false,
                },
                testfn: TestFn::DynBenchFn(Box::new(FutureAvalanche { workers, jobs })),
            });
        }
    }
    benches
}

fn main() {
    let mut test_opts = TestOpts::default();
    if let Some(arg) = ::std::env::args().skip(1).find(|arg| *arg != "--bench") {
        test_opts.filter = Some(arg);
    }
    let mut all = Vec::new();
    all.extend(benches());
    run_tests_console(&test_opts, all).unwrap();
}
