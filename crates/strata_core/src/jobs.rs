use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

/// Worker pool shared by every parallel generation pass.
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|index| format!("strata-worker-{index}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        debug!("Job system started with {} worker(s)", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` inside the pool. Parallel iterators started by `op` use this
    /// pool's workers, and the call returns only once all of them finished.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rayon::prelude::*;

    use super::JobSystem;

    #[test]
    fn explicit_thread_count_is_respected() {
        let jobs = JobSystem::new(Some(3)).expect("build pool");
        assert_eq!(jobs.worker_count(), 3);
    }

    #[test]
    fn install_waits_for_every_parallel_task() {
        let jobs = JobSystem::new(Some(4)).expect("build pool");
        let counter = AtomicUsize::new(0);

        let sum: usize = jobs.install(|| {
            (0..1000usize)
                .into_par_iter()
                .map(|value| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    value
                })
                .sum()
        });

        assert_eq!(sum, 499_500);
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
    }
}
