//! Fixed-size worker pool for play handlers and connection releases.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::error;

use crate::error::NetError;

pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, NetError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("ember-worker-{i}"))
            .panic_handler(|_| error!("Worker job panicked"))
            .build()
            .map_err(|e| NetError::InvalidConfig(format!("worker pool: {e}")))?;
        Ok(Self { pool })
    }

    /// Run `job` on some worker thread.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.pool.spawn(job);
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn runs_jobs_on_named_threads() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2);
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        });
        let name = rx.recv().unwrap().unwrap();
        assert!(name.starts_with("ember-worker-"));
    }

    #[test]
    fn survives_panicking_job() {
        let pool = WorkerPool::new(1).unwrap();
        pool.spawn(|| panic!("boom"));
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || tx.send(7).unwrap());
        assert_eq!(rx.recv().unwrap(), 7);
    }
}
