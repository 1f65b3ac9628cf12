//! Dedicated OS threads for probes that perform blocking I/O.
//!
//! Work is handed over through a bounded queue, so callers wait for queue
//! space when every worker is busy and the queue is full. Results come back
//! over a oneshot channel; awaiting them never holds an async worker thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    Closed,

    #[error("worker stopped before returning a result")]
    WorkerLost,
}

pub struct BlockingPool {
    name: String,
    sender: mpsc::Sender<Task>,
    workers: usize,
}

impl BlockingPool {
    /// Spawn `workers` threads named `{name}-{n}` behind a queue of `queue_capacity` tasks
    pub fn new(name: &str, workers: usize, queue_capacity: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Task>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for index in 0..workers {
            let receiver = receiver.clone();
            std::thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(receiver))?;
        }

        tracing::debug!("Started blocking pool {} with {} workers", name, workers);
        Ok(Self { name: name.to_string(), sender, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` on a pool thread and await its result
    pub async fn run<F, R>(&self, task: F) -> Result<R, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job: Task = Box::new(move || {
            let _ = result_tx.send(task());
        });

        self.sender.send(job).await.map_err(|_| PoolError::Closed)?;
        result_rx.await.map_err(|_| {
            tracing::warn!("Task on blocking pool {} ended without a result", self.name);
            PoolError::WorkerLost
        })
    }
}

fn worker_loop(receiver: Arc<Mutex<mpsc::Receiver<Task>>>) {
    loop {
        let next = match receiver.lock() {
            Ok(mut guard) => guard.blocking_recv(),
            Err(_) => return,
        };

        let Some(task) = next else {
            // All senders dropped: the pool is gone
            return;
        };

        if catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::error!("Blocking task panicked; worker continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_task_off_the_runtime() {
        let pool = BlockingPool::new("test-pool", 2, 4).unwrap();

        let name = pool
            .run(|| std::thread::current().name().map(str::to_string))
            .await
            .unwrap();

        assert!(name.unwrap().starts_with("test-pool-"));
    }

    #[tokio::test]
    async fn test_panicking_task_reports_worker_lost_and_pool_survives() {
        let pool = BlockingPool::new("panicky", 1, 1).unwrap();

        let lost = pool.run(|| -> u32 { panic!("boom") }).await;
        assert_eq!(lost, Err(PoolError::WorkerLost));

        assert_eq!(pool.run(|| 7).await, Ok(7));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_worker_count() {
        let pool = Arc::new(BlockingPool::new("bounded", 2, 8).unwrap());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                let running = running.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    pool.run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(30));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= pool.workers());
    }
}
