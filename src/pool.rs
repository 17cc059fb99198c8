//! Bounded worker pool
//!
//! A fixed set of long-lived workers consuming tasks from a bounded FIFO
//! queue. A task is an argument handed to the pool's handler function,
//! mirroring the classic `(routine, argument)` pool shape. Admission is
//! backpressure-by-rejection: `submit` never blocks, it fails immediately
//! when the queue is full and hands the argument back so the caller decides
//! whether to drop, retry, or reject the connection. Once dequeued, a task
//! runs to completion on that worker and never migrates.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::SubmitError;

/// Fixed-size worker pool over a bounded FIFO task queue
pub struct WorkerPool<T: Send + 'static> {
    sender: mpsc::Sender<T>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `worker_count` workers sharing a queue of `queue_capacity` slots
    ///
    /// Every dequeued task is executed by calling `handler` on it.
    pub fn new<F, Fut>(worker_count: usize, queue_capacity: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<T>(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..worker_count)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                let handler = Arc::clone(&handler);
                tokio::spawn(worker_loop(index, receiver, handler))
            })
            .collect();

        Self { sender, workers }
    }

    /// Enqueue a task without blocking
    ///
    /// Fails with `QueueFull` when the queue is at capacity, returning the
    /// task to the caller; rejected work never runs.
    pub fn submit(&self, task: T) -> Result<(), SubmitError<T>> {
        self.sender.try_send(task).map_err(|e| match e {
            TrySendError::Full(task) => SubmitError::QueueFull(task),
            TrySendError::Closed(task) => SubmitError::PoolClosed(task),
        })
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting tasks, drain the queue, and wait for every worker
    ///
    /// After this returns no task executes concurrently with pool teardown.
    pub async fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.await;
        }
        debug!("Worker pool shut down");
    }
}

/// One worker: dequeue exactly one task at a time and run it to completion
///
/// The shared receiver hands out tasks in submission order. When the queue
/// is closed and drained, `recv` returns `None` and the worker exits.
async fn worker_loop<T, F, Fut>(
    index: usize,
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    handler: Arc<F>,
) where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    debug!("Worker {} started", index);
    loop {
        // Hold the receiver lock only for the dequeue, never while running
        let task = { receiver.lock().await.recv().await };
        match task {
            Some(task) => handler(task).await,
            None => break,
        }
    }
    debug!("Worker {} exiting", index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Pool of boxed futures with an identity handler, for testing
    type FuturePool = WorkerPool<std::pin::Pin<Box<dyn Future<Output = ()> + Send>>>;

    fn future_pool(worker_count: usize, queue_capacity: usize) -> FuturePool {
        WorkerPool::new(worker_count, queue_capacity, |task| task)
    }

    #[tokio::test]
    async fn test_tasks_run_and_shutdown_drains() {
        let pool = future_pool(2, 8);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_fifo_order_with_single_worker() {
        let pool = future_pool(1, 8);
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            pool.submit(Box::pin(async move {
                order.lock().unwrap().push(i);
            }))
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_submit_fails_when_queue_full() {
        let pool = future_pool(1, 1);

        // Occupy the single worker until released
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        pool.submit(Box::pin(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
        }))
        .unwrap();
        started_rx.await.unwrap();

        // Fill the one queue slot, then the next submission must be rejected
        pool.submit(Box::pin(async {})).unwrap();
        let err = pool.submit(Box::pin(async {})).unwrap_err();
        assert!(matches!(err, SubmitError::QueueFull(_)));

        release_tx.send(()).unwrap();
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_task_never_runs() {
        let pool = future_pool(1, 1);
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        pool.submit(Box::pin(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
        }))
        .unwrap();
        started_rx.await.unwrap();

        pool.submit(Box::pin(async {})).unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        let result = pool.submit(Box::pin(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(result.is_err());

        release_tx.send(()).unwrap();
        pool.shutdown().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_hands_the_task_back() {
        let pool: WorkerPool<u32> = WorkerPool::new(1, 1, |_| async {
            // Workers never free up in this test
            std::future::pending::<()>().await;
        });

        pool.submit(1).unwrap();
        // Worker may or may not have dequeued the first task yet; keep
        // submitting until the queue is definitely full.
        let mut rejected = None;
        for value in 2..10 {
            if let Err(SubmitError::QueueFull(task)) = pool.submit(value) {
                rejected = Some(task);
                break;
            }
        }
        assert!(rejected.is_some());
    }
}
