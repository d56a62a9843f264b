//! Fixed-size worker pool
//!
//! Workers pull jobs from one shared queue holding at most one pending job,
//! so `submit` waits while every worker is busy and the slot is taken.

use super::task::{Job, JobResult, Task, TaskParams};
use crate::error::PoolError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Number of jobs the queue holds before `submit` waits
const QUEUE_CAPACITY: usize = 1;

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>;

/// Bounded pool of tokio workers
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    /// Set once every worker has been joined
    stopped: AtomicBool,
    size: usize,
}

impl WorkerPool {
    /// Start `size` workers on the current runtime
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| tokio::spawn(run_worker(id, queue.clone())))
            .collect();

        info!("Started worker pool with {} workers", size);
        Self {
            sender: Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(workers),
            stopped: AtomicBool::new(false),
            size,
        }
    }

    /// Queue a job, waiting for a free slot
    pub async fn submit(&self, job: Job) -> Result<(), PoolError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(PoolError::Stopped)?;

        sender.send(job).await.map_err(|_| PoolError::Stopped)
    }

    /// Wrap a task into a job, queue it and return its result conduit
    pub async fn dispatch(
        &self,
        task: Box<dyn Task>,
        params: TaskParams,
    ) -> Result<oneshot::Receiver<JobResult>, PoolError> {
        let (job, receiver) = Job::new(task, params);
        self.submit(job).await?;
        Ok(receiver)
    }

    /// Close the queue, let queued and in-flight jobs finish and join workers.
    ///
    /// Later submissions fail with [`PoolError::Stopped`].
    pub async fn stop(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(e) = handle.await {
                warn!("Worker terminated abnormally: {}", e);
            }
        }
        self.stopped.store(true, Ordering::Release);
        info!("Worker pool stopped");
    }

    /// True once `stop()` has joined every worker, so no conduit is written anymore
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }
}

async fn run_worker(id: usize, queue: SharedQueue) {
    loop {
        let job = queue.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        debug!(worker = id, upstream = job.upstream(), "Running job");
        job.execute().await;
    }
    debug!(worker = id, "Worker exiting");
}
