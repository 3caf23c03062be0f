//! Single-lane job queue.
//!
//! Jobs run one at a time, in submission order, on a dedicated worker task. The next
//! job starts only after the previous one has fully finished, cleanup included, so at
//! most one headless browser is alive at any moment. A failing or panicking job is
//! logged and never takes the worker down.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::core::error::panic_message;
use crate::download::job::Job;

/// How a queued job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered,
    Failed(String),
    /// Not run because the same URL was already queued or running
    Skipped,
}

/// Executes one job. Implemented by the acquisition pipeline.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job) -> JobOutcome;
}

/// Handle to a submitted job's outcome.
pub struct JobTicket {
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobTicket {
    fn settled(outcome: JobOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        // Receiver is alive right here
        let _ = tx.send(outcome);
        Self { rx }
    }

    /// Waits until the job has finished.
    pub async fn wait(self) -> JobOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| JobOutcome::Failed("queue worker stopped".to_string()))
    }
}

struct QueuedJob {
    job: Job,
    done: oneshot::Sender<JobOutcome>,
}

pub struct ProcessingQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    /// URLs queued or running
    active: Arc<Mutex<HashSet<String>>>,
    pending: Arc<AtomicUsize>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProcessingQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(runner: Arc<dyn JobRunner>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(Mutex::new(HashSet::new()));
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = tokio::spawn(Self::work(rx, runner, Arc::clone(&active), Arc::clone(&pending)));

        Self {
            tx: Mutex::new(Some(tx)),
            active,
            pending,
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    async fn work(
        mut rx: mpsc::UnboundedReceiver<QueuedJob>,
        runner: Arc<dyn JobRunner>,
        active: Arc<Mutex<HashSet<String>>>,
        pending: Arc<AtomicUsize>,
    ) {
        log::info!("Processing queue worker started");

        while let Some(QueuedJob { job, done }) = rx.recv().await {
            log::info!("Starting job for {} (chat {})", job.url, job.chat_id);

            let outcome = match AssertUnwindSafe(runner.run(&job)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("Job for {} panicked: {}", job.url, message);
                    JobOutcome::Failed(format!("job panicked: {}", message))
                }
            };

            lock(&active).remove(&job.url);
            pending.fetch_sub(1, Ordering::SeqCst);
            log::info!("Finished job for {}: {:?}", job.url, outcome);

            if done.send(outcome).is_err() {
                log::debug!("Nobody is waiting for {}", job.url);
            }
        }

        log::info!("Processing queue worker stopped");
    }

    /// Submits a job without waiting for it to run.
    ///
    /// A URL that is already queued or running is not queued again; its ticket
    /// settles immediately as [`JobOutcome::Skipped`].
    pub fn enqueue(&self, job: Job) -> JobTicket {
        if !lock(&self.active).insert(job.url.clone()) {
            log::warn!("Job for {} is already queued, skipping", job.url);
            return JobTicket::settled(JobOutcome::Skipped);
        }

        let (done, rx) = oneshot::channel();
        let url = job.url.clone();
        let sent = match lock(&self.tx).as_ref() {
            Some(tx) => {
                self.pending.fetch_add(1, Ordering::SeqCst);
                tx.send(QueuedJob { job, done }).is_ok()
            }
            None => false,
        };

        if !sent {
            log::error!("Queue is shut down, dropping job for {}", url);
            lock(&self.active).remove(&url);
            return JobTicket::settled(JobOutcome::Failed("queue is shut down".to_string()));
        }

        log::debug!("Queued {} ({} pending)", url, self.size());
        JobTicket { rx }
    }

    /// Queued plus running jobs.
    pub fn size(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stops accepting jobs and waits until the already queued ones have run.
    pub async fn shutdown(&self) {
        lock(&self.tx).take();
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                log::error!("Queue worker ended abnormally: {}", e);
            }
        }
    }
}
