//! Re-running jobs that were never delivered.
//!
//! Pending job records are pushed back through the queue in two ways: the `/retry`
//! chat command, which reports progress in a status message, and a silent sweep that
//! runs once at startup and then on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::core::error::AppResult;
use crate::download::delivery::{ChatTarget, Messenger};
use crate::download::job::Job;
use crate::download::queue::{JobTicket, ProcessingQueue};
use crate::storage::jobs::JobRecordStore;

/// Pending records as runnable jobs.
///
/// `fallback_chat` replaces a missing chat id. Records whose URL no longer matches any
/// platform are skipped.
pub fn pending_jobs(store: &dyn JobRecordStore, fallback_chat: Option<i64>) -> AppResult<Vec<Job>> {
    let jobs = store
        .load_all()?
        .iter()
        .filter_map(|record| {
            let job = Job::from_record(record, fallback_chat);
            if job.is_none() {
                log::warn!("Skipping stored link with no supported platform: {}", record.url);
            }
            job
        })
        .collect();
    Ok(jobs)
}

/// Enqueues every pending record and returns the tickets.
pub fn replay_pending(store: &dyn JobRecordStore, queue: &ProcessingQueue) -> AppResult<Vec<JobTicket>> {
    let jobs = pending_jobs(store, None)?;
    if !jobs.is_empty() {
        log::info!("Replaying {} pending link(s)", jobs.len());
    }
    Ok(jobs.into_iter().map(|job| queue.enqueue(job)).collect())
}

/// Runs `/retry` for the chat at `target`.
///
/// The status message is always deleted at the end. The command message is deleted
/// only when there was nothing to retry.
pub async fn handle_retry_command(
    messenger: &dyn Messenger,
    store: &dyn JobRecordStore,
    queue: &ProcessingQueue,
    target: ChatTarget,
    command_message_id: i32,
) -> AppResult<()> {
    let status_id = messenger.send_text(target, "🔄 Looking for pending links…", None).await?;

    let result = run_retry(messenger, store, queue, target, command_message_id, status_id).await;
    if let Err(ref e) = result {
        log::error!("Error in /retry command: {}", e);
    }

    if let Err(e) = messenger.delete_message(target.chat_id, status_id).await {
        log::warn!("Failed to delete /retry status message: {}", e);
    }
    result
}

async fn run_retry(
    messenger: &dyn Messenger,
    store: &dyn JobRecordStore,
    queue: &ProcessingQueue,
    target: ChatTarget,
    command_message_id: i32,
    status_id: i32,
) -> AppResult<()> {
    let jobs = pending_jobs(store, Some(target.chat_id))?;

    if jobs.is_empty() {
        messenger
            .edit_text(target.chat_id, status_id, "No pending links found 🥲")
            .await?;
        messenger.delete_message(target.chat_id, command_message_id).await?;
        return Ok(());
    }

    let total = jobs.len();
    messenger
        .edit_text(target.chat_id, status_id, &format!("🔄 Found {}. Processing…", total))
        .await?;

    let tickets: Vec<JobTicket> = jobs.into_iter().map(|job| queue.enqueue(job)).collect();
    for (done, ticket) in tickets.into_iter().enumerate() {
        let outcome = ticket.wait().await;
        log::debug!("/retry job {} of {}: {:?}", done + 1, total, outcome);
        if let Err(e) = messenger
            .edit_text(
                target.chat_id,
                status_id,
                &format!("🔄 Processed {} of {}…", done + 1, total),
            )
            .await
        {
            log::warn!("Failed to update /retry progress: {}", e);
        }
    }
    Ok(())
}

/// Replays pending records now and then every `interval`.
pub fn spawn_replay_sweep(
    store: Arc<dyn JobRecordStore>,
    queue: Arc<ProcessingQueue>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        log::info!("Replay sweep started (interval: {}s)", interval.as_secs());

        loop {
            // First tick completes immediately: the startup replay
            ticker.tick().await;
            if let Err(e) = replay_pending(store.as_ref(), &queue) {
                log::error!("Replay sweep failed to load pending links: {}", e);
            }
        }
    })
}
