//! Handler types and dependencies

use std::sync::Arc;

use crate::core::config;
use crate::download::delivery::Messenger;
use crate::download::job::Job;
use crate::download::queue::ProcessingQueue;
use crate::storage::jobs::JobRecordStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<dyn JobRecordStore>,
    pub queue: Arc<ProcessingQueue>,
    pub messenger: Arc<dyn Messenger>,
    /// Chats allowed to submit links; empty means all
    pub allowed_chats: Arc<Vec<i64>>,
    /// Write the job record when the link arrives instead of on first failure
    pub persist_on_submit: bool,
}

impl HandlerDeps {
    pub fn new(store: Arc<dyn JobRecordStore>, queue: Arc<ProcessingQueue>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            store,
            queue,
            messenger,
            allowed_chats: Arc::new(config::VALID_CHAT_IDS.clone()),
            persist_on_submit: *config::PERSIST_ON_SUBMIT,
        }
    }

    /// Queues a job accepted from the chat.
    pub fn submit(&self, job: Job) {
        if self.persist_on_submit {
            if let Err(e) = self.store.save(&job.to_record(None)) {
                log::error!("Failed to persist submitted link {}: {}", job.url, e);
            }
        }
        // The job runs whether or not anyone waits for the ticket
        drop(self.queue.enqueue(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::queue::{JobOutcome, JobRunner};
    use crate::testing::messenger::RecordingMessenger;
    use crate::testing::store::MemoryJobStore;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl JobRunner for Noop {
        async fn run(&self, _job: &Job) -> JobOutcome {
            JobOutcome::Delivered
        }
    }

    #[tokio::test]
    async fn test_submit_persists_only_when_enabled() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(ProcessingQueue::start(Arc::new(Noop)));
        let mut deps = HandlerDeps {
            store: store.clone(),
            queue: queue.clone(),
            messenger: Arc::new(RecordingMessenger::new()),
            allowed_chats: Arc::new(Vec::new()),
            persist_on_submit: false,
        };
        let job = |id: &str| Job::new(format!("https://vm.tiktok.com/{}/", id), 1, None, "u", 1).expect("job");

        deps.submit(job("A"));
        assert!(store.get("https://vm.tiktok.com/A/").expect("get").is_none());

        deps.persist_on_submit = true;
        deps.submit(job("B"));
        assert!(store.get("https://vm.tiktok.com/B/").expect("get").is_some());

        queue.shutdown().await;
    }
}
