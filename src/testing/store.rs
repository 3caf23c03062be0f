//! Map-backed [`JobRecordStore`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::core::error::AppResult;
use crate::storage::jobs::{JobRecord, JobRecordStore};

#[derive(Default)]
pub struct MemoryJobStore {
    records: Mutex<BTreeMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, JobRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JobRecordStore for MemoryJobStore {
    fn save(&self, record: &JobRecord) -> AppResult<()> {
        self.lock().insert(record.url.clone(), record.clone());
        Ok(())
    }

    fn load_all(&self) -> AppResult<Vec<JobRecord>> {
        Ok(self.lock().values().cloned().collect())
    }

    fn get(&self, url: &str) -> AppResult<Option<JobRecord>> {
        Ok(self.lock().get(url).cloned())
    }

    fn remove(&self, url: &str) -> AppResult<bool> {
        Ok(self.lock().remove(url).is_some())
    }
}
