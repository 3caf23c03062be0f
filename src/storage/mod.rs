//! Database and job record persistence

pub mod db;
pub mod jobs;
pub mod migrations;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use jobs::{JobRecord, JobRecordStore, SqliteJobStore};
