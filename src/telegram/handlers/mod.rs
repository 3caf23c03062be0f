//! Telegram bot handler tree configuration
//!
//! The schema is built from injected dependencies so integration tests can reuse
//! the production handler tree.

mod schema;
mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
