//! Test doubles shared by unit tests and the integration tests under `tests/`.
//!
//! - [`browser`]: scripted page and launcher for scrapers and sessions
//! - [`messenger`]: records chat messages instead of sending them
//! - [`resolvers`]: providers with fixed outcomes
//! - [`store`]: in-memory job records

pub mod browser;
pub mod messenger;
pub mod resolvers;
pub mod store;

pub use browser::{FakeLauncher, FakePage, PageAction};
pub use messenger::{RecordingMessenger, Sent};
pub use resolvers::{FakeDownloader, ScriptedResolver};
pub use store::MemoryJobStore;
