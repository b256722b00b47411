//! rm-triage - reading-progress triage for the reMarkable document store
//!
//! Watches the device's local document directory and files web articles into
//! three folders as they are read:
//!
//! - **To Read**: new articles sent to the device land here
//! - **Read Articles**: articles whose progress signals say they were read
//! - **Archived Articles**: read articles left unopened for a while (opt-in)
//!
//! Progress is estimated from page annotations, recent opens, and reading time
//! accumulated across passes in a small JSON state file.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod service;
pub mod store;
pub mod triage;

pub use config::Config;
pub use daemon::{LoopStats, PollLoop};
pub use error::{ConfigError, StoreError, TriageError};
pub use store::XochitlStore;
pub use triage::{ObservationStore, PassReport, TriageController};

/// Current time in epoch milliseconds
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
