//! Persistent download list (SQLite via sqlx).
//!
//! Stores the requests the CLI has queued, their last known state and
//! destination, and the transport resume blob of paused downloads.

pub mod db;
mod downloads;
mod resume_data;
pub mod types;

pub use db::*;
pub use types::*;
