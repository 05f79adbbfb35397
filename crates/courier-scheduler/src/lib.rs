//! # Courier Scheduler
//!
//! Periodic outbound message dispatch.
//!
//! ## Architecture
//! ```text
//! Scheduler (tokio interval, one loop)
//!   └── every tick → BatchExecutor
//!                      ├── MessageStore::fetch_unsent (insertion order, bounded)
//!                      ├── WebhookClient::send (HTTP POST, deadline-bound)
//!                      └── MessageStore::mark_sent (delivery id recorded)
//! ```

pub mod batch;
pub mod dispatch;
pub mod engine;
pub mod persistence;

pub use batch::{BatchExecutor, BatchReport, BatchSettings};
pub use dispatch::WebhookClient;
pub use engine::{Scheduler, SchedulerSettings};
pub use persistence::SqliteMessageStore;
