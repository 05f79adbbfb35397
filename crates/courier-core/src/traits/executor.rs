//! Unit of work run once per scheduler tick.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Deadline;

#[async_trait]
pub trait TickExecutor: Send + Sync {
    /// Run one bounded batch. Only errors that abort the whole tick are returned.
    async fn execute(&self, deadline: Deadline) -> Result<()>;
}
