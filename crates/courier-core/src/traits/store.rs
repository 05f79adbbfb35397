//! Message store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Message, MessageId, NewMessage};

/// Persistent message store. Each call is atomic; implementations own
/// their concurrency safety.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Up to `limit` unsent messages in insertion (id) order.
    async fn fetch_unsent(&self, limit: usize) -> Result<Vec<Message>>;

    /// Record a successful delivery.
    async fn mark_sent(&self, id: MessageId, delivery_id: &str) -> Result<()>;

    /// All delivered messages, most recently sent first.
    async fn list_sent(&self) -> Result<Vec<Message>>;

    /// Persist a new unsent message and return it with its assigned id.
    async fn create(&self, message: NewMessage) -> Result<Message>;

    /// Number of messages still waiting for delivery.
    async fn count_unsent(&self) -> Result<usize>;
}
