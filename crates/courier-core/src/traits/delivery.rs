//! Delivery client trait.

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::types::{Deadline, Message};

/// Outbound transport: delivers exactly one message per call.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Deliver `message` before `deadline`, returning the delivery identifier.
    async fn send(&self, message: &Message, deadline: Deadline) -> Result<String, DeliveryError>;
}
