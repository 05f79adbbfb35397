//! Message model and delivery deadline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{CourierError, Result};

/// Store-assigned message identifier.
pub type MessageId = i64;

/// An outbound message as persisted by the store.
///
/// Once `sent` is true, `delivery_id` is non-empty and `sent_at` is set.
/// JSON keys are camelCase; the delivery id travels as `webhookMsgId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    /// Destination address (E.164 phone number at the HTTP surface).
    pub to: String,
    pub content: String,
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Identifier returned by the remote endpoint; empty until delivered.
    #[serde(
        default,
        rename = "webhookMsgId",
        skip_serializing_if = "String::is_empty"
    )]
    pub delivery_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Clamp content to `limit` characters in place.
    pub fn truncate_content(&mut self, limit: usize) {
        if let Some(cut) = truncated(&self.content, limit) {
            self.content = cut;
        }
    }
}

/// A validated message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub to: String,
    pub content: String,
}

impl NewMessage {
    /// Trim and validate the fields, truncating content to `char_limit`.
    pub fn new(to: &str, content: &str, char_limit: usize) -> Result<Self> {
        let to = to.trim();
        let content = content.trim();
        if to.is_empty() || content.is_empty() {
            return Err(CourierError::Validation("to and content required".into()));
        }
        Ok(Self {
            to: to.to_string(),
            content: truncate_chars(content, char_limit),
        })
    }
}

/// Cut `s` to at most `limit` characters, never splitting a code point.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    truncated(s, limit).unwrap_or_else(|| s.to_string())
}

fn truncated(s: &str, limit: usize) -> Option<String> {
    let (byte_idx, _) = s.char_indices().nth(limit)?;
    Some(s[..byte_idx].to_string())
}

/// Absolute point in time after which an in-flight delivery must give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Time left before expiry (zero once expired).
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}
