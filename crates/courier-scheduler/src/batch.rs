//! Batch executor: one bounded unit of delivery work per tick.
//!
//! Fetch up to `max_per_tick` unsent messages in insertion order, re-truncate,
//! deliver each one, and record successes. Per-message failures are logged
//! and skipped; only a failed fetch aborts the batch.

use async_trait::async_trait;
use courier_core::config::SchedulerConfig;
use courier_core::error::Result;
use courier_core::traits::{DeliveryClient, MessageStore, TickExecutor};
use courier_core::types::Deadline;
use std::sync::Arc;

/// Per-batch limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub max_per_tick: usize,
    pub char_limit: usize,
}

impl BatchSettings {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            max_per_tick: config.max_per_tick(),
            char_limit: config.char_limit(),
        }
    }
}

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Delivered remotely but `mark_sent` failed; will be resent next tick.
    pub unrecorded: usize,
}

pub struct BatchExecutor {
    store: Arc<dyn MessageStore>,
    client: Arc<dyn DeliveryClient>,
    settings: BatchSettings,
}

impl BatchExecutor {
    pub fn new(
        store: Arc<dyn MessageStore>,
        client: Arc<dyn DeliveryClient>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            store,
            client,
            settings,
        }
    }

    /// Run one batch against `deadline`.
    pub async fn run_batch(&self, deadline: Deadline) -> Result<BatchReport> {
        let messages = self.store.fetch_unsent(self.settings.max_per_tick).await?;
        let mut report = BatchReport {
            fetched: messages.len(),
            ..BatchReport::default()
        };

        for mut message in messages {
            message.truncate_content(self.settings.char_limit);

            let delivery_id = match self.client.send(&message, deadline).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(id = message.id, error = %e, "send failed");
                    report.failed += 1;
                    continue;
                }
            };

            match self.store.mark_sent(message.id, &delivery_id).await {
                Ok(()) => {
                    tracing::debug!(id = message.id, delivery_id = %delivery_id, "message sent");
                    report.delivered += 1;
                }
                Err(e) => {
                    tracing::error!(
                        id = message.id,
                        delivery_id = %delivery_id,
                        error = %e,
                        "mark sent failed after delivery"
                    );
                    report.unrecorded += 1;
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl TickExecutor for BatchExecutor {
    async fn execute(&self, deadline: Deadline) -> Result<()> {
        let report = self.run_batch(deadline).await?;
        if report.fetched > 0 {
            tracing::info!(
                fetched = report.fetched,
                delivered = report.delivered,
                failed = report.failed,
                unrecorded = report.unrecorded,
                "📤 Batch finished"
            );
        } else {
            tracing::debug!("No unsent messages");
        }
        Ok(())
    }
}
