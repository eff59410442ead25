#![allow(async_fn_in_trait)]

pub mod notification_queue;
pub mod profile_queue;

use crate::domain::types::{ProcessingOutcome, QueueMessage};

/// Processes one leased message and says how to settle it.
pub trait QueueHandler: Send + Sync {
    async fn handle(&self, message: &QueueMessage) -> ProcessingOutcome;
}
