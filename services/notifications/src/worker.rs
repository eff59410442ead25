use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::domain::repository::QueueConsumer;
use crate::domain::types::ProcessingOutcome;
use crate::error::QueueError;
use crate::handlers::QueueHandler;

/// Polls one queue and settles each message according to its handler.
///
/// Messages are processed one at a time. Several workers may poll the same
/// queue; leases keep them from processing the same message concurrently.
pub struct QueueWorker<C, H> {
    pub consumer: C,
    pub handler: H,
    pub queue_name: String,
    pub poll_interval: Duration,
    pub visibility_timeout: Duration,
}

impl<C: QueueConsumer, H: QueueHandler> QueueWorker<C, H> {
    /// Runs until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.queue_name, "queue worker started");
        while !*shutdown.borrow() {
            let processed = match self.poll_once().await {
                Ok(processed) => processed,
                Err(err) => {
                    error!(queue = %self.queue_name, error = %err, "queue poll failed");
                    false
                }
            };
            if processed {
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(queue = %self.queue_name, "queue worker stopped");
    }

    /// Receives and processes at most one message. Returns whether one was found.
    pub async fn poll_once(&self) -> Result<bool, QueueError> {
        let Some(message) = self
            .consumer
            .receive(&self.queue_name, self.visibility_timeout)
            .await?
        else {
            return Ok(false);
        };

        debug!(
            queue = %self.queue_name,
            message_id = %message.id,
            dequeue_count = message.dequeue_count,
            "message received"
        );

        match self.handler.handle(&message).await {
            ProcessingOutcome::Completed => self.consumer.complete(&message).await?,
            ProcessingOutcome::RetryScheduled => {}
            ProcessingOutcome::RetriesExhausted => {
                self.consumer
                    .dead_letter(&message, "max dequeue count reached")
                    .await?
            }
        }
        Ok(true)
    }
}
