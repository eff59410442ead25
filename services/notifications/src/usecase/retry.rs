use tracing::{error, warn};

use courier_core::error::RuntimeError;
use courier_core::store::DocumentStore;
use courier_domain::channel::NotificationChannelStatusValue;

use crate::domain::repository::QueueControl;
use crate::domain::types::{ProcessingOutcome, QueueMessage};
use crate::usecase::status::NotificationStatusUpdater;

/// How many times a failed `FAILED` write may turn a permanent failure into
/// a transient one before the driver stops trying to record it.
pub const MAX_RECLASSIFICATIONS: u32 = 3;

/// Status bookkeeping performed by the driver.
pub trait StatusSink: Send + Sync {
    async fn record(&self, status: NotificationChannelStatusValue) -> Result<(), RuntimeError>;
}

impl<S: DocumentStore> StatusSink for NotificationStatusUpdater<S> {
    async fn record(&self, status: NotificationChannelStatusValue) -> Result<(), RuntimeError> {
        self.update(status).await.map(|_| ())
    }
}

/// For queues whose messages have no delivery status.
pub struct NoStatus;

impl StatusSink for NoStatus {
    async fn record(&self, _status: NotificationChannelStatusValue) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Decides what happens to a queue message whose processing failed.
///
/// Transient: record `QUEUED` (best effort) and extend visibility so the
/// message is delivered again. Permanent: record `FAILED` and let the message
/// leave the queue. If `FAILED` cannot be recorded, the write failure is
/// handled as a new transient error.
pub struct RetryDriver<Q> {
    pub queue: Q,
}

impl<Q: QueueControl> RetryDriver<Q> {
    pub async fn handle_failure<T: StatusSink>(
        &self,
        message: &QueueMessage,
        error: RuntimeError,
        status: &T,
    ) -> ProcessingOutcome {
        let mut error = error;
        let mut reclassified = 0;
        loop {
            if error.is_transient() || reclassified >= MAX_RECLASSIFICATIONS {
                return self.schedule_retry(message, &error, status).await;
            }
            error!(
                queue = %message.queue_name,
                message_id = %message.id,
                error = %error,
                "permanent failure"
            );
            match status.record(NotificationChannelStatusValue::Failed).await {
                Ok(()) => return ProcessingOutcome::Completed,
                Err(status_error) => {
                    reclassified += 1;
                    error = status_error;
                }
            }
        }
    }

    async fn schedule_retry<T: StatusSink>(
        &self,
        message: &QueueMessage,
        error: &RuntimeError,
        status: &T,
    ) -> ProcessingOutcome {
        warn!(
            queue = %message.queue_name,
            message_id = %message.id,
            dequeue_count = message.dequeue_count,
            error = %error,
            "transient failure, scheduling retry"
        );
        if let Err(status_error) = status.record(NotificationChannelStatusValue::Queued).await {
            warn!(error = %status_error, "could not record QUEUED status");
        }
        match self.queue.extend_visibility(message).await {
            Ok(true) => ProcessingOutcome::RetryScheduled,
            Ok(false) => {
                error!(
                    queue = %message.queue_name,
                    message_id = %message.id,
                    dequeue_count = message.dequeue_count,
                    "retries exhausted"
                );
                if let Err(status_error) = status.record(NotificationChannelStatusValue::Failed).await
                {
                    warn!(error = %status_error, "could not record FAILED status");
                }
                ProcessingOutcome::RetriesExhausted
            }
            Err(queue_error) => {
                // The lease still expires on its own and the message comes back.
                warn!(
                    queue = %message.queue_name,
                    message_id = %message.id,
                    error = %queue_error,
                    "could not extend visibility, relying on lease expiry"
                );
                ProcessingOutcome::RetryScheduled
            }
        }
    }
}
