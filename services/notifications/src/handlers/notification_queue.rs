use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use courier_core::error::RuntimeError;
use courier_core::store::{DocumentStore, StoreError, store_error_message};
use courier_core::versioned::VersionedModel;
use courier_domain::channel::NotificationChannelStatusValue;

use crate::domain::repository::QueueControl;
use crate::domain::types::{
    Notification, NotificationEvent, NotificationStatus, ProcessingOutcome, QueueMessage,
};
use crate::handlers::QueueHandler;
use crate::usecase::ChannelDelivery;
use crate::usecase::retry::RetryDriver;
use crate::usecase::status::NotificationStatusUpdater;

/// Delivers notification events from one channel's queue.
pub struct NotificationQueueHandler<S, D, Q> {
    pub notifications: VersionedModel<S, Notification>,
    pub statuses: VersionedModel<S, NotificationStatus>,
    pub delivery: D,
    pub driver: RetryDriver<Q>,
}

impl<S, D, Q> NotificationQueueHandler<S, D, Q>
where
    S: DocumentStore + Clone,
    D: ChannelDelivery,
    Q: QueueControl,
{
    /// Runs one processing attempt for `message` as of `now`.
    pub async fn process(&self, message: &QueueMessage, now: DateTime<Utc>) -> ProcessingOutcome {
        let event: NotificationEvent = match serde_json::from_value(message.payload.clone()) {
            Ok(event) => event,
            Err(err) => {
                // Retrying cannot fix the payload.
                error!(
                    queue = %message.queue_name,
                    message_id = %message.id,
                    error = %err,
                    "malformed notification event, dropping"
                );
                return ProcessingOutcome::Completed;
            }
        };

        let updater = NotificationStatusUpdater::new(
            self.statuses.clone(),
            D::CHANNEL,
            event.message.id.clone(),
            event.notification_id.clone(),
        );

        if event.message.is_expired(now) {
            return match updater.update(NotificationChannelStatusValue::Expired).await {
                Ok(_) => {
                    info!(
                        notification_id = %event.notification_id,
                        message_id = %event.message.id,
                        channel = %D::CHANNEL,
                        "message expired, not delivering"
                    );
                    ProcessingOutcome::Completed
                }
                Err(err) => self.driver.handle_failure(message, err, &updater).await,
            };
        }

        let delivered = match self.handle_notification(&event).await {
            Ok(()) => updater
                .update(NotificationChannelStatusValue::SentToChannel)
                .await
                .map(|_| ()),
            Err(err) => Err(err),
        };

        match delivered {
            Ok(()) => {
                info!(
                    notification_id = %event.notification_id,
                    message_id = %event.message.id,
                    channel = %D::CHANNEL,
                    "notification sent to channel"
                );
                ProcessingOutcome::Completed
            }
            Err(err) => self.driver.handle_failure(message, err, &updater).await,
        }
    }

    /// Loads the notification and delivers it over this handler's channel.
    pub async fn handle_notification(&self, event: &NotificationEvent) -> Result<(), RuntimeError> {
        let notification_id = event.notification_id.as_str();
        let message_id = event.message.id.as_str();

        let notification = self
            .notifications
            .find(notification_id, message_id)
            .await
            .map_err(|err| fetch_error(notification_id, message_id, &err))?
            // Not visible yet; the notification may have been written just now.
            .ok_or_else(|| {
                RuntimeError::transient(format!(
                    "notification {notification_id} for message {message_id} not found"
                ))
            })?;

        debug!(
            notification_id,
            version = notification.version,
            "delivering notification"
        );
        self.delivery.deliver(event, &notification.entity).await
    }
}

fn fetch_error(notification_id: &str, message_id: &str, err: &StoreError) -> RuntimeError {
    let message = format!(
        "fetch notification {notification_id} for message {message_id}: {}",
        store_error_message(err)
    );
    match err {
        StoreError::Decode { .. } => RuntimeError::permanent(message),
        _ => RuntimeError::transient(message),
    }
}

impl<S, D, Q> QueueHandler for NotificationQueueHandler<S, D, Q>
where
    S: DocumentStore + Clone,
    D: ChannelDelivery,
    Q: QueueControl,
{
    async fn handle(&self, message: &QueueMessage) -> ProcessingOutcome {
        self.process(message, Utc::now()).await
    }
}
