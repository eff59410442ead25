use chrono::Utc;

use courier_core::error::RuntimeError;
use courier_core::store::{DocumentStore, store_error_message};
use courier_core::versioned::{Versioned, VersionedModel};
use courier_domain::channel::{NotificationChannel, NotificationChannelStatusValue};
use courier_domain::id::{MessageId, NotificationId};

use crate::domain::types::{NotificationStatus, make_status_id};

/// Appends status versions for one (notification, channel) pair.
///
/// Every call appends a version, even when the value did not change.
pub struct NotificationStatusUpdater<S> {
    model: VersionedModel<S, NotificationStatus>,
    channel: NotificationChannel,
    message_id: MessageId,
    notification_id: NotificationId,
}

impl<S: DocumentStore> NotificationStatusUpdater<S> {
    pub fn new(
        model: VersionedModel<S, NotificationStatus>,
        channel: NotificationChannel,
        message_id: MessageId,
        notification_id: NotificationId,
    ) -> Self {
        Self {
            model,
            channel,
            message_id,
            notification_id,
        }
    }

    pub async fn update(
        &self,
        status: NotificationChannelStatusValue,
    ) -> Result<Versioned<NotificationStatus>, RuntimeError> {
        let entity = NotificationStatus {
            channel: self.channel,
            message_id: self.message_id.clone(),
            notification_id: self.notification_id.clone(),
            status,
            status_id: make_status_id(&self.notification_id, self.channel),
            updated_at: Utc::now(),
        };
        self.model.upsert(entity).await.map_err(|err| {
            RuntimeError::transient(format!(
                "set status {status} for notification {}/{}: {}",
                self.notification_id,
                self.channel,
                store_error_message(&err)
            ))
        })
    }
}
