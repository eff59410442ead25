use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use courier_core::versioned::VersionedEntity;
use courier_domain::channel::{NotificationChannel, NotificationChannelStatusValue};
use courier_domain::id::{FiscalCode, MessageId, NotificationId};
use courier_domain::message::NewMessageWithContent;
use courier_domain::profile::Profile;
use courier_domain::sender::SenderMetadata;

pub const EMAIL_NOTIFICATION_QUEUE: &str = "emailnotifications";
pub const WEBHOOK_NOTIFICATION_QUEUE: &str = "webhooknotifications";
pub const PROFILE_EVENTS_QUEUE: &str = "profileevents";

// ── Notification ─────────────────────────────────────────────────────────────

/// Where an email address for a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailAddressSource {
    ProfileAddress,
    DefaultAddress,
}

impl EmailAddressSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfileAddress => "PROFILE_ADDRESS",
            Self::DefaultAddress => "DEFAULT_ADDRESS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailChannel {
    pub to_address: String,
    pub address_source: EmailAddressSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookChannel {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannels {
    #[serde(rename = "EMAIL", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailChannel>,
    #[serde(rename = "WEBHOOK", default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookChannel>,
}

/// Decision to deliver a message to its recipient over some channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub fiscal_code: FiscalCode,
    pub message_id: MessageId,
    pub channels: NotificationChannels,
}

impl VersionedEntity for Notification {
    const COLLECTION: &'static str = "notifications";

    fn base_id(&self) -> String {
        self.id.to_string()
    }

    fn partition_key(&self) -> String {
        self.message_id.to_string()
    }
}

// ── NotificationStatus ───────────────────────────────────────────────────────

pub fn make_status_id(notification_id: &NotificationId, channel: NotificationChannel) -> String {
    format!("{notification_id}-{channel}")
}

/// Delivery state of one notification on one channel at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatus {
    pub channel: NotificationChannel,
    pub message_id: MessageId,
    pub notification_id: NotificationId,
    pub status: NotificationChannelStatusValue,
    pub status_id: String,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl VersionedEntity for NotificationStatus {
    const COLLECTION: &'static str = "notification-status";

    fn base_id(&self) -> String {
        self.status_id.clone()
    }

    fn partition_key(&self) -> String {
        self.notification_id.to_string()
    }
}

// ── Queue payloads ───────────────────────────────────────────────────────────

/// Unit of work on the notification queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub message: NewMessageWithContent,
    pub notification_id: NotificationId,
    pub sender_metadata: SenderMetadata,
}

/// JSON body posted to a webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNotification<'a> {
    pub message: &'a NewMessageWithContent,
    pub notification_id: &'a NotificationId,
    pub sender_metadata: &'a SenderMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProfileEvent {
    #[serde(rename = "ProfileCreatedEvent", rename_all = "camelCase")]
    Created {
        fiscal_code: FiscalCode,
        new_profile: Profile,
    },
    #[serde(rename = "ProfileUpdatedEvent", rename_all = "camelCase")]
    Updated {
        fiscal_code: FiscalCode,
        new_profile: Profile,
        old_profile: Profile,
    },
}

impl ProfileEvent {
    pub fn fiscal_code(&self) -> &FiscalCode {
        match self {
            Self::Created { fiscal_code, .. } | Self::Updated { fiscal_code, .. } => fiscal_code,
        }
    }

    pub fn new_profile(&self) -> &Profile {
        match self {
            Self::Created { new_profile, .. } | Self::Updated { new_profile, .. } => new_profile,
        }
    }

    /// Inbox enabled on creation, or switched from explicitly disabled to enabled.
    pub fn has_just_enabled_inbox(&self) -> bool {
        match self {
            Self::Created { new_profile, .. } => new_profile.inbox_enabled(),
            Self::Updated {
                new_profile,
                old_profile,
                ..
            } => new_profile.inbox_enabled() && old_profile.inbox_disabled(),
        }
    }
}

// ── Queue platform ───────────────────────────────────────────────────────────

/// A leased message. `dequeue_count` includes the current delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub id: Uuid,
    pub queue_name: String,
    pub payload: serde_json::Value,
    pub dequeue_count: u32,
    pub inserted_at: DateTime<Utc>,
    pub next_visible_at: DateTime<Utc>,
}

/// How the worker settles a message after its handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Done, successfully or not; remove from the queue.
    Completed,
    /// Visibility was extended; leave the message leased.
    RetryScheduled,
    /// Max dequeue count reached; move to the dead letters.
    RetriesExhausted,
}

// ── Outbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub headers: Vec<(String, String)>,
    pub message_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentInfo {
    /// Provider-assigned id, when the provider returns one.
    pub provider_message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl TelemetryEvent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
