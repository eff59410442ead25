#![allow(async_fn_in_trait)]

use std::time::Duration;

use url::Url;
use uuid::Uuid;

use courier_domain::id::FiscalCode;
use courier_domain::message::NewMessage;

use crate::domain::types::{OutgoingMail, QueueMessage, SentInfo, TelemetryEvent};
use crate::error::{MailError, MessageApiError, QueueError, WebhookError};

/// Sends rendered emails.
pub trait MailTransport: Send + Sync {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<SentInfo, MailError>;
}

/// Posts JSON to recipient-configured webhooks. Any 2xx is a success.
pub trait WebhookSender: Send + Sync {
    async fn post(&self, url: &Url, body: &serde_json::Value) -> Result<(), WebhookError>;
}

/// Fire-and-forget event tracking.
pub trait TelemetryClient: Send + Sync {
    fn track_event(&self, event: TelemetryEvent);
}

/// Creates messages through the public API.
pub trait MessageApiPort: Send + Sync {
    async fn create_message(
        &self,
        fiscal_code: &FiscalCode,
        message: &NewMessage,
    ) -> Result<(), MessageApiError>;
}

/// Retry control over a leased message.
pub trait QueueControl: Send + Sync {
    /// Hides the message for a backoff period so it is delivered again later.
    /// Returns `false` when the max dequeue count is reached and no further
    /// delivery will happen.
    async fn extend_visibility(&self, message: &QueueMessage) -> Result<bool, QueueError>;
}

/// Consumer side of a work queue.
pub trait QueueConsumer: Send + Sync {
    /// Leases the oldest visible message of `queue` for `visibility_timeout`.
    async fn receive(
        &self,
        queue: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueueMessage>, QueueError>;

    async fn complete(&self, message: &QueueMessage) -> Result<(), QueueError>;

    async fn dead_letter(&self, message: &QueueMessage, reason: &str) -> Result<(), QueueError>;
}

/// Producer side of a work queue.
pub trait QueueProducer: Send + Sync {
    async fn enqueue(&self, queue: &str, payload: &serde_json::Value) -> Result<Uuid, QueueError>;
}
