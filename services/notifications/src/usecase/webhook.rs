use tracing::debug;
use url::Url;

use courier_core::error::RuntimeError;
use courier_domain::channel::NotificationChannel;

use crate::domain::repository::{TelemetryClient, WebhookSender};
use crate::domain::types::{Notification, NotificationEvent, TelemetryEvent, WebhookNotification};
use crate::error::WebhookError;
use crate::usecase::ChannelDelivery;

pub const WEBHOOK_DELIVERY_EVENT: &str = "notification.webhook.delivery";

/// Accepts absolute `http` and `https` URLs only.
pub fn parse_webhook_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid webhook url {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        scheme => Err(format!("unsupported webhook url {raw:?} (scheme {scheme})")),
    }
}

// ── WebhookDelivery ──────────────────────────────────────────────────────────

pub struct WebhookDelivery<W: WebhookSender, T: TelemetryClient> {
    pub sender: W,
    pub telemetry: T,
}

impl<W: WebhookSender, T: TelemetryClient> ChannelDelivery for WebhookDelivery<W, T> {
    const CHANNEL: NotificationChannel = NotificationChannel::Webhook;

    async fn deliver(
        &self,
        event: &NotificationEvent,
        notification: &Notification,
    ) -> Result<(), RuntimeError> {
        let Some(webhook) = notification.channels.webhook.as_ref() else {
            return Err(RuntimeError::permanent(format!(
                "notification {} has no webhook channel",
                event.notification_id
            )));
        };
        let url = parse_webhook_url(&webhook.url).map_err(RuntimeError::permanent)?;

        let body = serde_json::to_value(WebhookNotification {
            message: &event.message,
            notification_id: &event.notification_id,
            sender_metadata: &event.sender_metadata,
        })
        .map_err(|e| RuntimeError::permanent(format!("encode webhook body: {e}")))?;

        let result = self.sender.post(&url, &body).await;

        self.telemetry.track_event(
            TelemetryEvent::new(WEBHOOK_DELIVERY_EVENT)
                .with("messageId", event.message.id.as_str())
                .with("notificationId", event.notification_id.as_str())
                .with("success", result.is_ok().to_string())
                .with("url", url.as_str()),
        );

        match result {
            Ok(()) => {
                debug!(
                    notification_id = %event.notification_id,
                    url = %url,
                    "webhook delivered"
                );
                Ok(())
            }
            Err(err @ WebhookError::Transport(_)) => Err(RuntimeError::transient(format!(
                "post webhook for notification {}: {err}",
                event.notification_id
            ))),
            Err(err @ WebhookError::Rejected { .. }) => Err(RuntimeError::permanent(format!(
                "post webhook for notification {}: {err}",
                event.notification_id
            ))),
        }
    }
}
