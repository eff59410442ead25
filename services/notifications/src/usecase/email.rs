use tracing::debug;

use courier_core::error::RuntimeError;
use courier_domain::channel::NotificationChannel;

use crate::domain::repository::{MailTransport, TelemetryClient};
use crate::domain::types::{Notification, NotificationEvent, OutgoingMail, TelemetryEvent};
use crate::error::MailError;
use crate::usecase::ChannelDelivery;
use crate::usecase::render::EmailRenderer;

/// Used when the message has no subject or its subject is out of bounds.
pub const DEFAULT_SUBJECT: &str = "A new notification for you.";

pub const EMAIL_DELIVERY_EVENT: &str = "notification.email.delivery";
pub const MESSAGE_ID_HEADER: &str = "X-Messages-MessageId";
pub const NOTIFICATION_ID_HEADER: &str = "X-Messages-NotificationId";

// ── EmailDelivery ────────────────────────────────────────────────────────────

pub struct EmailDelivery<M: MailTransport, T: TelemetryClient> {
    pub mailer: M,
    pub telemetry: T,
    pub renderer: EmailRenderer,
    pub mail_from: String,
}

impl<M: MailTransport, T: TelemetryClient> ChannelDelivery for EmailDelivery<M, T> {
    const CHANNEL: NotificationChannel = NotificationChannel::Email;

    async fn deliver(
        &self,
        event: &NotificationEvent,
        notification: &Notification,
    ) -> Result<(), RuntimeError> {
        let message = &event.message;
        let Some(email) = notification.channels.email.as_ref() else {
            return Err(RuntimeError::permanent(format!(
                "notification {} has no email channel",
                event.notification_id
            )));
        };

        let subject = message
            .content
            .valid_subject()
            .map(String::from)
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_owned());
        let rendered =
            self.renderer
                .render(&subject, &message.content.markdown, &event.sender_metadata)?;

        let mail = OutgoingMail {
            from: self.mail_from.clone(),
            to: email.to_address.clone(),
            subject,
            html: rendered.html,
            text: rendered.text,
            headers: vec![
                (MESSAGE_ID_HEADER.to_owned(), message.id.to_string()),
                (
                    NOTIFICATION_ID_HEADER.to_owned(),
                    event.notification_id.to_string(),
                ),
            ],
            message_id: message.id.to_string(),
        };

        let result = self.mailer.send_mail(&mail).await;

        self.telemetry.track_event(
            TelemetryEvent::new(EMAIL_DELIVERY_EVENT)
                .with("addressSource", email.address_source.as_str())
                .with("messageId", message.id.as_str())
                .with("notificationId", event.notification_id.as_str())
                .with("transport", "sendgrid")
                .with("success", result.is_ok().to_string()),
        );

        match result {
            Ok(sent) => {
                debug!(
                    notification_id = %event.notification_id,
                    message_id = %message.id,
                    provider_message_id = ?sent.provider_message_id,
                    "email sent"
                );
                Ok(())
            }
            Err(err @ MailError::Transport(_)) => Err(RuntimeError::transient(format!(
                "send email for notification {}: {err}",
                event.notification_id
            ))),
            Err(err @ MailError::Rejected { .. }) => Err(RuntimeError::permanent(format!(
                "send email for notification {}: {err}",
                event.notification_id
            ))),
        }
    }
}
