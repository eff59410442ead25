//! Builders for domain values used across test suites.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use courier_domain::id::{FiscalCode, MessageId, NotificationId, ServiceId};
use courier_domain::message::{
    MessageBodyMarkdown, MessageContent, NewMessageWithContent, TimeToLiveSeconds,
};
use courier_domain::profile::Profile;
use courier_domain::sender::SenderMetadata;

pub const A_FISCAL_CODE: &str = "FRLFRC74E04B157I";
pub const A_MESSAGE_ID: &str = "A_MESSAGE_ID";
pub const A_NOTIFICATION_ID: &str = "A_NOTIFICATION_ID";
pub const A_SERVICE_ID: &str = "s123";

pub fn a_fiscal_code() -> FiscalCode {
    FiscalCode::try_from(A_FISCAL_CODE.to_owned()).expect("valid fiscal code")
}

pub fn a_message_id() -> MessageId {
    MessageId::try_from(A_MESSAGE_ID.to_owned()).expect("non-empty id")
}

pub fn a_notification_id() -> NotificationId {
    NotificationId::try_from(A_NOTIFICATION_ID.to_owned()).expect("non-empty id")
}

pub fn a_service_id() -> ServiceId {
    ServiceId::try_from(A_SERVICE_ID.to_owned()).expect("non-empty id")
}

/// Markdown comfortably inside the accepted body length.
pub fn a_markdown() -> String {
    "test".repeat(80)
}

pub fn a_sender_metadata() -> SenderMetadata {
    SenderMetadata {
        organization_name: "An organization".to_owned(),
        department_name: "A department".to_owned(),
        service_name: "A service".to_owned(),
    }
}

/// Creation time far enough in the past that any TTL has elapsed.
pub fn long_ago() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2012, 12, 12, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn a_message(created_at: DateTime<Utc>) -> NewMessageWithContent {
    NewMessageWithContent {
        id: a_message_id(),
        fiscal_code: a_fiscal_code(),
        created_at,
        sender_service_id: a_service_id(),
        sender_user_id: None,
        content: MessageContent {
            subject: Some("A message subject".to_owned()),
            markdown: MessageBodyMarkdown::try_from(a_markdown()).expect("valid markdown"),
        },
        time_to_live_seconds: TimeToLiveSeconds::default(),
    }
}

/// Queue payload for a notification delivery, as JSON.
pub fn a_notification_event_json(message: &NewMessageWithContent) -> Value {
    json!({
        "message": message,
        "notificationId": A_NOTIFICATION_ID,
        "senderMetadata": a_sender_metadata(),
    })
}

pub fn a_profile(email: Option<&str>, inbox_enabled: bool) -> Profile {
    Profile {
        email: email.map(str::to_owned),
        is_inbox_enabled: Some(inbox_enabled),
        is_webhook_enabled: false,
        preferred_languages: vec!["it_IT".to_owned()],
    }
}
