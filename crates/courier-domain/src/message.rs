//! Messages sent by services to citizens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{FiscalCode, MessageId, ServiceId};

pub const SUBJECT_MIN_LEN: usize = 10;
pub const SUBJECT_MAX_LEN: usize = 120;
pub const MARKDOWN_MIN_LEN: usize = 80;
pub const MARKDOWN_MAX_LEN: usize = 10_000;

fn check_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), DomainError> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(DomainError::LengthOutOfBounds {
            field,
            len,
            min,
            max,
        })
    }
}

/// Subject line of a message, 10 to 120 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageSubject(String);

impl MessageSubject {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageSubject {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_len("subject", &value, SUBJECT_MIN_LEN, SUBJECT_MAX_LEN)?;
        Ok(Self(value))
    }
}

impl From<MessageSubject> for String {
    fn from(subject: MessageSubject) -> Self {
        subject.0
    }
}

/// Markdown body of a message, 80 to 10000 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageBodyMarkdown(String);

impl MessageBodyMarkdown {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageBodyMarkdown {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_len("markdown", &value, MARKDOWN_MIN_LEN, MARKDOWN_MAX_LEN)?;
        Ok(Self(value))
    }
}

impl From<MessageBodyMarkdown> for String {
    fn from(body: MessageBodyMarkdown) -> Self {
        body.0
    }
}

/// Seconds after creation during which delivery is still attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeToLiveSeconds(u32);

impl TimeToLiveSeconds {
    pub const MIN: u32 = 3_600;
    pub const MAX: u32 = 31_536_000;
    pub const DEFAULT: u32 = 864_000;

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for TimeToLiveSeconds {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u32> for TimeToLiveSeconds {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::TimeToLiveOutOfBounds(value))
        }
    }
}

impl From<TimeToLiveSeconds> for u32 {
    fn from(ttl: TimeToLiveSeconds) -> Self {
        ttl.0
    }
}

/// Content of a message.
///
/// The subject stays a raw string: whether it is usable is decided at
/// delivery time, falling back to a default subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub markdown: MessageBodyMarkdown,
}

impl MessageContent {
    /// The subject, if present and within bounds.
    pub fn valid_subject(&self) -> Option<MessageSubject> {
        self.subject
            .clone()
            .and_then(|s| MessageSubject::try_from(s).ok())
    }
}

/// A message as created by a sender service, including its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageWithContent {
    pub id: MessageId,
    pub fiscal_code: FiscalCode,
    pub created_at: DateTime<Utc>,
    pub sender_service_id: ServiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_user_id: Option<String>,
    pub content: MessageContent,
    #[serde(default)]
    pub time_to_live_seconds: TimeToLiveSeconds,
}

impl NewMessageWithContent {
    /// `None` when the expiry falls past the largest representable date.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .checked_add_signed(Duration::seconds(i64::from(self.time_to_live_seconds.get())))
    }

    /// Whether the time to live has elapsed at `now`. A message whose expiry
    /// is not representable never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now > expires_at)
    }
}

/// Request body for creating a message through the public API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub content: NewMessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live_seconds: Option<TimeToLiveSeconds>,
}

/// Content of a [`NewMessage`]; unlike [`MessageContent`] the subject is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<MessageSubject>,
    pub markdown: MessageBodyMarkdown,
}
