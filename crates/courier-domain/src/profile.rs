//! Citizen profile types.

use serde::{Deserialize, Serialize};

/// Delivery preferences of a citizen.
///
/// Profile events are published with snake_case flags; the camelCase names
/// are accepted as well. The inbox flag stays absent when the event omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "is_inbox_enabled",
        alias = "isInboxEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_inbox_enabled: Option<bool>,
    #[serde(rename = "is_webhook_enabled", alias = "isWebhookEnabled", default)]
    pub is_webhook_enabled: bool,
    #[serde(rename = "preferred_languages", alias = "preferredLanguages", default)]
    pub preferred_languages: Vec<String>,
}

impl Profile {
    pub fn inbox_enabled(&self) -> bool {
        self.is_inbox_enabled == Some(true)
    }

    /// Disabled explicitly, as opposed to not stated.
    pub fn inbox_disabled(&self) -> bool {
        self.is_inbox_enabled == Some(false)
    }
}
