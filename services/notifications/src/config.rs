use std::time::Duration;

use courier_core::env::{optional_or, parsed_or, process_env, required};
use courier_core::versioned::DEFAULT_MAX_CONFLICT_RETRIES;

/// Notifications service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    /// PostgreSQL connection URL for documents and queues.
    pub database_url: String,
    /// Health endpoint port (default 3114). Env var: `NOTIFICATIONS_PORT`.
    pub port: u16,
    pub sendgrid_api_key: String,
    pub sendgrid_api_url: String,
    /// Sender address of every notification email.
    pub mail_from: String,
    /// Public API base used to create welcome messages.
    pub notification_api_url: String,
    pub notification_api_key: String,
    pub http_timeout: Duration,
    pub queue_poll_interval: Duration,
    pub queue_visibility_timeout: Duration,
    /// Deliveries after which a message is dead-lettered.
    pub queue_max_dequeue_count: u32,
    pub queue_retry_base: Duration,
    pub queue_retry_max: Duration,
    pub store_max_conflict_retries: u32,
}

impl NotificationsConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup<F>(lookup: &F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: required(lookup, "DATABASE_URL")?,
            port: parsed_or(lookup, "NOTIFICATIONS_PORT", 3114)?,
            sendgrid_api_key: required(lookup, "SENDGRID_API_KEY")?,
            sendgrid_api_url: optional_or(lookup, "SENDGRID_API_URL", "https://api.sendgrid.com"),
            mail_from: optional_or(lookup, "MAIL_FROM", "no-reply@italia.it"),
            notification_api_url: required(lookup, "NOTIFICATION_API_URL")?,
            notification_api_key: required(lookup, "NOTIFICATION_API_KEY")?,
            http_timeout: Duration::from_millis(parsed_or(lookup, "HTTP_TIMEOUT_MS", 10_000)?),
            queue_poll_interval: Duration::from_millis(parsed_or(
                lookup,
                "QUEUE_POLL_INTERVAL_MS",
                1_000,
            )?),
            queue_visibility_timeout: Duration::from_secs(parsed_or(
                lookup,
                "QUEUE_VISIBILITY_TIMEOUT_SECS",
                30,
            )?),
            queue_max_dequeue_count: parsed_or(lookup, "QUEUE_MAX_DEQUEUE_COUNT", 5)?,
            queue_retry_base: Duration::from_secs(parsed_or(lookup, "QUEUE_RETRY_BASE_SECS", 10)?),
            queue_retry_max: Duration::from_secs(parsed_or(lookup, "QUEUE_RETRY_MAX_SECS", 3_600)?),
            store_max_conflict_retries: parsed_or(
                lookup,
                "STORE_MAX_CONFLICT_RETRIES",
                DEFAULT_MAX_CONFLICT_RETRIES,
            )?,
        })
    }
}
