/// Failure reported by a mail transport.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The request never got an answer (connect, timeout, TLS).
    #[error("mail transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
    /// The provider answered and refused the mail.
    #[error("mail rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Failure reported by a webhook sender.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
    #[error("webhook rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Failure reported by the public message API.
#[derive(Debug, thiserror::Error)]
pub enum MessageApiError {
    #[error("message api transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
    #[error("message api rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl MailError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Rejected { .. } => "REJECTED",
        }
    }
}

impl WebhookError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Rejected { .. } => "REJECTED",
        }
    }
}
