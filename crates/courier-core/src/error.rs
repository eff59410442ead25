/// Classification of a failed unit of work.
///
/// `Transient` asks the caller to retry later. `Permanent` means retrying
/// would fail the same way, so processing stops and the failure is recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("transient error: {0}")]
    Transient(String),
    #[error("permanent error: {0}")]
    Permanent(String),
}

impl RuntimeError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "TRANSIENT",
            Self::Permanent(_) => "PERMANENT",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Permanent(m) => m,
        }
    }
}

/// Predicate every handler branches on.
pub fn is_transient(err: &RuntimeError) -> bool {
    err.is_transient()
}

/// Unclassified failures are retried rather than dropped.
impl From<anyhow::Error> for RuntimeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Transient(format!("{err:#}"))
    }
}
