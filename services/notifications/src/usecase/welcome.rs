use tracing::{debug, info};

use courier_core::error::RuntimeError;
use courier_domain::error::DomainError;
use courier_domain::message::{
    MessageBodyMarkdown, MessageSubject, NewMessage, NewMessageContent,
};
use courier_domain::profile::Profile;

use crate::domain::repository::MessageApiPort;
use crate::domain::types::ProfileEvent;
use crate::error::MessageApiError;

/// Builds the message sent to a citizen who just enabled their inbox.
pub fn welcome_message(profile: &Profile) -> Result<NewMessage, DomainError> {
    let email = profile.email.as_deref().unwrap_or_default();
    let subject = MessageSubject::try_from(format!("Welcome new user {email}"))?;
    let markdown = MessageBodyMarkdown::try_from(format!(
        "Hello new user {email}\n\n\
         We welcome you to the digital citizenship program.\n\n\
         This is a welcome message to check that delivery to your inbox works."
    ))?;
    Ok(NewMessage {
        content: NewMessageContent {
            subject: Some(subject),
            markdown,
        },
        time_to_live_seconds: None,
    })
}

// ── SendWelcomeMessage ───────────────────────────────────────────────────────

pub struct SendWelcomeMessageUseCase<A: MessageApiPort> {
    pub api: A,
}

impl<A: MessageApiPort> SendWelcomeMessageUseCase<A> {
    /// Returns whether a welcome message was sent.
    pub async fn execute(&self, event: &ProfileEvent) -> Result<bool, RuntimeError> {
        if !event.has_just_enabled_inbox() {
            debug!(fiscal_code = %event.fiscal_code(), "inbox not just enabled, nothing to send");
            return Ok(false);
        }

        let message = welcome_message(event.new_profile())
            .map_err(|e| RuntimeError::permanent(format!("invalid welcome message: {e}")))?;

        match self.api.create_message(event.fiscal_code(), &message).await {
            Ok(()) => {
                info!(fiscal_code = %event.fiscal_code(), "welcome message sent");
                Ok(true)
            }
            Err(err @ MessageApiError::Transport(_)) => Err(RuntimeError::transient(format!(
                "send welcome message: {err}"
            ))),
            Err(err @ MessageApiError::Rejected { .. }) => Err(RuntimeError::permanent(format!(
                "send welcome message: {err}"
            ))),
        }
    }
}
