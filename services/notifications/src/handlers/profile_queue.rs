use tracing::error;

use crate::domain::repository::{MessageApiPort, QueueControl};
use crate::domain::types::{ProcessingOutcome, ProfileEvent, QueueMessage};
use crate::handlers::QueueHandler;
use crate::usecase::retry::{NoStatus, RetryDriver};
use crate::usecase::welcome::SendWelcomeMessageUseCase;

/// Reacts to profile creation and updates.
pub struct ProfileQueueHandler<A: MessageApiPort, Q> {
    pub welcome: SendWelcomeMessageUseCase<A>,
    pub driver: RetryDriver<Q>,
}

impl<A: MessageApiPort, Q: QueueControl> QueueHandler for ProfileQueueHandler<A, Q> {
    async fn handle(&self, message: &QueueMessage) -> ProcessingOutcome {
        let event: ProfileEvent = match serde_json::from_value(message.payload.clone()) {
            Ok(event) => event,
            Err(err) => {
                error!(
                    queue = %message.queue_name,
                    message_id = %message.id,
                    error = %err,
                    "malformed profile event, dropping"
                );
                return ProcessingOutcome::Completed;
            }
        };

        match self.welcome.execute(&event).await {
            Ok(_) => ProcessingOutcome::Completed,
            Err(err) => self.driver.handle_failure(message, err, &NoStatus).await,
        }
    }
}
