pub mod documents;
pub mod queue_messages;
