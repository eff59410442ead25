#![allow(async_fn_in_trait)]

pub mod email;
pub mod render;
pub mod retry;
pub mod status;
pub mod webhook;
pub mod welcome;

use courier_core::error::RuntimeError;
use courier_domain::channel::NotificationChannel;

use crate::domain::types::{Notification, NotificationEvent};

/// Delivers one notification event over a single channel.
pub trait ChannelDelivery: Send + Sync {
    const CHANNEL: NotificationChannel;

    /// Sends the event to the channel target stored on `notification`.
    /// A notification without a target for this channel is a permanent error.
    async fn deliver(
        &self,
        event: &NotificationEvent,
        notification: &Notification,
    ) -> Result<(), RuntimeError>;
}
