use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use rand::RngExt;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, sea_query::Expr,
};
use uuid::Uuid;

use courier_notifications_schema::queue_messages;

use crate::domain::repository::{QueueConsumer, QueueControl, QueueProducer};
use crate::domain::types::QueueMessage;
use crate::error::QueueError;

/// Retry delay for a message delivered `dequeue_count` times:
/// `base * 2^(dequeue_count - 1)`, capped at `max`.
pub fn retry_delay(dequeue_count: u32, base: Duration, max: Duration) -> Duration {
    let exponent = dequeue_count.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

/// Adds up to 10% random jitter.
fn with_jitter(delay: Duration) -> Duration {
    let limit_ms = u64::try_from(delay.as_millis() / 10).unwrap_or(u64::MAX);
    if limit_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..limit_ms))
}

// ── Queue ────────────────────────────────────────────────────────────────────

/// Work queues stored in the `queue_messages` table.
#[derive(Clone)]
pub struct DbQueue {
    pub db: DatabaseConnection,
    pub max_dequeue_count: u32,
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl QueueProducer for DbQueue {
    async fn enqueue(&self, queue: &str, payload: &serde_json::Value) -> Result<Uuid, QueueError> {
        let now = Utc::now();
        let id = Uuid::now_v7();
        queue_messages::ActiveModel {
            id: Set(id),
            queue_name: Set(queue.to_owned()),
            payload: Set(payload.clone()),
            dequeue_count: Set(0),
            inserted_at: Set(now),
            next_visible_at: Set(now),
            completed_at: Set(None),
            dead_lettered_at: Set(None),
            last_error: Set(None),
        }
        .insert(&self.db)
        .await
        .context("enqueue message")?;
        Ok(id)
    }
}

impl QueueConsumer for DbQueue {
    async fn receive(
        &self,
        queue: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueueMessage>, QueueError> {
        let now = Utc::now();
        let Some(model) = queue_messages::Entity::find()
            .filter(queue_messages::Column::QueueName.eq(queue))
            .filter(queue_messages::Column::CompletedAt.is_null())
            .filter(queue_messages::Column::DeadLetteredAt.is_null())
            .filter(queue_messages::Column::NextVisibleAt.lte(now))
            .order_by_asc(queue_messages::Column::InsertedAt)
            .one(&self.db)
            .await
            .context("find visible message")?
        else {
            return Ok(None);
        };

        let lease_until = now
            + chrono::Duration::from_std(visibility_timeout).context("visibility timeout")?;
        let dequeue_count = model.dequeue_count + 1;

        // Guarded by the previous count: only one consumer wins the lease.
        let leased = queue_messages::Entity::update_many()
            .col_expr(queue_messages::Column::NextVisibleAt, Expr::value(lease_until))
            .col_expr(queue_messages::Column::DequeueCount, Expr::value(dequeue_count))
            .filter(queue_messages::Column::Id.eq(model.id))
            .filter(queue_messages::Column::DequeueCount.eq(model.dequeue_count))
            .exec(&self.db)
            .await
            .context("lease message")?;
        if leased.rows_affected == 0 {
            return Ok(None);
        }

        Ok(Some(QueueMessage {
            id: model.id,
            queue_name: model.queue_name,
            payload: model.payload,
            dequeue_count: u32::try_from(dequeue_count).unwrap_or(u32::MAX),
            inserted_at: model.inserted_at,
            next_visible_at: lease_until,
        }))
    }

    async fn complete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        queue_messages::Entity::update_many()
            .col_expr(queue_messages::Column::CompletedAt, Expr::value(Utc::now()))
            .filter(queue_messages::Column::Id.eq(message.id))
            .exec(&self.db)
            .await
            .context("complete message")?;
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage, reason: &str) -> Result<(), QueueError> {
        queue_messages::Entity::update_many()
            .col_expr(queue_messages::Column::DeadLetteredAt, Expr::value(Utc::now()))
            .col_expr(queue_messages::Column::LastError, Expr::value(reason))
            .filter(queue_messages::Column::Id.eq(message.id))
            .exec(&self.db)
            .await
            .context("dead-letter message")?;
        Ok(())
    }
}

impl QueueControl for DbQueue {
    async fn extend_visibility(&self, message: &QueueMessage) -> Result<bool, QueueError> {
        if message.dequeue_count >= self.max_dequeue_count {
            return Ok(false);
        }
        let delay = with_jitter(retry_delay(
            message.dequeue_count,
            self.retry_base,
            self.retry_max,
        ));
        let visible_at = Utc::now() + chrono::Duration::from_std(delay).context("retry delay")?;
        queue_messages::Entity::update_many()
            .col_expr(queue_messages::Column::NextVisibleAt, Expr::value(visible_at))
            .filter(queue_messages::Column::Id.eq(message.id))
            .exec(&self.db)
            .await
            .context("extend message visibility")?;
        Ok(true)
    }
}
