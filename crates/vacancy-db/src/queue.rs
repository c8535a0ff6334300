use std::time::Duration;

use sqlx::PgPool;
use vacancy_core::error::AppError;
use vacancy_core::traits::{Delivery, DeliveryAction, MessageQueue};

/// A named queue over the `queue_messages` table.
///
/// Consumers claim with `SELECT ... FOR UPDATE SKIP LOCKED`, so several
/// workers can poll the same queue without handing out a message twice.
/// Acknowledged messages are deleted; discarded ones stay for inspection.
///
/// A claim that is neither settled nor released within the visibility
/// timeout is handed out again, so messages held by a consumer that died
/// without releasing them are redelivered.
#[derive(Clone)]
pub struct PgMessageQueue {
    pool: PgPool,
    name: String,
    visibility_timeout: Duration,
}

impl PgMessageQueue {
    pub fn new(pool: PgPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    /// Must exceed the longest time a consumer may spend on one message.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }
}

/// Resolution may screenshot the posting and a search page and call the
/// LLM several times, each bounded by its own client timeout.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

impl MessageQueue for PgMessageQueue {
    async fn publish(&self, body: &[u8]) -> Result<(), AppError> {
        sqlx::query(r#"INSERT INTO queue_messages (queue_name, payload) VALUES ($1, $2)"#)
            .bind(&self.name)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::QueueError(e.to_string()))?;

        Ok(())
    }

    async fn receive(&self, consumer_id: &str) -> Result<Option<Delivery>, AppError> {
        let row: Option<(i64, Vec<u8>)> = sqlx::query_as(
            r#"
            UPDATE queue_messages
            SET status = 'claimed', consumer_id = $2, claimed_at = NOW()
            WHERE id = (
                SELECT id FROM queue_messages
                WHERE queue_name = $1
                  AND (
                    status = 'ready'
                    OR (status = 'claimed' AND claimed_at < NOW() - make_interval(secs => $3))
                  )
                ORDER BY id ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .bind(&self.name)
        .bind(consumer_id)
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::QueueError(e.to_string()))?;

        Ok(row.map(|(id, body)| Delivery { id, body }))
    }

    async fn settle(&self, delivery: &Delivery, action: DeliveryAction) -> Result<(), AppError> {
        let query = match action {
            DeliveryAction::Acknowledge => r#"DELETE FROM queue_messages WHERE id = $1"#,
            DeliveryAction::Discard => {
                r#"
                UPDATE queue_messages
                SET status = 'discarded', consumer_id = NULL
                WHERE id = $1
                "#
            }
        };
        sqlx::query(query)
            .bind(delivery.id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::QueueError(e.to_string()))?;

        Ok(())
    }

    async fn release(&self, consumer_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE queue_messages
            SET status = 'ready', consumer_id = NULL, claimed_at = NULL
            WHERE queue_name = $1 AND consumer_id = $2 AND status = 'claimed'
            "#,
        )
        .bind(&self.name)
        .bind(consumer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::QueueError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
