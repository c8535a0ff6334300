use sqlx::{PgPool, Postgres, Transaction};
use vacancy_core::error::AppError;
use vacancy_core::models::{ApprovalState, MessageId, SubmitRequest};
use vacancy_core::traits::ApprovalStore;

/// PostgreSQL-backed approval records.
///
/// The full request is kept as JSONB next to its apply URL, which is
/// indexed for the crawler's already-requested check.
#[derive(Clone)]
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    message_id: &MessageId,
    request: &SubmitRequest,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO approvals (message_id, request, apply_url)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(message_id.as_str())
    .bind(serde_json::to_value(request)?)
    .bind(request.apply_url())
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    Ok(())
}

impl ApprovalStore for ApprovalRepository {
    async fn save(&self, message_id: &MessageId, request: &SubmitRequest) -> Result<(), AppError> {
        self.save_batch(&[(message_id.clone(), request.clone())]).await
    }

    async fn save_batch(&self, items: &[(MessageId, SubmitRequest)]) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for (message_id, request) in items {
            insert(&mut tx, message_id, request).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn get_state(&self, message_id: &MessageId) -> Result<Option<ApprovalState>, AppError> {
        let row: Option<(String,)> =
            sqlx::query_as(r#"SELECT state FROM approvals WHERE message_id = $1"#)
                .bind(message_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(|(state,)| state.parse().map_err(AppError::DatabaseError))
            .transpose()
    }

    async fn transition(
        &self,
        message_id: &MessageId,
        state: ApprovalState,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE approvals
            SET state = $2, decided_at = NOW()
            WHERE message_id = $1 AND state = 'pending'
            "#,
        )
        .bind(message_id.as_str())
        .bind(state.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_already_requested(&self, apply_url: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"SELECT EXISTS (SELECT 1 FROM approvals WHERE apply_url = $1 AND state = 'pending')"#,
        )
        .bind(apply_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(exists)
    }
}
