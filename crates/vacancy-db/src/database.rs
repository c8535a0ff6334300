use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use vacancy_core::AppError;

use crate::approval_repository::ApprovalRepository;
use crate::config::DatabaseConfig;
use crate::queue::PgMessageQueue;
use crate::vacancy_repository::VacancyRepository;

/// Owns the connection pool, runs migrations and vends the stores.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    pub fn vacancy_repo(&self) -> VacancyRepository {
        VacancyRepository::new(self.pool.clone())
    }

    pub fn approval_repo(&self) -> ApprovalRepository {
        ApprovalRepository::new(self.pool.clone())
    }

    /// A handle on the named queue. Queues share one table.
    pub fn queue(&self, name: &str) -> PgMessageQueue {
        PgMessageQueue::new(self.pool.clone(), name)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
