use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vacancy_core::error::AppError;
use vacancy_core::models::{Vacancy, VacancyRecord};
use vacancy_core::traits::VacancyStore;

/// PostgreSQL-backed vacancy storage.
#[derive(Clone)]
pub struct VacancyRepository {
    pool: PgPool,
}

impl VacancyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct VacancyRow {
    id: Uuid,
    job_title: String,
    company_name: String,
    company_location: String,
    short_description: String,
    relevant_tags: Vec<String>,
    apply_url: String,
    created_at: DateTime<Utc>,
}

impl From<VacancyRow> for VacancyRecord {
    fn from(row: VacancyRow) -> Self {
        VacancyRecord {
            id: row.id,
            vacancy: Vacancy {
                job_title: row.job_title,
                company_name: row.company_name,
                company_location: row.company_location,
                short_description: row.short_description,
                relevant_tags: row.relevant_tags,
                apply_url: row.apply_url,
            },
            created_at: row.created_at,
        }
    }
}

impl VacancyStore for VacancyRepository {
    async fn save(&self, vacancy: &Vacancy) -> Result<VacancyRecord, AppError> {
        let row = sqlx::query_as::<_, VacancyRow>(
            r#"
            INSERT INTO vacancies
                (job_title, company_name, company_location,
                 short_description, relevant_tags, apply_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&vacancy.job_title)
        .bind(&vacancy.company_name)
        .bind(&vacancy.company_location)
        .bind(&vacancy.short_description)
        .bind(&vacancy.relevant_tags)
        .bind(&vacancy.apply_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(id = %row.id, url = %row.apply_url, "Vacancy stored");
        Ok(row.into())
    }

    async fn lookup_company_location(
        &self,
        company_name: &str,
    ) -> Result<Option<String>, AppError> {
        let location: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT company_location FROM vacancies
            WHERE LOWER(company_name) = LOWER($1)
              AND company_location <> ''
              AND company_location NOT ILIKE '%remote%'
              AND company_location NOT ILIKE '%global%'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(company_name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(location.map(|(l,)| l))
    }

    async fn all_apply_urls(&self) -> Result<HashSet<String>, AppError> {
        let urls: Vec<(String,)> = sqlx::query_as(r#"SELECT DISTINCT apply_url FROM vacancies"#)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(urls.into_iter().map(|(u,)| u).collect())
    }
}
