use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use vacancy_core::{AppError, Decision, MessageId};

use crate::auth::require_api_key;
use crate::dto::{
    DecisionQuery, DecisionResponse, HealthResponse, SubmitVacancyRequest, SubmitVacancyResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/vacancies", post(submit_vacancy))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/vacancies/approve", get(approve_vacancy))
        .route("/vacancies/reject", get(reject_vacancy))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(protected).with_state(state)
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/vacancies",
    request_body = SubmitVacancyRequest,
    responses(
        (status = 200, description = "Submission accepted", body = SubmitVacancyResponse),
        (status = 400, description = "Bad request", body = crate::dto::ErrorResponse),
        (status = 401, description = "Invalid API key", body = crate::dto::ErrorResponse),
        (status = 500, description = "Internal error", body = crate::dto::ErrorResponse),
    ),
    security(("api_key" = [])),
    tag = "vacancies"
)]
pub async fn submit_vacancy(
    State(state): State<Arc<AppState>>,
    body: Result<axum::Json<SubmitVacancyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let axum::Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state.intake.submit(body.into()).await?;
    Ok(axum::Json(SubmitVacancyResponse::from(outcome)))
}

// ---------------------------------------------------------------------------
// Approval callbacks
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/vacancies/approve",
    params(DecisionQuery),
    responses(
        (status = 200, description = "Vacancy approved", body = DecisionResponse),
        (
            status = 400,
            description = "Invalid token or already processed",
            body = crate::dto::ErrorResponse
        ),
        (status = 500, description = "Internal error", body = crate::dto::ErrorResponse),
    ),
    tag = "approvals"
)]
pub async fn approve_vacancy(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DecisionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    decide(&state, query, Decision::Approve).await
}

#[utoipa::path(
    get,
    path = "/vacancies/reject",
    params(DecisionQuery),
    responses(
        (status = 200, description = "Vacancy rejected", body = DecisionResponse),
        (
            status = 400,
            description = "Invalid token or already processed",
            body = crate::dto::ErrorResponse
        ),
        (status = 500, description = "Internal error", body = crate::dto::ErrorResponse),
    ),
    tag = "approvals"
)]
pub async fn reject_vacancy(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DecisionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    decide(&state, query, Decision::Reject).await
}

async fn decide(
    state: &AppState,
    query: Result<Query<DecisionQuery>, QueryRejection>,
    decision: Decision,
) -> Result<axum::Json<DecisionResponse>, ApiError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let message_id = query
        .message_id
        .filter(|id| !id.trim().is_empty())
        .map(MessageId::from);

    state
        .review
        .decide(&query.data, message_id.as_ref(), decision)
        .await?;

    let message = match decision {
        Decision::Approve => "vacancy approved",
        Decision::Reject => "vacancy rejected",
    };
    Ok(axum::Json(DecisionResponse {
        ok: true,
        message: message.into(),
    }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.db {
        None => "not_configured",
        Some(db) => match sqlx::query("SELECT 1").execute(db.pool()).await {
            Ok(_) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "Health check could not reach the database");
                "unreachable"
            }
        },
    };

    let status = if database == "unreachable" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        axum::Json(HealthResponse {
            status: if status.is_success() { "healthy" } else { "degraded" }.into(),
            database: database.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }),
    )
}
