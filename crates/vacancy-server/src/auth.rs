use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::dto::ErrorResponse;
use crate::error::ERR_INVALID_API_KEY;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `X-Api-Key` does not match the configured key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    let authenticated = !state.api_key.is_empty()
        && bool::from(presented.ct_eq(state.api_key.as_bytes()));

    if !authenticated {
        return ErrorResponse::new(ERR_INVALID_API_KEY, "invalid api key")
            .with_status(StatusCode::UNAUTHORIZED);
    }

    next.run(request).await
}
