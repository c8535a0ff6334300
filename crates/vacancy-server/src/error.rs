use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vacancy_core::error::AppError;

use crate::dto::ErrorResponse;

pub const ERR_INVALID_API_KEY: &str = "ERR_INVALID_API_KEY";

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        if err.is_bad_request() {
            return ErrorResponse::new(err.err_code(), err.to_string())
                .with_status(StatusCode::BAD_REQUEST);
        }

        tracing::error!(error = %err, "Request failed");
        ErrorResponse::new(err.err_code(), "internal error")
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl ErrorResponse {
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, axum::Json(self)).into_response()
    }
}
