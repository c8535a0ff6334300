use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;
use vacancy_core::error::AppError;
use vacancy_core::models::SubmitRequest;
use vacancy_core::traits::Submitter;

use crate::fetcher::transport_error;

/// Forwards intake requests to a running server's `POST /vacancies`.
#[derive(Clone)]
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpSubmitter {
    pub fn new(server_url: &str, api_key: &str) -> Result<Self, AppError> {
        Self::with_timeout(server_url, api_key, Duration::from_secs(300))
    }

    /// Bulk intake resolves and notifies before answering, so the default
    /// timeout is generous.
    pub fn with_timeout(
        server_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let endpoint = submission_endpoint(server_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

fn submission_endpoint(server_url: &str) -> Result<String, AppError> {
    let base = Url::parse(server_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid server URL: {e}")))?;
    let endpoint = format!("{}/vacancies", base.as_str().trim_end_matches('/'));
    Ok(endpoint)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    err: String,
    #[serde(default)]
    message: String,
}

fn response_error(status: StatusCode, body: &str) -> AppError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    match (status, parsed) {
        (StatusCode::BAD_REQUEST, Some(e)) => AppError::BadRequest(e.message),
        (StatusCode::BAD_REQUEST, None) => AppError::BadRequest(body.to_string()),
        (StatusCode::UNAUTHORIZED, _) => {
            AppError::ConfigError("server rejected the API key".into())
        }
        (status, Some(e)) => AppError::HttpError(format!(
            "HTTP {} ({}): {}",
            status.as_u16(),
            e.err,
            e.message
        )),
        (status, None) => AppError::HttpError(format!("HTTP {}: {}", status.as_u16(), body)),
    }
}

impl Submitter for HttpSubmitter {
    async fn submit(&self, request: SubmitRequest) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(kind = request.kind(), "Submitted to server");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(response_error(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_appended_to_base() {
        assert_eq!(
            submission_endpoint("http://localhost:3000").unwrap(),
            "http://localhost:3000/vacancies"
        );
        assert_eq!(
            submission_endpoint("https://intake.example/api/").unwrap(),
            "https://intake.example/api/vacancies"
        );
        assert!(matches!(
            submission_endpoint("localhost"),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn bad_request_carries_server_message() {
        let err = response_error(
            StatusCode::BAD_REQUEST,
            r#"{"ok":false,"err":"ERR_BAD_REQUEST","message":"missing apply_url"}"#,
        );
        assert!(matches!(err, AppError::BadRequest(m) if m == "missing apply_url"));
    }

    #[test]
    fn unauthorized_is_a_configuration_problem() {
        let err = response_error(
            StatusCode::UNAUTHORIZED,
            r#"{"ok":false,"err":"ERR_INVALID_API_KEY","message":"invalid api key"}"#,
        );
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn server_errors_are_http_errors() {
        let err = response_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"ok":false,"err":"ERR_INTERNAL_ERROR","message":"boom"}"#,
        );
        assert!(err.to_string().contains("ERR_INTERNAL_ERROR"));

        let err = response_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, AppError::HttpError(m) if m.contains("502")));
    }
}
