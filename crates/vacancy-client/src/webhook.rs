use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use url::Url;
use vacancy_core::error::AppError;
use vacancy_core::models::{
    ApprovalRequest, ApprovalState, MessageId, Notification, SubmitRequest, Vacancy,
};
use vacancy_core::traits::{ApprovalGateway, Notifier};

use crate::fetcher::transport_error;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

fn webhook_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

async fn post_json<T: Serialize>(client: &Client, url: &str, body: &T) -> Result<(), AppError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(e, WEBHOOK_TIMEOUT.as_secs()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::HttpError(format!(
            "Webhook returned HTTP {}: {}",
            status.as_u16(),
            text
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Approval gateway
// ---------------------------------------------------------------------------

/// Posts review requests to a webhook. Each item carries signed approve
/// and reject links pointing back at this deployment's server.
#[derive(Clone)]
pub struct WebhookApprovalGateway {
    client: Client,
    webhook_url: String,
    server_domain: String,
}

impl WebhookApprovalGateway {
    pub fn new(webhook_url: &str, server_domain: &str) -> Result<Self, AppError> {
        Url::parse(server_domain)
            .map_err(|e| AppError::ConfigError(format!("Invalid server domain: {e}")))?;
        Ok(Self {
            client: webhook_client()?,
            webhook_url: webhook_url.to_string(),
            server_domain: server_domain.trim_end_matches('/').to_string(),
        })
    }

    fn decision_link(&self, action: &str, request: &ApprovalRequest) -> Result<String, AppError> {
        decision_link(&self.server_domain, action, request)
    }

    fn review_item<'a>(&self, request: &'a ApprovalRequest) -> Result<ReviewItem<'a>, AppError> {
        Ok(ReviewItem {
            message_id: request.message_id.as_str(),
            submission_email: &request.submission_email,
            vacancy: &request.preview,
            approve_url: self.decision_link("approve", request)?,
            reject_url: self.decision_link("reject", request)?,
        })
    }
}

fn decision_link(
    domain: &str,
    action: &str,
    request: &ApprovalRequest,
) -> Result<String, AppError> {
    let url = Url::parse_with_params(
        &format!("{domain}/vacancies/{action}"),
        &[
            ("data", request.token.as_str()),
            ("message_id", request.message_id.as_str()),
        ],
    )
    .map_err(|e| AppError::ConfigError(format!("Invalid decision link: {e}")))?;
    Ok(url.into())
}

#[derive(Debug, Serialize)]
struct ReviewItem<'a> {
    message_id: &'a str,
    submission_email: &'a str,
    vacancy: &'a Vacancy,
    approve_url: String,
    reject_url: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum GatewayMessage<'a> {
    ApprovalRequest {
        #[serde(flatten)]
        item: ReviewItem<'a>,
    },
    BatchApprovalRequest {
        items: Vec<ReviewItem<'a>>,
    },
    Decision {
        message_id: &'a str,
        state: ApprovalState,
        submission_email: &'a str,
        request_kind: &'static str,
        apply_url: Option<&'a str>,
    },
}

impl ApprovalGateway for WebhookApprovalGateway {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<(), AppError> {
        let message = GatewayMessage::ApprovalRequest {
            item: self.review_item(request)?,
        };
        post_json(&self.client, &self.webhook_url, &message).await?;
        tracing::info!(message_id = %request.message_id, "Approval requested");
        Ok(())
    }

    async fn request_batch_approval(&self, requests: &[ApprovalRequest]) -> Result<(), AppError> {
        let items = requests
            .iter()
            .map(|r| self.review_item(r))
            .collect::<Result<Vec<_>, _>>()?;
        post_json(
            &self.client,
            &self.webhook_url,
            &GatewayMessage::BatchApprovalRequest { items },
        )
        .await?;
        tracing::info!(count = requests.len(), "Batch approval requested");
        Ok(())
    }

    async fn acknowledge_decision(
        &self,
        message_id: &MessageId,
        state: ApprovalState,
        request: &SubmitRequest,
    ) -> Result<(), AppError> {
        let message = GatewayMessage::Decision {
            message_id: message_id.as_str(),
            state,
            submission_email: &request.submission_email,
            request_kind: request.kind(),
            apply_url: request.apply_url(),
        };
        post_json(&self.client, &self.webhook_url, &message).await
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Posts each stored vacancy to a webhook, addressed to one recipient.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            client: webhook_client()?,
            webhook_url: webhook_url.to_string(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), AppError> {
        post_json(&self.client, &self.webhook_url, notification).await?;
        tracing::debug!(
            recipient = %notification.recipient_id,
            vacancy_id = %notification.record.id,
            "Notification delivered"
        );
        Ok(())
    }
}
