use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use vacancy_core::testutil::{MockApprovalStore, MockGateway, MockQueue, MockResolver, test_vacancy};
use vacancy_core::{ApprovalGate, ApprovalService, RequestTokenizer, SubmissionService};
use vacancy_server::routes;
use vacancy_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";
pub const TEST_TOKEN_SECRET: &str = "test-token-secret";
pub const TRUSTED_SUBMITTER: &str = "editor@acme.example";

pub struct TestApp {
    pub router: Router,
    pub approvals: MockApprovalStore,
    pub gateway: MockGateway,
    pub queue: MockQueue,
}

/// Router over in-memory collaborators; no database or network.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with_gateway(MockGateway::new())
}

pub fn setup_test_app_with_gateway(gateway: MockGateway) -> TestApp {
    let approvals = MockApprovalStore::new();
    let queue = MockQueue::new();
    let resolver = MockResolver::new(test_vacancy("https://acme.example/jobs/1"));

    let intake = SubmissionService::new(
        resolver,
        approvals.clone(),
        gateway.clone(),
        queue.clone(),
        RequestTokenizer::new(TEST_TOKEN_SECRET).unwrap(),
        ApprovalGate::from_list(TRUSTED_SUBMITTER),
    );
    let review = ApprovalService::new(
        approvals.clone(),
        gateway.clone(),
        queue.clone(),
        RequestTokenizer::new(TEST_TOKEN_SECRET).unwrap(),
    );

    let state = Arc::new(AppState {
        intake: Arc::new(intake),
        review: Arc::new(review),
        api_key: TEST_API_KEY.to_string(),
        db: None,
    });

    TestApp {
        router: routes::router(state),
        approvals,
        gateway,
        queue,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn submit(&self, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post("/vacancies")
                .header("x-api-key", TEST_API_KEY)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub fn manual_body(submission_email: &str) -> serde_json::Value {
    serde_json::json!({
        "submission_type": "manual",
        "submission_email": submission_email,
        "vacancy": {
            "job_title": "Backend Engineer",
            "company_name": "Acme",
            "company_location": "Berlin, Germany",
            "apply_url": "https://acme.example/jobs/1"
        }
    })
}
