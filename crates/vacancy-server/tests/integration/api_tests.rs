use axum::body::Body;
use axum::http::{Request, StatusCode};
use vacancy_core::testutil::MockGateway;
use vacancy_core::{AppError, ApprovalState, MessageId};

use crate::integration::common::{
    TRUSTED_SUBMITTER, TestApp, json_body, manual_body, setup_test_app,
    setup_test_app_with_gateway,
};

fn decision_uri(action: &str, token: &str, message_id: &str) -> String {
    format!("/vacancies/{action}?data={token}&message_id={message_id}")
}

async fn held_submission(app: &TestApp) -> (String, String) {
    let response = app.submit(manual_body("stranger@example.com")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let request = app.gateway.single_requests().pop().unwrap();
    (request.token, request.message_id.to_string())
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let response = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "not_configured");
}

#[tokio::test]
async fn openapi_document_lists_routes() {
    let app = setup_test_app();

    let response = app
        .send(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/vacancies"].is_object());
    assert!(json["paths"]["/vacancies/approve"].is_object());
}

#[tokio::test]
async fn missing_api_key_returns_401() {
    let app = setup_test_app();

    let response = app
        .send(
            Request::post("/vacancies")
                .header("content-type", "application/json")
                .body(Body::from(manual_body(TRUSTED_SUBMITTER).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["err"], "ERR_INVALID_API_KEY");
    assert!(app.queue.published().is_empty());
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app();

    let response = app
        .send(
            Request::post("/vacancies")
                .header("x-api-key", "wrong-key")
                .header("content-type", "application/json")
                .body(Body::from(manual_body(TRUSTED_SUBMITTER).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unapproved_submitter_is_held_for_review() {
    let app = setup_test_app();

    let response = app.submit(manual_body("stranger@example.com")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["status"], "pending_approval");
    assert_eq!(json["message_ids"].as_array().unwrap().len(), 1);
    assert_eq!(app.gateway.single_requests().len(), 1);
    assert_eq!(app.approvals.len(), 1);
    assert!(app.queue.published().is_empty());
}

#[tokio::test]
async fn approved_submitter_url_is_enqueued() {
    let app = setup_test_app();

    let response = app
        .submit(serde_json::json!({
            "submission_type": "url",
            "submission_email": TRUSTED_SUBMITTER,
            "apply_url": "https://acme.example/jobs/1"
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "enqueued");
    assert!(json.get("message_ids").is_none());
    assert_eq!(app.queue.published().len(), 1);
    assert!(app.approvals.is_empty());
}

#[tokio::test]
async fn bulk_submission_returns_one_id_per_vacancy() {
    let app = setup_test_app();
    let vacancy = |n: u32| {
        serde_json::json!({
            "job_title": "Engineer",
            "company_name": "Acme",
            "apply_url": format!("https://acme.example/jobs/{n}")
        })
    };

    let response = app
        .submit(serde_json::json!({
            "submission_type": "bulk",
            "submission_email": "crawler",
            "vacancies": [vacancy(1), vacancy(2)],
            "retries": 0
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["message_ids"].as_array().unwrap().len(), 2);
    assert_eq!(app.gateway.batch_requests().len(), 1);
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = setup_test_app();

    let response = app
        .submit(serde_json::json!({
            "submission_type": "url",
            "submission_email": TRUSTED_SUBMITTER
        }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["err"], "ERR_BAD_REQUEST");
}

#[tokio::test]
async fn invalid_vacancy_returns_400() {
    let app = setup_test_app();
    let mut body = manual_body(TRUSTED_SUBMITTER);
    body["vacancy"]["job_title"] = "".into();

    let response = app.submit(body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["err"], "ERR_BAD_REQUEST");
    assert!(json["message"].as_str().unwrap().contains("job_title"));
}

#[tokio::test]
async fn gateway_failure_returns_500_without_details() {
    let app = setup_test_app_with_gateway(MockGateway::with_error(AppError::HttpError(
        "webhook secret leaked in message".into(),
    )));

    let response = app.submit(manual_body("stranger@example.com")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["err"], "ERR_INTERNAL_ERROR");
    assert_eq!(json["message"], "internal error");
    assert!(app.approvals.is_empty());
}

#[tokio::test]
async fn approve_link_enqueues_once() {
    let app = setup_test_app();
    let (token, message_id) = held_submission(&app).await;
    let uri = decision_uri("approve", &token, &message_id);

    let response = app
        .send(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "vacancy approved");
    assert_eq!(app.queue.published().len(), 1);
    assert_eq!(
        app.approvals.state(&MessageId::from(message_id.as_str())),
        Some(ApprovalState::Approved)
    );

    let response = app
        .send(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["message"], "approval already processed");
    assert_eq!(app.queue.published().len(), 1);
}

#[tokio::test]
async fn reject_link_never_enqueues() {
    let app = setup_test_app();
    let (token, message_id) = held_submission(&app).await;

    let response = app
        .send(
            Request::get(decision_uri("reject", &token, &message_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "vacancy rejected");

    let response = app
        .send(
            Request::get(decision_uri("approve", &token, &message_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.queue.published().is_empty());
}

#[tokio::test]
async fn tampered_token_returns_400() {
    let app = setup_test_app();
    let (token, message_id) = held_submission(&app).await;
    let tampered = format!("{token}x");

    let response = app
        .send(
            Request::get(decision_uri("approve", &tampered, &message_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["err"], "ERR_BAD_REQUEST");
    assert!(app.queue.published().is_empty());
}

#[tokio::test]
async fn missing_token_returns_400() {
    let app = setup_test_app();

    let response = app
        .send(
            Request::get("/vacancies/approve?message_id=abc@single")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["ok"], false);
}

#[tokio::test]
async fn approve_without_message_id_enqueues_directly() {
    let app = setup_test_app();
    let (token, _) = held_submission(&app).await;

    let response = app
        .send(
            Request::get(format!("/vacancies/approve?data={token}&message_id="))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.queue.published().len(), 1);
}
