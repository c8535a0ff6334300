use vacancy_core::models::{ApprovalState, MessageId, SubmitRequest};
use vacancy_core::testutil::test_vacancy;
use vacancy_core::traits::ApprovalStore;

use vacancy_db::Database;

use crate::integration::common::setup_test_db;

async fn stored_request(db: &Database, id: &MessageId) -> Option<SubmitRequest> {
    let row: Option<(serde_json::Value,)> =
        sqlx::query_as("SELECT request FROM approvals WHERE message_id = $1")
            .bind(id.as_str())
            .fetch_optional(db.pool())
            .await
            .unwrap();
    row.map(|(request,)| serde_json::from_value(request).unwrap())
}

async fn row_count(db: &Database, ids: &[&MessageId]) -> i64 {
    let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM approvals WHERE message_id = ANY($1)")
            .bind(&ids)
            .fetch_one(db.pool())
            .await
            .unwrap();
    count
}

#[tokio::test]
async fn saved_record_starts_pending_and_keeps_request() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let id = MessageId::single();
    let request = SubmitRequest::manual(test_vacancy("https://acme.example/jobs/1"), "a@b.com");

    repo.save(&id, &request).await.unwrap();

    assert_eq!(repo.get_state(&id).await.unwrap(), Some(ApprovalState::Pending));
    assert_eq!(stored_request(&db, &id).await, Some(request));
    assert_eq!(repo.get_state(&MessageId::single()).await.unwrap(), None);
}

#[tokio::test]
async fn transition_happens_once() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let id = MessageId::single();
    repo.save(&id, &SubmitRequest::url("https://acme.example/jobs/1", "a@b.com"))
        .await
        .unwrap();

    assert!(repo.transition(&id, ApprovalState::Approved).await.unwrap());
    assert!(!repo.transition(&id, ApprovalState::Rejected).await.unwrap());
    assert_eq!(repo.get_state(&id).await.unwrap(), Some(ApprovalState::Approved));
}

#[tokio::test]
async fn concurrent_transitions_have_one_winner() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let id = MessageId::single();
    repo.save(&id, &SubmitRequest::url("https://acme.example/jobs/1", "a@b.com"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        repo.transition(&id, ApprovalState::Approved),
        repo.transition(&id, ApprovalState::Rejected)
    );
    assert!(a.unwrap() ^ b.unwrap());
}

#[tokio::test]
async fn batch_is_all_or_nothing() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let first = MessageId::batch();
    let second = MessageId::batch();
    let items = vec![
        (first.clone(), SubmitRequest::url("https://acme.example/jobs/1", "crawler")),
        (second.clone(), SubmitRequest::url("https://acme.example/jobs/2", "crawler")),
        (first.clone(), SubmitRequest::url("https://acme.example/jobs/3", "crawler")),
    ];

    assert!(repo.save_batch(&items).await.is_err());

    assert_eq!(row_count(&db, &[&first, &second]).await, 0);
    for url in ["jobs/1", "jobs/2", "jobs/3"] {
        let url = format!("https://acme.example/{url}");
        assert!(!repo.is_already_requested(&url).await.unwrap(), "{url}");
    }
}

#[tokio::test]
async fn batch_conflicting_with_stored_record_leaves_it_untouched() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let taken = MessageId::batch();
    let original = SubmitRequest::url("https://acme.example/jobs/0", "crawler");
    repo.save(&taken, &original).await.unwrap();

    let fresh_a = MessageId::batch();
    let fresh_b = MessageId::batch();
    let items = vec![
        (fresh_a.clone(), SubmitRequest::url("https://acme.example/jobs/1", "crawler")),
        (fresh_b.clone(), SubmitRequest::url("https://acme.example/jobs/2", "crawler")),
        (taken.clone(), SubmitRequest::url("https://acme.example/jobs/3", "crawler")),
    ];

    assert!(repo.save_batch(&items).await.is_err());

    assert_eq!(row_count(&db, &[&fresh_a, &fresh_b]).await, 0);
    assert_eq!(row_count(&db, &[&taken]).await, 1);
    assert_eq!(stored_request(&db, &taken).await, Some(original));
}

#[tokio::test]
async fn clean_batch_is_stored_pending() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let items = vec![
        (MessageId::batch(), SubmitRequest::url("https://acme.example/jobs/3", "crawler")),
        (MessageId::batch(), SubmitRequest::url("https://acme.example/jobs/4", "crawler")),
        (MessageId::batch(), SubmitRequest::url("https://acme.example/jobs/5", "crawler")),
    ];

    repo.save_batch(&items).await.unwrap();

    for (id, _) in &items {
        assert_eq!(repo.get_state(id).await.unwrap(), Some(ApprovalState::Pending));
    }
}

#[tokio::test]
async fn already_requested_only_while_pending() {
    let (db, _container) = setup_test_db().await;
    let repo = db.approval_repo();
    let url = "https://acme.example/jobs/1";
    let id = MessageId::single();
    repo.save(&id, &SubmitRequest::url(url, "a@b.com")).await.unwrap();

    assert!(repo.is_already_requested(url).await.unwrap());
    assert!(!repo.is_already_requested("https://acme.example/jobs/2").await.unwrap());

    repo.transition(&id, ApprovalState::Rejected).await.unwrap();
    assert!(!repo.is_already_requested(url).await.unwrap());
}
