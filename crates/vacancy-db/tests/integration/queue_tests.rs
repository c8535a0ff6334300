use std::time::Duration;

use vacancy_core::traits::{DeliveryAction, MessageQueue};

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn messages_are_received_in_order() {
    let (db, _container) = setup_test_db().await;
    let queue = db.queue("vacancies");

    queue.publish(b"first").await.unwrap();
    queue.publish(b"second").await.unwrap();

    let first = queue.receive("worker-1").await.unwrap().expect("first message");
    let second = queue.receive("worker-2").await.unwrap().expect("second message");
    assert_eq!(first.body, b"first");
    assert_eq!(second.body, b"second");
    assert!(queue.receive("worker-3").await.unwrap().is_none());
}

#[tokio::test]
async fn queues_are_isolated_by_name() {
    let (db, _container) = setup_test_db().await;
    db.queue("vacancies").publish(b"v").await.unwrap();

    assert!(db.queue("notifications").receive("w").await.unwrap().is_none());
    let delivery = db.queue("vacancies").receive("w").await.unwrap().unwrap();
    assert_eq!(delivery.body, b"v");
}

#[tokio::test]
async fn settled_messages_are_not_redelivered() {
    let (db, _container) = setup_test_db().await;
    let queue = db.queue("vacancies");
    queue.publish(b"ack me").await.unwrap();
    queue.publish(b"drop me").await.unwrap();

    let a = queue.receive("w").await.unwrap().unwrap();
    queue.settle(&a, DeliveryAction::Acknowledge).await.unwrap();
    let b = queue.receive("w").await.unwrap().unwrap();
    queue.settle(&b, DeliveryAction::Discard).await.unwrap();

    queue.release("w").await.unwrap();
    assert!(queue.receive("w").await.unwrap().is_none());
}

#[tokio::test]
async fn release_returns_claimed_messages() {
    let (db, _container) = setup_test_db().await;
    let queue = db.queue("vacancies");
    queue.publish(b"in flight").await.unwrap();

    let claimed = queue.receive("worker-1").await.unwrap().unwrap();
    assert_eq!(queue.release("worker-2").await.unwrap(), 0);
    assert_eq!(queue.release("worker-1").await.unwrap(), 1);

    let again = queue.receive("worker-2").await.unwrap().unwrap();
    assert_eq!(again.id, claimed.id);
}

#[tokio::test]
async fn concurrent_consumers_never_share_a_message() {
    let (db, _container) = setup_test_db().await;
    let queue = db.queue("vacancies");
    for i in 0..10u8 {
        queue.publish(&[i]).await.unwrap();
    }

    let mut handles = Vec::new();
    for w in 0..4 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(d) = queue.receive(&format!("worker-{w}")).await.unwrap() {
                seen.push(d.id);
            }
            seen
        }));
    }

    let mut all = Vec::new();
    for h in handles {
        all.extend(h.await.unwrap());
    }
    all.sort();
    let before = all.len();
    all.dedup();
    assert_eq!(before, 10);
    assert_eq!(all.len(), 10);
}

#[tokio::test]
async fn abandoned_claims_are_redelivered_after_visibility_timeout() {
    let (db, _container) = setup_test_db().await;
    let queue = db
        .queue("vacancies")
        .with_visibility_timeout(Duration::from_secs(1));
    queue.publish(b"orphaned").await.unwrap();

    // worker-1 dies holding the claim: no settle, no release.
    let claimed = queue.receive("worker-1").await.unwrap().unwrap();
    assert!(queue.receive("worker-2").await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let again = queue.receive("worker-2").await.unwrap().expect("redelivered");
    assert_eq!(again.id, claimed.id);
    assert_eq!(again.body, b"orphaned");
    assert!(queue.receive("worker-3").await.unwrap().is_none());

    queue.settle(&again, DeliveryAction::Acknowledge).await.unwrap();
    assert!(queue.receive("worker-3").await.unwrap().is_none());
}

#[tokio::test]
async fn fresh_claims_stay_with_their_consumer() {
    let (db, _container) = setup_test_db().await;
    let queue = db.queue("vacancies");
    queue.publish(b"busy").await.unwrap();

    queue.receive("worker-1").await.unwrap().unwrap();
    assert!(queue.receive("worker-2").await.unwrap().is_none());
}
