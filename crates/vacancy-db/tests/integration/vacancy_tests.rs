use vacancy_core::testutil::test_vacancy;
use vacancy_core::traits::VacancyStore;

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn save_returns_record_with_fields() {
    let (db, _container) = setup_test_db().await;
    let repo = db.vacancy_repo();

    let record = repo.save(&test_vacancy("https://acme.example/jobs/1")).await.unwrap();

    assert_eq!(record.vacancy.job_title, "Backend Engineer");
    assert_eq!(record.vacancy.relevant_tags, vec!["rust", "backend"]);
    assert_eq!(record.vacancy.apply_url, "https://acme.example/jobs/1");

    let (stored,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacancies WHERE id = $1")
        .bind(record.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(stored, 1);
    assert!(repo.all_apply_urls().await.unwrap().contains("https://acme.example/jobs/1"));
}

#[tokio::test]
async fn company_location_comes_from_latest_non_empty_record() {
    let (db, _container) = setup_test_db().await;
    let repo = db.vacancy_repo();

    let mut older = test_vacancy("https://acme.example/jobs/1");
    older.company_location = "Berlin, Germany".into();
    repo.save(&older).await.unwrap();

    let mut newer = test_vacancy("https://acme.example/jobs/2");
    newer.company_location = "Amsterdam, Netherlands".into();
    repo.save(&newer).await.unwrap();

    let mut blank = test_vacancy("https://acme.example/jobs/3");
    blank.company_location.clear();
    repo.save(&blank).await.unwrap();

    assert_eq!(
        repo.lookup_company_location("acme").await.unwrap().as_deref(),
        Some("Amsterdam, Netherlands")
    );
    assert_eq!(repo.lookup_company_location("Globex").await.unwrap(), None);
}

#[tokio::test]
async fn company_location_skips_remote_and_global_values() {
    let (db, _container) = setup_test_db().await;
    let repo = db.vacancy_repo();

    let mut placed = test_vacancy("https://initech.example/jobs/1");
    placed.company_name = "Initech".into();
    placed.company_location = "Oslo, Norway".into();
    repo.save(&placed).await.unwrap();

    for (n, location) in ["Remote", "Global", "Worldwide (remote)"].into_iter().enumerate() {
        let mut vacancy = test_vacancy(&format!("https://initech.example/jobs/{}", n + 2));
        vacancy.company_name = "Initech".into();
        vacancy.company_location = location.into();
        repo.save(&vacancy).await.unwrap();
    }

    assert_eq!(
        repo.lookup_company_location("initech").await.unwrap().as_deref(),
        Some("Oslo, Norway")
    );
}

#[tokio::test]
async fn company_location_is_none_when_only_remote_is_known() {
    let (db, _container) = setup_test_db().await;
    let repo = db.vacancy_repo();

    let mut vacancy = test_vacancy("https://hooli.example/jobs/1");
    vacancy.company_name = "Hooli".into();
    vacancy.company_location = "Global Remote".into();
    repo.save(&vacancy).await.unwrap();

    assert_eq!(repo.lookup_company_location("Hooli").await.unwrap(), None);
}

#[tokio::test]
async fn all_apply_urls_is_distinct() {
    let (db, _container) = setup_test_db().await;
    let repo = db.vacancy_repo();

    repo.save(&test_vacancy("https://acme.example/jobs/1")).await.unwrap();
    repo.save(&test_vacancy("https://acme.example/jobs/1")).await.unwrap();
    repo.save(&test_vacancy("https://acme.example/jobs/2")).await.unwrap();

    let urls = repo.all_apply_urls().await.unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains("https://acme.example/jobs/2"));
}
