mod support;

use std::time::Duration;

use smm_common::Money;
use smm_engine::{
    db_types::{Provider, VerificationStatus},
    jobs::{self, RetrySchedule},
    traits::CatalogStore,
    CatalogApi,
};
use support::{new_test_db, sample_services, seed_provider, FailingGateway, StaticGateway};

/// Three attempts, like production, without the production waits.
fn fast_schedule() -> RetrySchedule {
    RetrySchedule::new(vec![Duration::from_millis(5), Duration::from_millis(5)])
}

#[tokio::test]
async fn a_verified_provider_gets_an_immediate_catalog_sync() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let gateway = StaticGateway::new(sample_services()).with_balance(Money::from_units(11));
    let api = CatalogApi::new(db.clone(), move |_p: &Provider| Ok(gateway.clone()));

    let status = jobs::run_verification(&api, provider.id, &fast_schedule()).await;
    assert_eq!(status, VerificationStatus::Verified);

    let stored = db.fetch_provider(provider.id).await.unwrap().unwrap();
    assert_eq!(stored.verification_status, VerificationStatus::Verified);
    assert_eq!(stored.balance, Money::from_units(11));
    // The follow-up sync already imported the catalog.
    assert_eq!(db.services_for_provider(provider.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn an_unreachable_provider_is_marked_failed_after_the_retry_budget() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let api = CatalogApi::new(db.clone(), |_p: &Provider| Ok(FailingGateway));

    let status = jobs::run_verification(&api, provider.id, &fast_schedule()).await;
    assert_eq!(status, VerificationStatus::Failed);

    let stored = db.fetch_provider(provider.id).await.unwrap().unwrap();
    assert_eq!(stored.verification_status, VerificationStatus::Failed);
}

#[tokio::test]
async fn an_exhausted_sync_leaves_the_catalog_untouched() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let api = CatalogApi::new(db.clone(), |_p: &Provider| Ok(FailingGateway));

    assert!(jobs::run_catalog_sync(&api, provider.id, &fast_schedule()).await.is_err());
    let stored = db.fetch_provider(provider.id).await.unwrap().unwrap();
    assert!(stored.last_sync_at.is_none());
}

#[test]
fn the_default_schedule_makes_three_attempts() {
    assert_eq!(RetrySchedule::default().attempts(), 3);
}
