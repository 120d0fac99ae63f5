mod support;

use serde_json::json;
use smm_common::Money;
use smm_engine::{
    db_types::{OrderStatus, TransactionType, TxnReference},
    events::EventProducers,
    traits::{FulfilledOrder, OrderStore, WalletLedger},
    BonusApi,
    BonusConfig,
    SettingsApi,
    SqliteDatabase,
};
use support::{new_test_db, seed_provider, seed_service, seed_user};

fn bonus_api(db: &SqliteDatabase) -> BonusApi<SqliteDatabase> {
    let settings = SettingsApi::new(db.clone());
    BonusApi::new(db.clone(), settings, EventProducers::default())
}

/// Simulates the spend bookkeeping of a fulfilled order without going through a gateway: a debit plus an order row,
/// which bumps `total_spent` by the charge.
async fn spend(db: &SqliteDatabase, user_id: i64, service_id: i64, provider_id: i64, charge: Money) {
    let txn = db.debit(user_id, charge, "Order for Followers", TxnReference::None).await.unwrap();
    let order = FulfilledOrder {
        user_id,
        provider_id,
        service_id,
        provider_order_id: "900001".to_string(),
        quantity: 100,
        charge,
        cost: charge,
        link: "https://example.com/p/1".to_string(),
        status: OrderStatus::Pending,
        request_data: json!({}),
        response_data: json!({}),
        debit_txn_id: txn.id,
    };
    db.record_fulfilled_order(order).await.unwrap();
}

#[tokio::test]
async fn welcome_bonus_is_awarded_exactly_once() {
    let (db, _dir) = new_test_db().await;
    let api = bonus_api(&db);
    let user = seed_user(&db, "alice", Money::ZERO).await;

    let first = api.award_welcome_bonus(user.id).await.unwrap();
    let txn = first.expect("First award should land");
    assert_eq!(txn.txn_type, TransactionType::BonusAward);
    assert_eq!(txn.amount, Money::from_units(5000));

    // A replayed verification event changes nothing.
    let second = api.award_welcome_bonus(user.id).await.unwrap();
    assert!(second.is_none());

    let user = db.fetch_user(user.id).await.unwrap().unwrap();
    assert!(user.bonus_awarded);
    assert_eq!(user.bonus_balance, Money::from_units(5000));
    assert_eq!(user.balance, Money::ZERO);
    let awards = db.transactions_for_user(user.id, Some(TransactionType::BonusAward)).await.unwrap();
    assert_eq!(awards.len(), 1);
}

#[tokio::test]
async fn disabled_program_awards_nothing() {
    let (db, _dir) = new_test_db().await;
    let settings = SettingsApi::new(db.clone());
    settings
        .update_bonus_config(BonusConfig { enabled: false, ..BonusConfig::default() })
        .await
        .unwrap();
    let api = BonusApi::new(db.clone(), settings, EventProducers::default());
    let user = seed_user(&db, "bob", Money::ZERO).await;

    assert!(api.award_welcome_bonus(user.id).await.unwrap().is_none());
    let user = db.fetch_user(user.id).await.unwrap().unwrap();
    assert!(!user.bonus_awarded);
    assert_eq!(user.bonus_balance, Money::ZERO);
}

#[tokio::test]
async fn bonus_unlocks_at_the_spend_threshold_and_only_once() {
    let (db, _dir) = new_test_db().await;
    let settings = SettingsApi::new(db.clone());
    settings
        .update_bonus_config(BonusConfig {
            enabled: true,
            registration_amount: Money::from_units(5000),
            unlock_threshold: Money::from_units(100),
        })
        .await
        .unwrap();
    let api = BonusApi::new(db.clone(), settings, EventProducers::default());

    let provider = seed_provider(&db, "Panel", 25).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(10)).await;
    let user = seed_user(&db, "carol", Money::from_units(500)).await;
    api.award_welcome_bonus(user.id).await.unwrap().expect("Award should land");

    // 99 spent: one unit short of the threshold.
    spend(&db, user.id, service_id, provider.id, Money::from_units(99)).await;
    assert!(api.check_and_unlock(user.id).await.unwrap().is_none());
    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert!(!state.bonus_unlocked);

    // One more unit crosses it exactly.
    spend(&db, user.id, service_id, provider.id, Money::from_units(1)).await;
    let unlock = api.check_and_unlock(user.id).await.unwrap().expect("Unlock should trigger at the threshold");
    assert_eq!(unlock.txn_type, TransactionType::BonusUnlock);
    assert_eq!(unlock.amount, Money::from_units(5000));

    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert!(state.bonus_unlocked);
    assert!(state.bonus_unlocked_at.is_some());
    assert_eq!(state.bonus_balance, Money::ZERO);
    // 500 funded - 100 spent + 5000 unlocked.
    assert_eq!(state.balance, Money::from_units(5400));

    // Unlock is one-way and one-time.
    assert!(api.check_and_unlock(user.id).await.unwrap().is_none());
    let unlocks = db.transactions_for_user(user.id, Some(TransactionType::BonusUnlock)).await.unwrap();
    assert_eq!(unlocks.len(), 1);
}

#[tokio::test]
async fn users_without_a_bonus_never_unlock() {
    let (db, _dir) = new_test_db().await;
    let api = bonus_api(&db);
    let provider = seed_provider(&db, "Panel", 25).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(10)).await;
    let user = seed_user(&db, "dave", Money::from_units(50_000)).await;

    spend(&db, user.id, service_id, provider.id, Money::from_units(20_000)).await;
    assert!(api.check_and_unlock(user.id).await.unwrap().is_none());
    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert!(!state.bonus_unlocked);
}
