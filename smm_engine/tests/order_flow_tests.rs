mod support;

use panel_client::PanelApiError;
use smm_common::Money;
use smm_engine::{
    db_types::{OrderStatus, Provider, TransactionType, TxnReference},
    events::EventProducers,
    traits::{OrderFlowError, OrderStore, WalletLedger},
    BonusApi,
    BonusConfig,
    OrderFlowApi,
    SettingsApi,
    SqliteDatabase,
};
use support::{new_test_db, seed_provider, seed_service, seed_user, OrderRejectingGateway, StaticGateway};

fn order_api<G, F>(db: &SqliteDatabase, factory: F) -> OrderFlowApi<SqliteDatabase, F>
where
    G: smm_engine::traits::PanelGateway,
    F: Fn(&Provider) -> Result<G, PanelApiError>,
{
    let settings = SettingsApi::new(db.clone());
    let bonus = BonusApi::new(db.clone(), settings, EventProducers::default());
    OrderFlowApi::new(db.clone(), bonus, factory)
}

#[tokio::test]
async fn a_fulfilled_order_debits_records_and_links() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    // Cost 7.50 per thousand, customer rate 9.00 per thousand.
    let service_id =
        seed_service(&db, provider.id, "101", "7.5".parse().unwrap(), Money::from_units(9)).await;
    let user = seed_user(&db, "alice", Money::from_units(100)).await;

    let gateway = StaticGateway::new(Vec::new());
    let api = order_api(&db, move |_p: &Provider| Ok(gateway.clone()));
    let order = api.create_order(user.id, service_id, "https://example.com/p/1", 100).await.unwrap();

    // 9.00 / 1000 * 100 = 0.90 charged; 7.50 / 1000 * 100 = 0.75 owed to the provider.
    assert_eq!(order.charge, "0.9".parse::<Money>().unwrap());
    assert_eq!(order.cost, "0.75".parse::<Money>().unwrap());
    assert_eq!(order.quantity, 100);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.provider_order_id.as_deref(), Some("9000"));
    assert_eq!(order.link, "https://example.com/p/1");

    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(state.balance, "99.1".parse::<Money>().unwrap());
    assert_eq!(state.total_spent, "0.9".parse::<Money>().unwrap());

    // The funding debit points back at the order it paid for.
    let debits = db.transactions_for_user(user.id, Some(TransactionType::Debit)).await.unwrap();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].reference, TxnReference::Order(order.id));
    assert_eq!(debits[0].description, "Order for Service 101");

    let fetched = api.order_details(order.id).await.unwrap();
    assert_eq!(fetched.id, order.id);
    assert_eq!(api.user_orders(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn a_rejected_upstream_order_is_fully_compensated() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(12)).await;
    let user = seed_user(&db, "bob", Money::from_units(50)).await;

    let gateway = OrderRejectingGateway(StaticGateway::new(Vec::new()));
    let api = order_api(&db, move |_p: &Provider| Ok(gateway.clone()));
    let err = api.create_order(user.id, service_id, "https://example.com/p/2", 1000).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Upstream(_)));

    // Balance restored, the attempt leaves an audit trail of exactly two rows, and no order exists.
    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(state.balance, Money::from_units(50));
    assert_eq!(state.total_spent, Money::ZERO);
    let history = db.transactions_for_user(user.id, None).await.unwrap();
    // Seed credit + debit + refund credit.
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].txn_type, TransactionType::Credit);
    assert!(history[0].description.starts_with("Refund for failed order:"));
    assert_eq!(history[1].txn_type, TransactionType::Debit);
    assert!(db.orders_for_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn inactive_or_missing_services_are_not_orderable() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(12)).await;
    let user = seed_user(&db, "carol", Money::from_units(50)).await;

    // Deactivating the provider takes its whole catalog off the market.
    use smm_engine::traits::{CatalogStore, UpdateProvider};
    db.update_provider(provider.id, UpdateProvider::default().with_active(false)).await.unwrap();

    let gateway = StaticGateway::new(Vec::new());
    let api = order_api(&db, move |_p: &Provider| Ok(gateway.clone()));
    let err = api.create_order(user.id, service_id, "https://example.com/p/3", 100).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ServiceUnavailable(_)));
    let err = api.create_order(user.id, 9999, "https://example.com/p/3", 100).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ServiceUnavailable(9999)));

    // No money moved on either refusal.
    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(state.balance, Money::from_units(50));
    assert_eq!(db.transactions_for_user(user.id, Some(TransactionType::Debit)).await.unwrap().len(), 0);
}

#[tokio::test]
async fn underfunded_orders_leave_no_trace() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(12)).await;
    let user = seed_user(&db, "dave", Money::from_units(1)).await;

    let gateway = StaticGateway::new(Vec::new());
    let orders_placed = gateway.orders_placed.clone();
    let api = order_api(&db, move |_p: &Provider| Ok(gateway.clone()));
    let err = api.create_order(user.id, service_id, "https://example.com/p/4", 1000).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Ledger(_)));

    // The provider was never contacted.
    assert!(orders_placed.lock().unwrap().is_empty());
    assert!(db.orders_for_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn quantity_limits_are_enforced_before_any_charge() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    // seed_service sets min 10, max 100_000.
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(12)).await;
    let user = seed_user(&db, "erin", Money::from_units(5000)).await;

    let gateway = StaticGateway::new(Vec::new());
    let api = order_api(&db, move |_p: &Provider| Ok(gateway.clone()));
    let err = api.create_order(user.id, service_id, "https://example.com/p/5", 5).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::QuantityOutOfRange { .. }));

    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(state.balance, Money::from_units(5000));
}

// A persist failure after the provider accepted the order is the one outcome the flow cannot compensate: the debit
// stands, the upstream order will deliver, and an operator has to reconcile. The store must at least fail atomically.
#[tokio::test]
async fn a_failed_order_record_is_atomic_and_surfaces_the_error() {
    let (db, _dir) = new_test_db().await;
    let provider = seed_provider(&db, "Panel", 20).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(12)).await;
    let user = seed_user(&db, "gina", Money::from_units(50)).await;
    let txn = db.debit(user.id, Money::from_units(12), "Order for Service 101", TxnReference::None).await.unwrap();

    let ghost_user = user.id + 1000;
    let order = smm_engine::traits::FulfilledOrder {
        user_id: ghost_user,
        provider_id: provider.id,
        service_id,
        provider_order_id: "9000".to_string(),
        quantity: 1000,
        charge: Money::from_units(12),
        cost: Money::from_units(10),
        link: "https://example.com/p/7".to_string(),
        status: OrderStatus::Pending,
        request_data: serde_json::json!({}),
        response_data: serde_json::json!({}),
        debit_txn_id: txn.id,
    };
    assert!(db.record_fulfilled_order(order).await.is_err());

    // Nothing of the failed unit survives: no order row, and the debit stays unlinked for the operator to find.
    assert!(db.orders_for_user(ghost_user).await.unwrap().is_empty());
    let debits = db.transactions_for_user(user.id, Some(TransactionType::Debit)).await.unwrap();
    assert_eq!(debits[0].reference, TxnReference::None);
}

#[tokio::test]
async fn crossing_the_spend_threshold_through_orders_unlocks_the_bonus() {
    let (db, _dir) = new_test_db().await;
    let settings = SettingsApi::new(db.clone());
    settings
        .update_bonus_config(BonusConfig {
            enabled: true,
            registration_amount: Money::from_units(25),
            unlock_threshold: Money::from_units(10),
        })
        .await
        .unwrap();
    let bonus = BonusApi::new(db.clone(), settings.clone(), EventProducers::default());
    let provider = seed_provider(&db, "Panel", 20).await;
    let service_id = seed_service(&db, provider.id, "101", Money::from_units(10), Money::from_units(12)).await;
    let user = seed_user(&db, "frank", Money::from_units(100)).await;
    bonus.award_welcome_bonus(user.id).await.unwrap().expect("Award should land");

    let gateway = StaticGateway::new(Vec::new());
    let api = OrderFlowApi::new(db.clone(), bonus, move |_p: &Provider| Ok(gateway.clone()));
    // 12.00 per thousand x 1000 = 12.00 charge, clearing the 10.00 threshold in one order.
    api.create_order(user.id, service_id, "https://example.com/p/6", 1000).await.unwrap();

    let state = db.fetch_user(user.id).await.unwrap().unwrap();
    assert!(state.bonus_unlocked);
    assert_eq!(state.bonus_balance, Money::ZERO);
    // 100 funded - 12 charged + 25 unlocked.
    assert_eq!(state.balance, Money::from_units(113));
    let unlocks = db.transactions_for_user(user.id, Some(TransactionType::BonusUnlock)).await.unwrap();
    assert_eq!(unlocks.len(), 1);
}
