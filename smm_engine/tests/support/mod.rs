//! Shared fixtures for the integration tests: a throwaway migrated database, seed helpers and canned panel
//! gateways.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use panel_client::{OrderParams, PanelApiError, PanelBalance, PlacedOrder, RawService};
use serde_json::{json, Value};
use smm_common::{Money, Secret};
use smm_engine::{
    db_types::{NewProvider, NewUser, Provider, User},
    traits::{CatalogStore, PanelGateway, ServiceUpsert, WalletLedger},
    SqliteDatabase,
};
use tempfile::TempDir;

/// A fresh, fully migrated database in its own temp directory. Keep the [`TempDir`] alive for the duration of the
/// test; dropping it removes the database file.
///
/// The pool holds a single connection. Concurrency inside a test then serializes on acquire, and every read runs on
/// the connection that performed the writes, so results never depend on cross-connection visibility timing.
pub async fn new_test_db() -> (SqliteDatabase, TempDir) {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Could not create a temp dir for the test database");
    let url = format!("sqlite://{}/test_store_{}.db", dir.path().display(), rand::random::<u64>());
    let db = SqliteDatabase::new(&url, 1).await.expect("Error creating the test database");
    (db, dir)
}

pub async fn seed_user(db: &SqliteDatabase, name: &str, balance: Money) -> User {
    let user = db
        .create_user(NewUser::new(name.to_string(), format!("{name}@example.com")))
        .await
        .expect("Error creating test user");
    if balance.is_positive() {
        db.credit(user.id, balance, "Initial deposit", None).await.expect("Error funding test user");
    }
    db.fetch_user(user.id).await.expect("Error fetching test user").expect("Test user vanished")
}

pub async fn seed_provider(db: &SqliteDatabase, name: &str, markup_percent: i64) -> Provider {
    let provider = NewProvider::new(name, "https://panel.example.com/api/v2", Secret::new("test-key".to_string()))
        .with_markup(Money::from_units(markup_percent));
    db.create_provider(provider).await.expect("Error creating test provider")
}

/// Seeds one catalog row directly through the store, bypassing the gateway. `rate_per_k` is the customer rate;
/// `cost_per_k` the provider rate.
pub async fn seed_service(
    db: &SqliteDatabase,
    provider_id: i64,
    service_id: &str,
    cost_per_k: Money,
    rate_per_k: Money,
) -> i64 {
    let upsert = ServiceUpsert {
        service_id: service_id.to_string(),
        name: format!("Service {service_id}"),
        service_type: "default".to_string(),
        category: Some("Test".to_string()),
        cost: cost_per_k,
        rate: rate_per_k,
        min_quantity: Some(10),
        max_quantity: Some(100_000),
        description: None,
        metadata: json!({"service": service_id}),
    };
    db.reconcile_services(provider_id, &[upsert]).await.expect("Error seeding service");
    let services = db.services_for_provider(provider_id).await.expect("Error reading seeded services");
    services.into_iter().find(|s| s.service_id == service_id).expect("Seeded service missing").id
}

//--------------------------------------   StaticGateway   -----------------------------------------------------------

/// A canned panel: serves a switchable service list, a fixed balance and sequential order ids.
#[derive(Clone)]
pub struct StaticGateway {
    services: Arc<Mutex<Vec<Value>>>,
    pub balance: Money,
    pub balance_fails: bool,
    next_order_id: Arc<AtomicU64>,
    pub orders_placed: Arc<Mutex<Vec<OrderParams>>>,
}

impl StaticGateway {
    pub fn new(services: Vec<Value>) -> Self {
        Self {
            services: Arc::new(Mutex::new(services)),
            balance: Money::from_units(500),
            balance_fails: false,
            next_order_id: Arc::new(AtomicU64::new(9000)),
            orders_placed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_balance(mut self, balance: Money) -> Self {
        self.balance = balance;
        self
    }

    pub fn without_balance_endpoint(mut self) -> Self {
        self.balance_fails = true;
        self
    }

    /// Swaps the service list the panel reports on the next sync.
    pub fn set_services(&self, services: Vec<Value>) {
        *self.services.lock().unwrap() = services;
    }
}

impl PanelGateway for StaticGateway {
    async fn list_services(&self) -> Result<Vec<RawService>, PanelApiError> {
        let services = self.services.lock().unwrap().clone();
        Ok(services.into_iter().map(RawService::new).collect())
    }

    async fn balance(&self) -> Result<PanelBalance, PanelApiError> {
        if self.balance_fails {
            return Err(PanelApiError::Upstream("balance endpoint disabled".to_string()));
        }
        Ok(PanelBalance { balance: self.balance, currency: "USD".to_string() })
    }

    async fn place_order(&self, params: &OrderParams) -> Result<PlacedOrder, PanelApiError> {
        self.orders_placed.lock().unwrap().push(params.clone());
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        Ok(PlacedOrder { order_id: id.to_string(), raw: json!({"order": id}) })
    }
}

//--------------------------------------  FailingGateway   -----------------------------------------------------------

/// A panel whose every call fails, for verification-failure and compensation tests.
#[derive(Clone)]
pub struct FailingGateway;

impl PanelGateway for FailingGateway {
    async fn list_services(&self) -> Result<Vec<RawService>, PanelApiError> {
        Err(PanelApiError::Transport("connection refused".to_string()))
    }

    async fn balance(&self) -> Result<PanelBalance, PanelApiError> {
        Err(PanelApiError::Transport("connection refused".to_string()))
    }

    async fn place_order(&self, _params: &OrderParams) -> Result<PlacedOrder, PanelApiError> {
        Err(PanelApiError::Upstream("not enough funds on the panel account".to_string()))
    }
}

/// A healthy panel that refuses orders only, so flows up to the order call behave normally.
#[derive(Clone)]
pub struct OrderRejectingGateway(pub StaticGateway);

impl PanelGateway for OrderRejectingGateway {
    async fn list_services(&self) -> Result<Vec<RawService>, PanelApiError> {
        self.0.list_services().await
    }

    async fn balance(&self) -> Result<PanelBalance, PanelApiError> {
        self.0.balance().await
    }

    async fn place_order(&self, _params: &OrderParams) -> Result<PlacedOrder, PanelApiError> {
        Err(PanelApiError::Upstream("neworder is disabled".to_string()))
    }
}

/// Three typical upstream service records, as a panel would list them.
pub fn sample_services() -> Vec<Value> {
    vec![
        json!({"service": 101, "name": "Followers", "type": "default", "category": "Instagram",
               "rate": "7.5", "min": 10, "max": 100000}),
        json!({"service": 102, "name": "Likes", "type": "default", "category": "Instagram",
               "rate": "1.2", "min": 50, "max": 50000}),
        json!({"service": 103, "name": "Views", "type": "default", "category": "Video",
               "rate": "0.05", "min": 100, "max": 1000000}),
    ]
}
