use panel_client::PanelApiError;
use smm_common::{Money, Secret};
use thiserror::Error;

use crate::db_types::{NewProvider, Provider, Service, VerificationStatus};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Provider {0} does not exist")]
    ProviderNotFound(i64),
    #[error("Provider {provider_id} still owns {order_count} orders and cannot be deleted. Deactivate it instead.")]
    HasOrders { provider_id: i64, order_count: i64 },
    #[error("Panel gateway error: {0}")]
    Gateway(#[from] PanelApiError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// One normalized live service record, priced and ready to upsert.
#[derive(Debug, Clone)]
pub struct ServiceUpsert {
    pub service_id: String,
    pub name: String,
    pub service_type: String,
    pub category: Option<String>,
    pub cost: Money,
    pub rate: Money,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
}

/// The result of one catalog reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub errors: Vec<String>,
}

impl SyncOutcome {
    pub fn total(&self) -> u64 {
        self.created + self.updated
    }
}

/// Field-wise provider update, in the builder style of the modify-request objects elsewhere in the engine.
#[derive(Debug, Clone, Default)]
pub struct UpdateProvider {
    pub name: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<Secret<String>>,
    pub is_active: Option<bool>,
    pub priority: Option<i64>,
    pub markup_percentage: Option<Money>,
    pub metadata: Option<serde_json::Value>,
}

impl UpdateProvider {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_api_url<S: Into<String>>(mut self, api_url: S) -> Self {
        self.api_url = Some(api_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_markup(mut self, percent: Money) -> Self {
        self.markup_percentage = Some(percent);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.api_url.is_none()
            && self.api_key.is_none()
            && self.is_active.is_none()
            && self.priority.is_none()
            && self.markup_percentage.is_none()
            && self.metadata.is_none()
    }
}

/// Provider statistics for the admin view.
#[derive(Debug, Clone, Default)]
pub struct ProviderStats {
    pub total_services: i64,
    pub active_services: i64,
    pub total_orders: i64,
    pub completed_orders: i64,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub balance: Money,
}

/// Storage contract for providers and their service catalogs. All writes to a provider's service set go through
/// [`CatalogStore::reconcile_services`]; nothing else touches those rows.
#[allow(async_fn_in_trait)]
pub trait CatalogStore: Clone {
    async fn create_provider(&self, provider: NewProvider) -> Result<Provider, CatalogError>;

    async fn fetch_provider(&self, provider_id: i64) -> Result<Option<Provider>, CatalogError>;

    async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError>;

    async fn update_provider(&self, provider_id: i64, update: UpdateProvider) -> Result<Provider, CatalogError>;

    /// Deletes a provider and its services. Blocked with [`CatalogError::HasOrders`] while any order references the
    /// provider.
    async fn delete_provider(&self, provider_id: i64) -> Result<(), CatalogError>;

    /// Applies one sync snapshot atomically: upserts every record, deletes every stored service absent from the
    /// snapshot and stamps `last_sync_at`. A partial failure leaves the catalog untouched.
    ///
    /// The snapshot deletion is skipped when `upserts` is empty, so a degenerate-but-successful upstream response
    /// cannot wipe a whole catalog.
    async fn reconcile_services(&self, provider_id: i64, upserts: &[ServiceUpsert]) -> Result<SyncOutcome, CatalogError>;

    async fn services_for_provider(&self, provider_id: i64) -> Result<Vec<Service>, CatalogError>;

    /// Stores the last known upstream balance snapshot. Informational; never part of a sync transaction.
    async fn set_provider_balance(&self, provider_id: i64, balance: Money, currency: &str) -> Result<(), CatalogError>;

    /// Records the verification outcome. The transition is one-way: only a `Pending` provider is updated.
    async fn mark_verification(&self, provider_id: i64, status: VerificationStatus) -> Result<(), CatalogError>;

    async fn provider_stats(&self, provider_id: i64) -> Result<ProviderStats, CatalogError>;
}
