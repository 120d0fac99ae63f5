use panel_client::PanelApiError;
use smm_common::Money;
use thiserror::Error;

use crate::db_types::{Order, OrderStatus, Provider, Service};
use crate::traits::LedgerError;

#[derive(Debug, Error)]
pub enum OrderFlowError {
    #[error("Service {0} is not available for ordering")]
    ServiceUnavailable(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Quantity {quantity} is outside the allowed range [{min}, {max}]")]
    QuantityOutOfRange { quantity: i64, min: i64, max: i64 },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Provider request failed: {0}")]
    Upstream(#[from] PanelApiError),
    #[error(
        "CRITICAL: could not refund {amount} to user {user_id} after a failed order (debit txn {debit_txn_id}): \
         {cause}. Manual reconciliation required."
    )]
    RefundFailed { user_id: i64, amount: Money, debit_txn_id: i64, cause: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// A locally-settled order, ready to persist. The debit has already been taken and the provider has already
/// acknowledged the order by the time one of these exists.
#[derive(Debug, Clone)]
pub struct FulfilledOrder {
    pub user_id: i64,
    pub provider_id: i64,
    pub service_id: i64,
    pub provider_order_id: String,
    pub quantity: i64,
    pub charge: Money,
    pub cost: Money,
    pub link: String,
    pub status: OrderStatus,
    pub request_data: serde_json::Value,
    pub response_data: serde_json::Value,
    /// The debit transaction this order settles. Linked to the stored order once the row exists.
    pub debit_txn_id: i64,
}

/// Storage contract for order rows. Pricing and wallet movement live in the API layer; this trait only reads the
/// catalog and records outcomes.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// Fetches a service by local id together with its provider, but only when both are active.
    async fn fetch_active_service(&self, service_id: i64) -> Result<Option<(Service, Provider)>, OrderFlowError>;

    /// Persists a fulfilled order and points its debit transaction at the new row.
    async fn record_fulfilled_order(&self, order: FulfilledOrder) -> Result<Order, OrderFlowError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError>;

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<Order, OrderFlowError>;
}
