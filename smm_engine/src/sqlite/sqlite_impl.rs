//! `SqliteDatabase` is the concrete SQLite implementation of every storage trait in [`crate::traits`].
use std::fmt::Debug;

use log::*;
use smm_common::Money;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, providers, services, settings, transactions, users};
use crate::{
    db_types::{NewProvider, NewUser, Order, OrderStatus, Provider, Service, TransactionType, TxnReference, User,
        VerificationStatus, WalletTransaction},
    traits::{
        BonusStore,
        CatalogError,
        CatalogStore,
        FulfilledOrder,
        LedgerError,
        OrderFlowError,
        OrderStore,
        ProviderStats,
        ServiceUpsert,
        SettingsError,
        SettingsStore,
        SyncOutcome,
        UpdateProvider,
        WalletLedger,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating and migrating it as needed.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Connects using `SMM_DATABASE_URL`, falling back to the default on-disk store.
    pub async fn new_from_env(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new(&url, max_connections).await
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl WalletLedger for SqliteDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::create_user(&user, &mut conn).await?;
        debug!("🏦️ Created user {} ({})", user.id, user.user_name);
        Ok(user)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_id(user_id, &mut conn).await
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_email(email, &mut conn).await
    }

    async fn credit(
        &self,
        user_id: i64,
        amount: Money,
        description: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<WalletTransaction, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let txn = transactions::credit(user_id, amount, description, metadata, &mut tx).await?;
        tx.commit().await?;
        debug!("🏦️ Credited {amount} to user {user_id}. New balance: {}", txn.balance_after);
        Ok(txn)
    }

    async fn debit(
        &self,
        user_id: i64,
        amount: Money,
        description: &str,
        reference: TxnReference,
    ) -> Result<WalletTransaction, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let txn = transactions::debit(user_id, amount, description, reference, &mut tx).await?;
        tx.commit().await?;
        debug!("🏦️ Debited {amount} from user {user_id}. New balance: {}", txn.balance_after);
        Ok(txn)
    }

    async fn admin_adjust(&self, user_id: i64, amount: Money, reason: &str) -> Result<WalletTransaction, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let txn = transactions::admin_adjust(user_id, amount, reason, &mut tx).await?;
        tx.commit().await?;
        info!("🏦️ Admin adjustment of {amount} applied to user {user_id}. Reason: {reason}");
        Ok(txn)
    }

    async fn transactions_for_user(
        &self,
        user_id: i64,
        txn_type: Option<TransactionType>,
    ) -> Result<Vec<WalletTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transactions(user_id, txn_type, &mut conn).await
    }
}

impl BonusStore for SqliteDatabase {
    async fn award_welcome_bonus(&self, user_id: i64, amount: Money) -> Result<Option<WalletTransaction>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let txn = transactions::award_welcome_bonus(user_id, amount, &mut tx).await?;
        tx.commit().await?;
        if txn.is_some() {
            debug!("🎁️ Awarded a welcome bonus of {amount} to user {user_id}");
        }
        Ok(txn)
    }

    async fn try_unlock_bonus(&self, user_id: i64, threshold: Money) -> Result<Option<WalletTransaction>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let txn = transactions::unlock_bonus(user_id, threshold, &mut tx).await?;
        tx.commit().await?;
        if let Some(txn) = &txn {
            info!("🎁️ Unlocked a bonus of {} for user {user_id}", txn.amount);
        }
        Ok(txn)
    }
}

impl CatalogStore for SqliteDatabase {
    async fn create_provider(&self, provider: NewProvider) -> Result<Provider, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let provider = providers::insert_provider(&provider, &mut conn).await?;
        info!("🗃️ Created provider {} ({})", provider.id, provider.name);
        Ok(provider)
    }

    async fn fetch_provider(&self, provider_id: i64) -> Result<Option<Provider>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        providers::fetch_provider_by_id(provider_id, &mut conn).await
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        providers::fetch_providers(&mut conn).await
    }

    async fn update_provider(&self, provider_id: i64, update: UpdateProvider) -> Result<Provider, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let provider = providers::update_provider(provider_id, update, &mut conn)
            .await?
            .ok_or(CatalogError::ProviderNotFound(provider_id))?;
        Ok(provider)
    }

    async fn delete_provider(&self, provider_id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        let order_count = providers::count_orders_for_provider(provider_id, &mut tx).await?;
        if order_count > 0 {
            return Err(CatalogError::HasOrders { provider_id, order_count });
        }
        services::delete_all_for_provider(provider_id, &mut tx).await?;
        if !providers::delete_provider(provider_id, &mut tx).await? {
            return Err(CatalogError::ProviderNotFound(provider_id));
        }
        tx.commit().await?;
        info!("🗃️ Deleted provider {provider_id} and its services");
        Ok(())
    }

    async fn reconcile_services(
        &self,
        provider_id: i64,
        upserts: &[ServiceUpsert],
    ) -> Result<SyncOutcome, CatalogError> {
        let mut tx = self.pool.begin().await?;
        providers::fetch_provider_by_id(provider_id, &mut tx)
            .await?
            .ok_or(CatalogError::ProviderNotFound(provider_id))?;
        let mut outcome = SyncOutcome::default();
        for upsert in upserts {
            if services::upsert_service(provider_id, upsert, &mut tx).await? {
                outcome.created += 1;
            } else {
                outcome.updated += 1;
            }
        }
        // An empty snapshot never wipes the catalog.
        if !upserts.is_empty() {
            let keep = upserts.iter().map(|u| u.service_id.clone()).collect::<Vec<String>>();
            outcome.deleted = services::delete_services_not_in(provider_id, &keep, &mut tx).await?;
        }
        providers::touch_last_sync(provider_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🔄️ Reconciled catalog for provider {provider_id}: {} created, {} updated, {} deleted",
            outcome.created, outcome.updated, outcome.deleted
        );
        Ok(outcome)
    }

    async fn services_for_provider(&self, provider_id: i64) -> Result<Vec<Service>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        services::fetch_services_for_provider(provider_id, &mut conn).await
    }

    async fn set_provider_balance(
        &self,
        provider_id: i64,
        balance: Money,
        currency: &str,
    ) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        providers::set_balance(provider_id, balance, currency, &mut conn).await
    }

    async fn mark_verification(&self, provider_id: i64, status: VerificationStatus) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        providers::mark_verification(provider_id, status, &mut conn).await
    }

    async fn provider_stats(&self, provider_id: i64) -> Result<ProviderStats, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let provider = providers::fetch_provider_by_id(provider_id, &mut conn)
            .await?
            .ok_or(CatalogError::ProviderNotFound(provider_id))?;
        let (total_services, active_services) = services::count_services(provider_id, &mut conn).await?;
        let (total_orders, completed_orders, total_revenue, total_cost) =
            orders::order_totals_for_provider(provider_id, &mut conn).await?;
        Ok(ProviderStats {
            total_services,
            active_services,
            total_orders,
            completed_orders,
            total_revenue,
            total_cost,
            balance: provider.balance,
        })
    }
}

impl OrderStore for SqliteDatabase {
    async fn fetch_active_service(&self, service_id: i64) -> Result<Option<(Service, Provider)>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        services::fetch_active_service_with_provider(service_id, &mut conn).await.map_err(catalog_to_db)
    }

    async fn record_fulfilled_order(&self, order: FulfilledOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let stored = orders::insert_order(&order, &mut tx).await?;
        transactions::link_transaction_to_order(order.debit_txn_id, stored.id, &mut tx)
            .await
            .map_err(OrderFlowError::from)?;
        users::add_total_spent(order.user_id, order.charge, &mut tx).await.map_err(OrderFlowError::from)?;
        tx.commit().await?;
        debug!(
            "🛒️ Recorded order {} (upstream id {}) for user {}: charge {}, cost {}",
            stored.id, order.provider_order_id, order.user_id, order.charge, order.cost
        );
        Ok(stored)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(order_id, &mut conn).await
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(order_id, status, &mut conn).await
    }
}

impl SettingsStore for SqliteDatabase {
    async fn fetch_setting(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        settings::fetch_setting(key, &mut conn).await
    }

    async fn upsert_setting(&self, key: &str, value: &str, description: Option<&str>) -> Result<(), SettingsError> {
        let mut conn = self.pool.acquire().await?;
        settings::upsert_setting(key, value, description, &mut conn).await
    }
}

// Catalog queries reused by the order flow report their failures in the order flow's vocabulary.
fn catalog_to_db(e: CatalogError) -> OrderFlowError {
    OrderFlowError::DatabaseError(e.to_string())
}
