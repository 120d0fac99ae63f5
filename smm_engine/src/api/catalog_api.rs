use std::{collections::HashMap, sync::Arc};

use log::*;
use tokio::sync::RwLock;

use crate::{
    db_types::{NewProvider, Provider, Service, VerificationStatus},
    traits::{
        CatalogError,
        CatalogStore,
        GatewayFactory,
        PanelGateway,
        ProviderStats,
        ServiceUpsert,
        SyncOutcome,
        UpdateProvider,
    },
};

/// Provider and catalog management: sync, verification and the cached customer-facing service view.
///
/// Generic over the gateway factory so the sync and verification flows can run against stub panels in tests.
pub struct CatalogApi<B, F> {
    db: B,
    factory: F,
    service_cache: Arc<RwLock<HashMap<i64, Arc<Vec<Service>>>>>,
}

impl<B: Clone, F: Clone> Clone for CatalogApi<B, F> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), factory: self.factory.clone(), service_cache: Arc::clone(&self.service_cache) }
    }
}

impl<B, F> CatalogApi<B, F>
where
    B: CatalogStore,
    F: GatewayFactory,
{
    pub fn new(db: B, factory: F) -> Self {
        Self { db, factory, service_cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn create_provider(&self, provider: NewProvider) -> Result<Provider, CatalogError> {
        self.db.create_provider(provider).await
    }

    pub async fn fetch_provider(&self, provider_id: i64) -> Result<Provider, CatalogError> {
        self.db.fetch_provider(provider_id).await?.ok_or(CatalogError::ProviderNotFound(provider_id))
    }

    pub async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError> {
        self.db.list_providers().await
    }

    pub async fn update_provider(&self, provider_id: i64, update: UpdateProvider) -> Result<Provider, CatalogError> {
        let provider = self.db.update_provider(provider_id, update).await?;
        self.invalidate(provider_id).await;
        Ok(provider)
    }

    /// Deletes a provider and its catalog. Refused while any order still references the provider; deactivate with
    /// [`Self::update_provider`] instead to keep the history intact.
    pub async fn delete_provider(&self, provider_id: i64) -> Result<(), CatalogError> {
        self.db.delete_provider(provider_id).await?;
        self.invalidate(provider_id).await;
        Ok(())
    }

    /// Pulls the provider's live service list and reconciles the local catalog against it.
    ///
    /// A gateway failure aborts before anything is written. Records without a usable native id are skipped and
    /// reported in [`SyncOutcome::errors`]; services the provider no longer lists are deleted. After a successful
    /// reconciliation the provider's upstream balance is refreshed on a best-effort basis.
    pub async fn sync_provider(&self, provider_id: i64) -> Result<SyncOutcome, CatalogError> {
        let provider = self.fetch_provider(provider_id).await?;
        info!("🔄️ Syncing services for provider {provider_id} ({})", provider.name);
        let gateway = self.factory.gateway_for(&provider)?;
        let raw_services = gateway.list_services().await?;
        debug!("🔄️ Provider {provider_id} lists {} services", raw_services.len());

        let mut errors = Vec::new();
        let mut upserts = Vec::with_capacity(raw_services.len());
        for raw in raw_services {
            let Some(service_id) = raw.service_id() else {
                warn!("🔄️ Provider {provider_id} sent a service entry without a usable id. Skipping it.");
                errors.push(format!("Skipped a service entry without a usable id: {}", raw.raw()));
                continue;
            };
            let cost = raw.rate();
            let rate = cost.with_markup(provider.markup_percentage);
            upserts.push(ServiceUpsert {
                service_id,
                name: raw.name(),
                service_type: raw.service_type(),
                category: raw.category(),
                cost,
                rate,
                min_quantity: raw.min(),
                max_quantity: raw.max(),
                description: raw.description(),
                metadata: raw.into_raw(),
            });
        }

        let mut outcome = self.db.reconcile_services(provider_id, &upserts).await?;
        outcome.errors = errors;
        self.invalidate(provider_id).await;

        // Balance refresh rides along with the sync but never fails it.
        match gateway.balance().await {
            Ok(balance) => {
                if let Err(e) = self.db.set_provider_balance(provider_id, balance.balance, &balance.currency).await {
                    warn!("🔄️ Could not store the balance snapshot for provider {provider_id}: {e}");
                }
            },
            Err(e) => warn!("🔄️ Could not refresh the balance of provider {provider_id}: {e}"),
        }

        info!(
            "🔄️ Sync complete for provider {provider_id}: {} created, {} updated, {} deleted, {} skipped",
            outcome.created,
            outcome.updated,
            outcome.deleted,
            outcome.errors.len()
        );
        Ok(outcome)
    }

    /// Probes the provider's balance endpoint to prove the stored credentials work. On success the provider is
    /// marked `Verified` and the balance snapshot is stored.
    pub async fn verify_provider(&self, provider_id: i64) -> Result<VerificationStatus, CatalogError> {
        let provider = self.fetch_provider(provider_id).await?;
        let gateway = self.factory.gateway_for(&provider)?;
        let balance = gateway.balance().await?;
        self.db.mark_verification(provider_id, VerificationStatus::Verified).await?;
        self.db.set_provider_balance(provider_id, balance.balance, &balance.currency).await?;
        info!("✅️ Provider {provider_id} verified. Balance: {} {}", balance.balance, balance.currency);
        Ok(VerificationStatus::Verified)
    }

    /// Records a terminal verification failure. Only the retry-exhausted verification job calls this.
    pub async fn mark_verification_failed(&self, provider_id: i64) -> Result<(), CatalogError> {
        self.db.mark_verification(provider_id, VerificationStatus::Failed).await
    }

    /// The provider's catalog, served from the in-process cache. Sync and provider updates invalidate the entry.
    pub async fn services(&self, provider_id: i64) -> Result<Arc<Vec<Service>>, CatalogError> {
        if let Some(services) = self.service_cache.read().await.get(&provider_id) {
            return Ok(Arc::clone(services));
        }
        let services = Arc::new(self.db.services_for_provider(provider_id).await?);
        self.service_cache.write().await.insert(provider_id, Arc::clone(&services));
        Ok(services)
    }

    pub async fn provider_stats(&self, provider_id: i64) -> Result<ProviderStats, CatalogError> {
        self.db.provider_stats(provider_id).await
    }

    async fn invalidate(&self, provider_id: i64) {
        self.service_cache.write().await.remove(&provider_id);
    }
}
