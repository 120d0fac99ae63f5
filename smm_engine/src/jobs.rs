//! Background provider jobs: credential verification and catalog sync.
//!
//! Both jobs wrap a [`CatalogApi`] operation in a small retry budget with increasing backoff. Retries exist for
//! transient panel outages; a provider that stays unreachable across the whole budget is a configuration problem,
//! so verification marks it `Failed` and stops rather than retrying forever.
//!
//! Callers are expected to run at most one job per provider at a time. Jobs for different providers are independent
//! and can run concurrently.
use std::time::Duration;

use log::*;

use crate::{
    api::CatalogApi,
    db_types::VerificationStatus,
    traits::{CatalogError, CatalogStore, GatewayFactory, SyncOutcome},
};

/// Retry timing for the provider jobs. A job makes one more attempt than it has delays; the default is the
/// production schedule of three attempts spaced 30s and 60s apart. Tests inject millisecond delays.
#[derive(Clone, Debug)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self { delays: vec![Duration::from_secs(30), Duration::from_secs(60)] }
    }
}

impl RetrySchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn attempts(&self) -> usize {
        self.delays.len() + 1
    }

    fn delay_after(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt - 1).copied()
    }
}

/// Verifies a provider's stored credentials, retrying on failure. Success stores the `Verified` status and a balance
/// snapshot and triggers a first catalog sync. Exhausting the budget marks the provider `Failed`, which is durable
/// until an operator intervenes.
pub async fn run_verification<B, F>(
    catalog: &CatalogApi<B, F>,
    provider_id: i64,
    schedule: &RetrySchedule,
) -> VerificationStatus
where
    B: CatalogStore,
    F: GatewayFactory,
{
    info!("🛠️ Verification job started for provider {provider_id}");
    let budget = schedule.attempts();
    for attempt in 1..=budget {
        match catalog.verify_provider(provider_id).await {
            Ok(status) => {
                info!("🛠️ Provider {provider_id} verified on attempt {attempt}");
                // A verified provider is useless without a catalog, so sync right away.
                let _ = run_catalog_sync(catalog, provider_id, schedule).await;
                return status;
            },
            Err(CatalogError::ProviderNotFound(_)) => {
                warn!("🛠️ Provider {provider_id} vanished while its verification job was queued. Giving up.");
                return VerificationStatus::Failed;
            },
            Err(e) => {
                warn!("🛠️ Verification attempt {attempt}/{budget} for provider {provider_id} failed: {e}");
                if let Some(delay) = schedule.delay_after(attempt) {
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }
    error!("🛠️ Provider {provider_id} failed verification after {budget} attempts. Marking it Failed.");
    if let Err(e) = catalog.mark_verification_failed(provider_id).await {
        error!("🛠️ Could not record the verification failure for provider {provider_id}: {e}");
    }
    VerificationStatus::Failed
}

/// Syncs a provider's catalog, retrying on failure with the same budget as verification. Exhaustion leaves the
/// existing catalog untouched; the next scheduled sync starts a fresh budget.
pub async fn run_catalog_sync<B, F>(
    catalog: &CatalogApi<B, F>,
    provider_id: i64,
    schedule: &RetrySchedule,
) -> Result<SyncOutcome, CatalogError>
where
    B: CatalogStore,
    F: GatewayFactory,
{
    info!("🛠️ Catalog sync job started for provider {provider_id}");
    let budget = schedule.attempts();
    let mut last_error = None;
    for attempt in 1..=budget {
        match catalog.sync_provider(provider_id).await {
            Ok(outcome) => {
                info!("🛠️ Catalog sync for provider {provider_id} succeeded on attempt {attempt}");
                return Ok(outcome);
            },
            Err(e @ CatalogError::ProviderNotFound(_)) => return Err(e),
            Err(e) => {
                warn!("🛠️ Catalog sync attempt {attempt}/{budget} for provider {provider_id} failed: {e}");
                last_error = Some(e);
                if let Some(delay) = schedule.delay_after(attempt) {
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }
    error!("🛠️ Catalog sync for provider {provider_id} exhausted its retry budget");
    Err(last_error.unwrap_or_else(|| CatalogError::DatabaseError("sync failed without an error".to_string())))
}
