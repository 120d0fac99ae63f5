use std::{collections::HashMap, sync::Arc};

use log::*;
use smm_common::{helpers::parse_boolean_flag, Money};
use tokio::sync::RwLock;

use crate::traits::{SettingsError, SettingsStore};

pub const BONUS_ENABLED_KEY: &str = "bonus.enabled";
pub const BONUS_AMOUNT_KEY: &str = "bonus.registration_amount";
pub const BONUS_THRESHOLD_KEY: &str = "bonus.unlock_threshold";

/// The welcome-bonus policy knobs, with their out-of-the-box values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusConfig {
    pub enabled: bool,
    pub registration_amount: Money,
    pub unlock_threshold: Money,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self { enabled: true, registration_amount: Money::from_units(5000), unlock_threshold: Money::from_units(10_000) }
    }
}

/// Typed access to the key/value settings store, with a per-key read-through cache.
///
/// The cache is write-through: `set` updates it in the same call, so a read after a write in the same process
/// observes the new value. Writes from another process are only picked up for keys this process has not cached yet.
pub struct SettingsApi<B> {
    db: B,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl<B: Clone> Clone for SettingsApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), cache: Arc::clone(&self.cache) }
    }
}

impl<B> SettingsApi<B>
where B: SettingsStore
{
    pub fn new(db: B) -> Self {
        Self { db, cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        if let Some(value) = self.cache.read().await.get(key) {
            return Ok(Some(value.clone()));
        }
        let value = self.db.fetch_setting(key).await?;
        if let Some(value) = &value {
            self.cache.write().await.insert(key.to_string(), value.clone());
        }
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str, description: Option<&str>) -> Result<(), SettingsError> {
        self.db.upsert_setting(key, value, description).await?;
        self.cache.write().await.insert(key.to_string(), value.to_string());
        debug!("⚙️ Setting {key} updated");
        Ok(())
    }

    /// The current bonus policy. Missing or malformed values fall back to the defaults, with a log line for the
    /// malformed case.
    pub async fn bonus_config(&self) -> Result<BonusConfig, SettingsError> {
        let defaults = BonusConfig::default();
        let enabled = parse_boolean_flag(self.get(BONUS_ENABLED_KEY).await?.as_deref(), defaults.enabled);
        let registration_amount = self.money_or(BONUS_AMOUNT_KEY, defaults.registration_amount).await?;
        let unlock_threshold = self.money_or(BONUS_THRESHOLD_KEY, defaults.unlock_threshold).await?;
        Ok(BonusConfig { enabled, registration_amount, unlock_threshold })
    }

    pub async fn update_bonus_config(&self, config: BonusConfig) -> Result<(), SettingsError> {
        self.set(BONUS_ENABLED_KEY, if config.enabled { "1" } else { "0" }, None).await?;
        self.set(BONUS_AMOUNT_KEY, &config.registration_amount.to_string(), None).await?;
        self.set(BONUS_THRESHOLD_KEY, &config.unlock_threshold.to_string(), None).await?;
        Ok(())
    }

    async fn money_or(&self, key: &str, default: Money) -> Result<Money, SettingsError> {
        let value = match self.get(key).await? {
            Some(v) => v,
            None => return Ok(default),
        };
        match value.parse::<Money>() {
            Ok(amount) => Ok(amount),
            Err(e) => {
                warn!("⚙️ Setting {key} holds an unparseable amount ({value}): {e}. Falling back to {default}.");
                Ok(default)
            },
        }
    }
}
