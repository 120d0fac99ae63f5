use log::*;
use thiserror::Error;

use crate::{
    api::SettingsApi,
    db_types::WalletTransaction,
    events::{BonusAwardedEvent, BonusUnlockedEvent, EventProducers},
    traits::{BonusStore, LedgerError, SettingsError, SettingsStore},
};

#[derive(Debug, Error)]
pub enum BonusError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// The welcome-bonus policy engine.
///
/// The two operations are safe to call on every triggering event (registration confirmations, each fulfilled order):
/// the one-way flags in the store make repeats no-ops, and an event is only emitted when state actually changed.
pub struct BonusApi<B> {
    db: B,
    settings: SettingsApi<B>,
    producers: EventProducers,
}

impl<B: Clone> Clone for BonusApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), settings: self.settings.clone(), producers: self.producers.clone() }
    }
}

impl<B> BonusApi<B>
where B: BonusStore + SettingsStore
{
    pub fn new(db: B, settings: SettingsApi<B>, producers: EventProducers) -> Self {
        Self { db, settings, producers }
    }

    /// Grants the one-time welcome bonus to a freshly verified user. Returns the bonus transaction, or `None` when
    /// the program is disabled or the user already received it.
    pub async fn award_welcome_bonus(&self, user_id: i64) -> Result<Option<WalletTransaction>, BonusError> {
        let config = self.settings.bonus_config().await?;
        if !config.enabled {
            debug!("🎁️ Bonus program is disabled. No bonus for user {user_id}.");
            return Ok(None);
        }
        let txn = self.db.award_welcome_bonus(user_id, config.registration_amount).await?;
        if let Some(txn) = &txn {
            info!("🎁️ Welcome bonus of {} awarded to user {user_id}", txn.amount);
            for producer in &self.producers.bonus_awarded_producer {
                producer.publish_event(BonusAwardedEvent::new(user_id, txn.amount)).await;
            }
        }
        Ok(txn)
    }

    /// Unlocks the user's bonus if their lifetime spend has reached the configured threshold. Called after every
    /// fulfilled order. Returns the unlock transaction when one happened.
    pub async fn check_and_unlock(&self, user_id: i64) -> Result<Option<WalletTransaction>, BonusError> {
        let config = self.settings.bonus_config().await?;
        let txn = self.db.try_unlock_bonus(user_id, config.unlock_threshold).await?;
        if let Some(txn) = &txn {
            info!("🎁️ Bonus of {} unlocked for user {user_id}", txn.amount);
            for producer in &self.producers.bonus_unlocked_producer {
                producer.publish_event(BonusUnlockedEvent::new(user_id, txn.amount)).await;
            }
        }
        Ok(txn)
    }
}
