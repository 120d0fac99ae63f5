use log::*;
use smm_common::Money;

use crate::{
    api::SettingsApi,
    db_types::{NewUser, TransactionType, TxnReference, User, WalletTransaction},
    traits::{LedgerError, SettingsStore, WalletLedger},
};

/// A user's wallet as shown on their dashboard.
#[derive(Debug, Clone)]
pub struct WalletSummary {
    pub user_id: i64,
    pub balance: Money,
    pub bonus_balance: Money,
    pub total_balance: Money,
    pub total_spent: Money,
    pub bonus_awarded: bool,
    pub bonus_unlocked: bool,
    /// How far lifetime spend has progressed towards the unlock threshold, clamped to 0..=100.
    pub unlock_progress_percent: u8,
}

/// The wallet API: validated balance movements over a [`WalletLedger`] backend.
pub struct WalletApi<B> {
    db: B,
    settings: SettingsApi<B>,
}

impl<B: Clone> Clone for WalletApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), settings: self.settings.clone() }
    }
}

impl<B> WalletApi<B>
where B: WalletLedger + SettingsStore
{
    pub fn new(db: B, settings: SettingsApi<B>) -> Self {
        Self { db, settings }
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User, LedgerError> {
        self.db.create_user(user).await
    }

    pub async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, LedgerError> {
        self.db.fetch_user(user_id).await
    }

    /// Adds funds to the spendable balance. `amount` must be strictly positive.
    pub async fn credit(
        &self,
        user_id: i64,
        amount: Money,
        description: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<WalletTransaction, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.db.credit(user_id, amount, description, metadata).await
    }

    /// Removes funds from the spendable balance. `amount` must be strictly positive and covered by the balance.
    pub async fn debit(
        &self,
        user_id: i64,
        amount: Money,
        description: &str,
        reference: TxnReference,
    ) -> Result<WalletTransaction, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.db.debit(user_id, amount, description, reference).await
    }

    /// Signed manual correction. Unlike [`Self::credit`] and [`Self::debit`] the amount may be negative, and no
    /// sufficiency check applies.
    pub async fn admin_adjust(&self, user_id: i64, amount: Money, reason: &str) -> Result<WalletTransaction, LedgerError> {
        if amount == Money::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        warn!("🏦️ Admin adjustment requested for user {user_id}: {amount} ({reason})");
        self.db.admin_adjust(user_id, amount, reason).await
    }

    pub async fn history(
        &self,
        user_id: i64,
        txn_type: Option<TransactionType>,
    ) -> Result<Vec<WalletTransaction>, LedgerError> {
        self.db.transactions_for_user(user_id, txn_type).await
    }

    pub async fn wallet_summary(&self, user_id: i64) -> Result<WalletSummary, LedgerError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(LedgerError::UserNotFound(user_id))?;
        let threshold = self
            .settings
            .bonus_config()
            .await
            .map_err(|e| LedgerError::DatabaseError(e.to_string()))?
            .unlock_threshold;
        let unlock_progress_percent = unlock_progress(&user, threshold);
        Ok(WalletSummary {
            user_id: user.id,
            balance: user.balance,
            bonus_balance: user.bonus_balance,
            total_balance: user.total_balance(),
            total_spent: user.total_spent,
            bonus_awarded: user.bonus_awarded,
            bonus_unlocked: user.bonus_unlocked,
            unlock_progress_percent,
        })
    }
}

fn unlock_progress(user: &User, threshold: Money) -> u8 {
    if user.bonus_unlocked {
        return 100;
    }
    if !user.bonus_awarded || !threshold.is_positive() {
        return 0;
    }
    let percent = (user.total_spent.value() as i128 * 100 / threshold.value() as i128).clamp(0, 100);
    percent as u8
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::UserRole;
    use chrono::Utc;

    fn user_with(total_spent: Money, awarded: bool, unlocked: bool) -> User {
        User {
            id: 1,
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: UserRole::User,
            balance: Money::ZERO,
            bonus_balance: Money::ZERO,
            total_spent,
            bonus_awarded: awarded,
            bonus_unlocked: unlocked,
            bonus_unlocked_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unlock_progress_is_clamped() {
        let threshold = Money::from_units(10_000);
        assert_eq!(unlock_progress(&user_with(Money::ZERO, true, false), threshold), 0);
        assert_eq!(unlock_progress(&user_with(Money::from_units(2_500), true, false), threshold), 25);
        assert_eq!(unlock_progress(&user_with(Money::from_units(50_000), true, false), threshold), 100);
        // No bonus means no progress bar, regardless of spend.
        assert_eq!(unlock_progress(&user_with(Money::from_units(50_000), false, false), threshold), 0);
        // Already unlocked always reads as complete.
        assert_eq!(unlock_progress(&user_with(Money::ZERO, true, true), threshold), 100);
    }
}
