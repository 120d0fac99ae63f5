use smm_common::Money;
use thiserror::Error;

use crate::db_types::{NewUser, TransactionType, TxnReference, User, WalletTransaction};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Insufficient funds: balance is {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Money),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The wallet engine: the one component permitted to mutate `balance` / `bonus_balance` / `total_spent` and to write
/// wallet transaction rows.
///
/// Every mutating operation is one atomic unit: re-read the current balance, compute the new one, persist the user
/// row and the transaction row together or not at all. Concurrent debits against the same user never observe the same
/// pre-debit balance.
#[allow(async_fn_in_trait)]
pub trait WalletLedger: Clone {
    /// Creates the identity row. Credentials and session handling live outside the engine.
    async fn create_user(&self, user: NewUser) -> Result<User, LedgerError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, LedgerError>;

    /// Looks a user up by email, the natural key external collaborators hold.
    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError>;

    /// Increments `balance` by `amount` and records a `Credit` transaction.
    async fn credit(
        &self,
        user_id: i64,
        amount: Money,
        description: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<WalletTransaction, LedgerError>;

    /// Decrements `balance` by `amount` and records a `Debit` transaction, optionally linked to the entity it funded.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] when `amount` exceeds the balance at mutation time; in that case
    /// nothing is written.
    async fn debit(
        &self,
        user_id: i64,
        amount: Money,
        description: &str,
        reference: TxnReference,
    ) -> Result<WalletTransaction, LedgerError>;

    /// Signed manual correction: increments for positive amounts, decrements for negative ones, with no sufficiency
    /// check. Records an `AdminAdjustment` transaction.
    async fn admin_adjust(&self, user_id: i64, amount: Money, reason: &str) -> Result<WalletTransaction, LedgerError>;

    async fn transactions_for_user(
        &self,
        user_id: i64,
        txn_type: Option<TransactionType>,
    ) -> Result<Vec<WalletTransaction>, LedgerError>;
}

/// Atomic bonus state transitions, layered under the bonus policy engine.
///
/// Both operations are guarded by the one-way user flags rather than by transaction history, so replayed triggering
/// events are harmless.
#[allow(async_fn_in_trait)]
pub trait BonusStore: Clone {
    /// Sets `bonus_balance = amount` and `bonus_awarded = true`, recording a `BonusAward` transaction, all in one
    /// unit. Returns `None` without writing anything if the award flag is already set.
    async fn award_welcome_bonus(&self, user_id: i64, amount: Money) -> Result<Option<WalletTransaction>, LedgerError>;

    /// If the user has a locked bonus and `total_spent >= threshold`, moves the entire bonus balance into `balance`,
    /// sets `bonus_unlocked = true` with a timestamp and records a `BonusUnlock` transaction, all in one unit.
    /// Returns `None` when nothing is eligible.
    async fn try_unlock_bonus(&self, user_id: i64, threshold: Money) -> Result<Option<WalletTransaction>, LedgerError>;
}
