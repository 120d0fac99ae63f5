use log::trace;
use smm_common::Money;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{TransactionType, TxnReference, WalletTransaction},
    sqlite::db::users,
    traits::LedgerError,
};

/// Appends one ledger row. The balance mutation must already have happened in the same transaction; this only
/// records the snapshots the caller observed.
pub async fn insert_transaction(
    user_id: i64,
    txn_type: TransactionType,
    amount: Money,
    balance_before: Money,
    balance_after: Money,
    description: &str,
    reference: TxnReference,
    metadata: Option<serde_json::Value>,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, LedgerError> {
    let (reference_kind, reference_id) = reference.into_parts();
    let metadata = metadata.map(sqlx::types::Json);
    let txn = sqlx::query_as::<_, WalletTransaction>(
        r#"INSERT INTO wallet_transactions
           (user_id, txn_type, amount, balance_before, balance_after, description, reference_kind, reference_id,
            metadata)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(txn_type.to_string())
    .bind(amount)
    .bind(balance_before)
    .bind(balance_after)
    .bind(description)
    .bind(reference_kind)
    .bind(reference_id)
    .bind(metadata)
    .fetch_one(conn)
    .await?;
    Ok(txn)
}

/// Adds `amount` to the user's balance and records the `Credit` row. Must run inside a transaction.
pub async fn credit(
    user_id: i64,
    amount: Money,
    description: &str,
    metadata: Option<serde_json::Value>,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, LedgerError> {
    let balance_after: Option<Money> = sqlx::query_scalar(
        "UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let balance_after = balance_after.ok_or(LedgerError::UserNotFound(user_id))?;
    let balance_before = balance_after - amount;
    insert_transaction(
        user_id,
        TransactionType::Credit,
        amount,
        balance_before,
        balance_after,
        description,
        TxnReference::None,
        metadata,
        conn,
    )
    .await
}

/// Subtracts `amount` from the user's balance, guarded by the sufficiency check, and records the `Debit` row.
/// Must run inside a transaction.
///
/// The guard lives in the `WHERE` clause of the update itself, so two concurrent debits can never both succeed
/// against a balance that only covers one of them.
pub async fn debit(
    user_id: i64,
    amount: Money,
    description: &str,
    reference: TxnReference,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, LedgerError> {
    let balance_after: Option<Money> = sqlx::query_scalar(
        "UPDATE users SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
         WHERE id = $2 AND balance >= $1 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let balance_after = match balance_after {
        Some(b) => b,
        None => {
            // Guarded update matched nothing. Distinguish a missing user from an underfunded one.
            let user = users::fetch_user_by_id(user_id, conn).await?.ok_or(LedgerError::UserNotFound(user_id))?;
            return Err(LedgerError::InsufficientFunds { available: user.balance, requested: amount });
        },
    };
    let balance_before = balance_after + amount;
    insert_transaction(
        user_id,
        TransactionType::Debit,
        amount,
        balance_before,
        balance_after,
        description,
        reference,
        None,
        conn,
    )
    .await
}

/// Applies a signed correction with no sufficiency check and records the `AdminAdjustment` row. Must run inside a
/// transaction.
pub async fn admin_adjust(
    user_id: i64,
    amount: Money,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, LedgerError> {
    let balance_after: Option<Money> = sqlx::query_scalar(
        "UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let balance_after = balance_after.ok_or(LedgerError::UserNotFound(user_id))?;
    let balance_before = balance_after - amount;
    insert_transaction(
        user_id,
        TransactionType::AdminAdjustment,
        amount,
        balance_before,
        balance_after,
        reason,
        TxnReference::None,
        None,
        conn,
    )
    .await
}

/// Grants the one-time welcome bonus. The award flag in the `WHERE` clause makes the operation idempotent: a user
/// who already holds (or held) a bonus is left untouched and `None` is returned. Must run inside a transaction.
pub async fn award_welcome_bonus(
    user_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTransaction>, LedgerError> {
    let bonus_after: Option<Money> = sqlx::query_scalar(
        "UPDATE users SET bonus_balance = $1, bonus_awarded = 1, updated_at = CURRENT_TIMESTAMP
         WHERE id = $2 AND bonus_awarded = 0 RETURNING bonus_balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(bonus_after) = bonus_after else {
        users::fetch_user_by_id(user_id, conn).await?.ok_or(LedgerError::UserNotFound(user_id))?;
        trace!("🎁️ User {user_id} has already received the welcome bonus. Nothing to do.");
        return Ok(None);
    };
    let txn = insert_transaction(
        user_id,
        TransactionType::BonusAward,
        amount,
        bonus_after - amount,
        bonus_after,
        "Welcome bonus",
        TxnReference::None,
        None,
        conn,
    )
    .await?;
    Ok(Some(txn))
}

/// Moves the full locked bonus into the spendable balance once lifetime spend reaches `threshold`. Returns `None`
/// when the user is ineligible (no bonus, already unlocked, or under the threshold). Must run inside a transaction.
///
/// Two statements: the first flips the unlock flag (and is the write that takes the database lock, so the amounts it
/// reports cannot go stale), the second moves the funds.
pub async fn unlock_bonus(
    user_id: i64,
    threshold: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTransaction>, LedgerError> {
    let row: Option<(Money, Money)> = sqlx::query_as(
        "UPDATE users SET bonus_unlocked = 1, bonus_unlocked_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
         WHERE id = $1 AND bonus_awarded = 1 AND bonus_unlocked = 0 AND bonus_balance > 0 AND total_spent >= $2
         RETURNING bonus_balance, balance",
    )
    .bind(user_id)
    .bind(threshold)
    .fetch_optional(&mut *conn)
    .await?;
    let Some((bonus_amount, balance_before)) = row else {
        return Ok(None);
    };
    sqlx::query("UPDATE users SET balance = balance + bonus_balance, bonus_balance = 0 WHERE id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let txn = insert_transaction(
        user_id,
        TransactionType::BonusUnlock,
        bonus_amount,
        balance_before,
        balance_before + bonus_amount,
        "Bonus unlocked",
        TxnReference::None,
        None,
        conn,
    )
    .await?;
    Ok(Some(txn))
}

/// Points a ledger row at the order it funded. The one sanctioned post-hoc edit to a transaction row.
pub async fn link_transaction_to_order(
    txn_id: i64,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query("UPDATE wallet_transactions SET reference_kind = 'order', reference_id = $1 WHERE id = $2")
        .bind(order_id)
        .bind(txn_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Fetches a user's ledger, newest first, optionally narrowed to one transaction type.
pub async fn fetch_transactions(
    user_id: i64,
    txn_type: Option<TransactionType>,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, LedgerError> {
    let mut builder = QueryBuilder::new("SELECT * FROM wallet_transactions WHERE user_id = ");
    builder.push_bind(user_id);
    if let Some(txn_type) = txn_type {
        builder.push(" AND txn_type = ");
        builder.push_bind(txn_type.to_string());
    }
    builder.push(" ORDER BY id DESC");
    trace!("🏦️ Executing query: {}", builder.sql());
    let txns = builder.build_query_as::<WalletTransaction>().fetch_all(conn).await?;
    Ok(txns)
}
