use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use smm_common::{Money, Secret};
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------      UserRole     -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    User,
}

impl Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "Admin"),
            UserRole::User => write!(f, "User"),
        }
    }
}

impl FromStr for UserRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "User" => Ok(Self::User),
            s => Err(ConversionError("user role", s.to_string())),
        }
    }
}

//--------------------------------------        User       -----------------------------------------------------------
/// A customer identity plus wallet snapshot.
///
/// The balance fields are mutated exclusively by the ledger and bonus store; nothing else writes them.
/// `bonus_awarded` and `bonus_unlocked` only ever transition false to true.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub role: UserRole,
    /// Spendable funds. Never driven below zero by the ledger.
    pub balance: Money,
    /// Promotional funds. Locked until `bonus_unlocked`, at which point they move into `balance` and this reads zero.
    pub bonus_balance: Money,
    /// Lifetime sum of successful order charges. Monotonically non-decreasing.
    pub total_spent: Money,
    pub bonus_awarded: bool,
    pub bonus_unlocked: bool,
    pub bonus_unlocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn can_afford(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    /// Spendable plus locked bonus funds, as shown in the wallet summary.
    pub fn total_balance(&self) -> Money {
        self.balance + self.bonus_balance
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn new<S: Into<String>>(user_name: S, email: S) -> Self {
        Self { user_name: user_name.into(), email: email.into(), password_hash: String::new(), role: UserRole::User }
    }
}

//--------------------------------------  TransactionType  -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionType {
    /// Increases `balance`.
    Credit,
    /// Decreases `balance`. Subject to the sufficiency check.
    Debit,
    /// Increases `bonus_balance`. The before/after snapshots are taken on the bonus balance.
    BonusAward,
    /// Moves the whole bonus balance into `balance`. Snapshots are taken on the main balance.
    BonusUnlock,
    /// Signed manual correction on `balance`, no sufficiency check.
    AdminAdjustment,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Credit => write!(f, "Credit"),
            TransactionType::Debit => write!(f, "Debit"),
            TransactionType::BonusAward => write!(f, "BonusAward"),
            TransactionType::BonusUnlock => write!(f, "BonusUnlock"),
            TransactionType::AdminAdjustment => write!(f, "AdminAdjustment"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Credit" => Ok(Self::Credit),
            "Debit" => Ok(Self::Debit),
            "BonusAward" => Ok(Self::BonusAward),
            "BonusUnlock" => Ok(Self::BonusUnlock),
            "AdminAdjustment" => Ok(Self::AdminAdjustment),
            s => Err(ConversionError("transaction type", s.to_string())),
        }
    }
}

//--------------------------------------   TxnReference    -----------------------------------------------------------
/// What a wallet transaction paid for. A closed union rather than a free-form (type, id) pair, so the set of
/// referenceable entities is checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnReference {
    None,
    Order(i64),
}

impl TxnReference {
    pub fn into_parts(self) -> (Option<&'static str>, Option<i64>) {
        match self {
            TxnReference::None => (None, None),
            TxnReference::Order(id) => (Some("order"), Some(id)),
        }
    }

    pub fn from_parts(kind: Option<String>, id: Option<i64>) -> Self {
        match (kind.as_deref(), id) {
            (Some("order"), Some(id)) => TxnReference::Order(id),
            (Some(other), _) => {
                error!("Unknown transaction reference kind '{other}' in the database. Treating as unreferenced.");
                TxnReference::None
            },
            _ => TxnReference::None,
        }
    }
}

//-------------------------------------- WalletTransaction -----------------------------------------------------------
/// Immutable audit record of one balance mutation.
///
/// Invariant: `balance_after == balance_before ± amount` for the balance field the type operates on. Rows are created
/// once and never mutated, with one exception: order fulfillment links the funding debit to the order it created.
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub txn_type: TransactionType,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub description: String,
    pub reference: TxnReference,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for WalletTransaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let reference = TxnReference::from_parts(row.try_get("reference_kind")?, row.try_get("reference_id")?);
        let metadata: Option<sqlx::types::Json<serde_json::Value>> = row.try_get("metadata")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            txn_type: row.try_get("txn_type")?,
            amount: row.try_get("amount")?,
            balance_before: row.try_get("balance_before")?,
            balance_after: row.try_get("balance_after")?,
            description: row.try_get("description")?,
            reference,
            metadata: metadata.map(|m| m.0),
            created_at: row.try_get("created_at")?,
        })
    }
}

//-------------------------------------- VerificationStatus ----------------------------------------------------------
/// One-way from `Pending`. A provider that failed verification stays failed until an operator intervenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Failed,
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "Pending"),
            VerificationStatus::Verified => write!(f, "Verified"),
            VerificationStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Verified" => Ok(Self::Verified),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError("verification status", s.to_string())),
        }
    }
}

//--------------------------------------     Provider      -----------------------------------------------------------
/// An upstream panel credential plus pricing config. The API key is wrapped in [`Secret`] and never appears in logs
/// or serialized output.
#[derive(Debug, Clone)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub api_url: String,
    pub api_key: Secret<String>,
    pub is_active: bool,
    pub verification_status: VerificationStatus,
    pub priority: i64,
    /// Percent added to the provider's raw rate to compute the customer rate.
    pub markup_percentage: Money,
    /// Last known upstream account balance. Informational only.
    pub balance: Money,
    pub currency: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Provider {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let api_key: String = row.try_get("api_key")?;
        let metadata: Option<sqlx::types::Json<serde_json::Value>> = row.try_get("metadata")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            api_url: row.try_get("api_url")?,
            api_key: Secret::new(api_key),
            is_active: row.try_get("is_active")?,
            verification_status: row.try_get("verification_status")?,
            priority: row.try_get("priority")?,
            markup_percentage: row.try_get("markup_percentage")?,
            balance: row.try_get("balance")?,
            currency: row.try_get("currency")?,
            last_sync_at: row.try_get("last_sync_at")?,
            metadata: metadata.map(|m| m.0),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub api_url: String,
    pub api_key: Secret<String>,
    pub is_active: bool,
    pub priority: i64,
    pub markup_percentage: Money,
    pub metadata: Option<serde_json::Value>,
}

impl NewProvider {
    /// The default markup applied when an operator does not specify one.
    pub const DEFAULT_MARKUP_PERCENT: i64 = 25;

    pub fn new<S: Into<String>>(name: S, api_url: S, api_key: Secret<String>) -> Self {
        Self {
            name: name.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
            is_active: true,
            priority: 0,
            markup_percentage: Money::from_units(Self::DEFAULT_MARKUP_PERCENT),
            metadata: None,
        }
    }

    pub fn with_markup(mut self, percent: Money) -> Self {
        self.markup_percentage = percent;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

//--------------------------------------      Service      -----------------------------------------------------------
/// One catalog entry, scoped to exactly one provider and uniquely keyed by (provider_id, service_id).
///
/// Created and updated only by catalog reconciliation; user-facing flows never write here.
#[derive(Debug, Clone, FromRow)]
pub struct Service {
    pub id: i64,
    pub provider_id: i64,
    /// The provider-native service id.
    pub service_id: String,
    pub name: String,
    pub service_type: String,
    pub category: Option<String>,
    /// The provider's raw per-1000 rate: what we pay.
    pub cost: Money,
    /// The customer-facing per-1000 rate: `cost` with the provider markup applied.
    pub rate: Money,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub is_active: bool,
    pub description: Option<String>,
    /// The raw upstream payload, retained for forward compatibility.
    pub metadata: Option<sqlx::types::Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    OrderStatus    -----------------------------------------------------------
/// Provider-driven fulfillment state. Status polling updates these out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Canceled,
    Partial,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Canceled => write!(f, "Canceled"),
            OrderStatus::Partial => write!(f, "Partial"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Canceled" => Ok(Self::Canceled),
            "Partial" => Ok(Self::Partial),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------       Order       -----------------------------------------------------------
/// One placed purchase. Created exactly once per successful debit-then-provider-call sequence and immutable
/// thereafter, except for status/remains updates from status polling.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub provider_id: i64,
    /// Local `services.id` of the catalog entry this order was placed against.
    pub service_id: i64,
    pub provider_order_id: Option<String>,
    pub link: String,
    pub quantity: i64,
    /// Debited from the customer: `service.rate / 1000 * quantity`.
    pub charge: Money,
    /// Owed to the provider: `service.cost / 1000 * quantity`. Computed from the local catalog, never from the
    /// gateway response, so profit accounting stays deterministic.
    pub cost: Money,
    pub start_count: Option<i64>,
    pub remains: Option<i64>,
    pub status: OrderStatus,
    pub request_data: Option<sqlx::types::Json<serde_json::Value>>,
    pub response_data: Option<sqlx::types::Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
