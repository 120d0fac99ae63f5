use serde::{Deserialize, Serialize};
use smm_common::Money;

/// Fired once per user, when the welcome bonus lands in their locked balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusAwardedEvent {
    pub user_id: i64,
    pub amount: Money,
}

impl BonusAwardedEvent {
    pub fn new(user_id: i64, amount: Money) -> Self {
        Self { user_id, amount }
    }
}

/// Fired once per user, when their lifetime spend crosses the unlock threshold and the locked bonus moves into the
/// spendable balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusUnlockedEvent {
    pub user_id: i64,
    pub amount: Money,
}

impl BonusUnlockedEvent {
    pub fn new(user_id: i64, amount: Money) -> Self {
        Self { user_id, amount }
    }
}
