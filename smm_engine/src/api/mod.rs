//! High-level engine APIs, generic over the storage backend.
//!
//! Each API wraps the backend traits with the business rules the storage layer deliberately does not know about:
//! input validation, pricing, bonus policy, compensation on upstream failure and event emission.
mod bonus_api;
mod catalog_api;
mod order_flow_api;
mod settings_api;
mod wallet_api;

pub use bonus_api::{BonusApi, BonusError};
pub use catalog_api::CatalogApi;
pub use order_flow_api::OrderFlowApi;
pub use settings_api::{BonusConfig, SettingsApi};
pub use wallet_api::{WalletApi, WalletSummary};
