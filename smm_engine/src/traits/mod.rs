//! Interface contracts between the engine's business logic and its storage backend.
//!
//! The split mirrors the ownership rules of the system:
//! * [`WalletLedger`] and [`BonusStore`] are the only surfaces allowed to mutate a user's balance fields and to append
//!   wallet transaction rows.
//! * [`CatalogStore`] is the only surface allowed to write a provider's service set.
//! * [`OrderStore`] persists fulfilled orders and their side effects (transaction link, total-spent bump) atomically.
//! * [`SettingsStore`] backs the key/value configuration service.
//! * [`PanelGateway`] abstracts the upstream panel client so fulfillment and sync flows can be exercised against
//!   stub providers in tests.
mod catalog;
mod gateway;
mod orders;
mod settings;
mod wallet;

pub use catalog::{CatalogError, CatalogStore, ProviderStats, ServiceUpsert, SyncOutcome, UpdateProvider};
pub use gateway::{live_gateway, GatewayFactory, PanelGateway};
pub use orders::{FulfilledOrder, OrderFlowError, OrderStore};
pub use settings::{SettingsError, SettingsStore};
pub use wallet::{BonusStore, LedgerError, WalletLedger};
