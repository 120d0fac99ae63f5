//! SMM Reseller Engine
//!
//! The core logic of a social-media-marketing reseller panel: a provider catalog with markup pricing, a two-tier
//! wallet (spendable balance plus an unlockable welcome bonus) backed by an append-only transaction ledger, and an
//! order fulfillment pipeline that debits the customer, places the order with the upstream panel and compensates the
//! wallet when the panel rejects it.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@sqlite`] and the contracts in [`mod@traits`]). SQLite is the supported backend. You should
//!    never need to touch the database directly; the data types it stores are public in [`mod@db_types`].
//! 2. The engine public API ([`mod@api`]): wallet, bonus policy, catalog management and the order flow, each generic
//!    over a storage backend implementing the relevant traits.
//! 3. Events and jobs ([`mod@events`], [`mod@jobs`]): a small pub-sub layer for bonus notifications and the retrying
//!    background jobs for provider verification and catalog sync.
pub mod api;
pub mod db_types;
pub mod events;
pub mod jobs;
mod sqlite;
pub mod traits;

pub use api::{BonusApi, BonusConfig, BonusError, CatalogApi, OrderFlowApi, SettingsApi, WalletApi, WalletSummary};
pub use sqlite::SqliteDatabase;
