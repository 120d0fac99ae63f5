//! Client for the legacy SMM panel provider protocol.
//!
//! Every upstream panel speaks the same near-identical dialect: one HTTP endpoint, a form-encoded POST body with an
//! `action` parameter and the API key injected into every request, and a JSON response that carries a top-level
//! `error` field when something went wrong. One adapter shape therefore fits all providers.
//!
//! Upstream payloads are duck-typed (numbers arrive as strings, the same concept has two field names, responses are
//! sometimes objects and sometimes maps). This crate normalizes all of that into strongly-typed results at the
//! boundary; nothing above it should ever touch a raw panel response.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::PanelApi;
pub use config::PanelConfig;
pub use data_objects::{CancelOutcome, OrderParams, PanelBalance, PlacedOrder, RawService, RemoteOrderStatus};
pub use error::PanelApiError;
