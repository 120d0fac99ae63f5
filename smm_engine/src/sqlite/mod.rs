//! # SQLite backend
//!
//! [`SqliteDatabase`] implements every storage trait in [`crate::traits`] over a single connection pool. The
//! low-level queries live in the [`db`] submodule as free functions over `&mut SqliteConnection`, so that callers
//! can compose them inside a single transaction where atomicity matters.
pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
