//! Scoped access to the git-backed store.
//!
//! A [`ConnectionPool`] owns the repository and its transaction manager and
//! hands out [`Connection`]s that implement the storage traits.

mod config;
mod connection;

pub use config::DatabaseConfig;
pub use connection::{Connection, ConnectionPool};
