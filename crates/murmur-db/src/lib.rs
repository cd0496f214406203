//! # murmur-db
//!
//! PostgreSQL layer for the user shadow store: pool construction, embedded
//! migrations, and the `users` model with transaction-scoped operations.
//!
//! Rows are keyed by the identity authority's UUID; this crate never
//! generates identity keys.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::{connect, PoolSettings};
