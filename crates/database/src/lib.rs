//! # Paperbroker Database Crate
//!
//! PostgreSQL persistence for the brokerage: the durable implementation of
//! the `AccountStore`, `HoldingStore`, and `TransactionLog` contracts
//! defined by the ledger crate.
//!
//! ## Architectural Principles
//!
//! - **Adapter Only:** This crate encapsulates all SQL and row mapping. The
//!   ledger's commit protocol (per-account serialization, compensating
//!   rollback) is backend-agnostic and lives upstream; nothing here is
//!   reachable except through the three contracts.
//! - **Asynchronous & Pooled:** All operations are asynchronous and share a
//!   `PgPool` for concurrent access.
//!
//! ## Public API
//!
//! - `connect`: the async function to establish the database connection pool.
//! - `run_migrations`: applies the embedded schema migrations at startup.
//! - `PgStore`: one struct implementing all three persistence contracts.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::PgStore;
