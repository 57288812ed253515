//! # Paperbroker Ledger Crate
//!
//! This crate is the heart of the simulated brokerage: it applies buy and
//! sell orders to one user's cash balance, holdings, and transaction history
//! as a single indivisible unit.
//!
//! ## Architectural Principles
//!
//! - **One Writer Per Account:** All reads and writes touching one user's
//!   balance and holdings are serialized behind a per-account async mutex.
//!   Orders for different users proceed fully in parallel; two orders for
//!   the same user can never interleave their balance/holding effects.
//! - **All-or-Nothing Commits:** An order either applies every sub-mutation
//!   (balance, holding, transaction append) or none of them. Failures in the
//!   middle of a commit trigger compensating writes that restore the
//!   pre-order state.
//! - **Storage Abstraction:** The ledger talks to `AccountStore`,
//!   `HoldingStore`, and `TransactionLog` traits, so the same commit logic
//!   runs against the in-memory store and the PostgreSQL store.
//!
//! ## Public API
//!
//! - `Ledger`: the per-account coordinator with `apply_buy` / `apply_sell`.
//! - `AccountStore` / `HoldingStore` / `TransactionLog`: persistence contracts.
//! - `MemoryStore`: the in-memory reference implementation of all three.
//! - `LedgerError` / `StoreError`: the specific error types of this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod ledger;
pub mod memory;
pub mod store;

// Re-export the key components to provide a clean, public-facing API.
pub use error::LedgerError;
pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use store::{AccountStore, HoldingStore, StoreError, TransactionLog};
