//! # Paperbroker Executor Crate
//!
//! This crate orchestrates a single order end to end: validate the request,
//! fetch the fill price from the price oracle, hand the order to the ledger,
//! and translate the result into a plain outcome value for the caller.
//!
//! ## Architectural Principles
//!
//! - **No Mutation Here:** The executor never touches balances or holdings
//!   itself; every invariant-relevant mutation lives in the ledger. If the
//!   quote lookup fails, the order dies before the ledger is ever involved.
//! - **Errors Become Values:** Callers receive an `OrderOutcome` carrying
//!   `success`/`message`/amounts. No error crosses this boundary as a panic
//!   or an unhandled failure.
//!
//! ## Public API
//!
//! - `OrderExecutor`: the buy/sell workflow.
//! - `OrderOutcome`: the result value handed back to calling handlers.

// Declare the modules that constitute this crate.
pub mod order;

// Re-export the key components to provide a clean, public-facing API.
pub use order::{OrderExecutor, OrderOutcome};
