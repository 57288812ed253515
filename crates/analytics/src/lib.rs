//! # Paperbroker Analytics Crate
//!
//! Read-side portfolio statistics: market value, unrealized gain/loss,
//! invested capital, and the aggregate stats view. This crate is purely
//! derived data — it reads through the ledger's accessors and the price
//! oracle and never mutates account state, so it carries no invariants of
//! its own.
//!
//! ## Public API
//!
//! - `StatsCalculator`: the stateless read-side calculator.
//! - `PortfolioStats`: the aggregate statistics report.
//! - `AnalyticsError`: the specific error types of this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to provide a clean, public-facing API.
pub use engine::StatsCalculator;
pub use error::AnalyticsError;
pub use report::PortfolioStats;
