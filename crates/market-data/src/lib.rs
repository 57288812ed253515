//! # Paperbroker Market Data Crate
//!
//! This crate resolves ticker symbols to current trade prices. It defines
//! the `PriceOracle` trait that the order executor and the statistics
//! calculator consume, plus two implementations: a live Alpha Vantage
//! client and a static in-memory oracle for simulation and tests.
//!
//! The rest of the system treats whatever price an oracle returns as
//! authoritative for the fill; freshness is the provider's problem, not
//! the ledger's.
//!
//! ## Public API
//!
//! - `PriceOracle`: the quote-lookup contract.
//! - `Quote`: a resolved quote (price plus day-change decoration).
//! - `AlphaVantageClient`: the live provider client (GLOBAL_QUOTE endpoint).
//! - `StaticOracle`: fixed quotes from a map, for demo runs and tests.
//! - `MarketDataError`: the specific error types of this crate.

// Declare the modules that constitute this crate.
pub mod alpha_vantage;
pub mod error;
pub mod oracle;

// Re-export the key components to provide a clean, public-facing API.
pub use alpha_vantage::AlphaVantageClient;
pub use error::MarketDataError;
pub use oracle::{PriceOracle, Quote, StaticOracle};
