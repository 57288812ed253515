use crate::error::MarketDataError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resolved quote for one symbol at the time of the call.
///
/// `price` is the only field the ledger path consumes; the change fields
/// carry through the provider's day-change decoration for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub display_name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: String,
}

/// The generic, abstract interface for current-price lookup.
///
/// This trait is the contract the executor and statistics calculator use,
/// allowing the underlying implementation (live provider or static map)
/// to be swapped out.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Resolves a symbol to its current quote. A symbol the provider does
    /// not know, or a provider that cannot be reached, surfaces as
    /// `PriceUnavailable`.
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;
}

/// A `PriceOracle` serving fixed prices from a map.
///
/// This is the offline stand-in for the live client: demo runs and tests
/// get deterministic fills without a provider in the loop.
#[derive(Debug, Default)]
pub struct StaticOracle {
    prices: HashMap<String, Decimal>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the price served for a symbol.
    pub fn set_price(&mut self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        match self.prices.get(symbol) {
            Some(price) => Ok(Quote {
                symbol: symbol.to_string(),
                display_name: company_name(symbol),
                price: *price,
                change: Decimal::ZERO,
                change_percent: "0.00%".to_string(),
            }),
            None => Err(MarketDataError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: "no static price registered".to_string(),
            }),
        }
    }
}

/// Human-readable names for a handful of well-known symbols; everything
/// else falls back to "<SYMBOL> Company".
pub fn company_name(symbol: &str) -> String {
    match symbol {
        "JPM" => "JP Morgan Chase & Co".to_string(),
        "AAPL" => "Apple Inc".to_string(),
        "GOOGL" => "Alphabet Inc".to_string(),
        "MSFT" => "Microsoft Corporation".to_string(),
        "TSLA" => "Tesla Inc".to_string(),
        other => format!("{other} Company"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn static_oracle_serves_registered_prices() {
        let oracle = StaticOracle::new().with_price("AAPL", dec!(187.50));
        let quote = oracle.quote("AAPL").await.unwrap();
        assert_eq!(quote.price, dec!(187.50));
        assert_eq!(quote.display_name, "Apple Inc");
    }

    #[tokio::test]
    async fn static_oracle_fails_for_unknown_symbols() {
        let oracle = StaticOracle::new();
        let err = oracle.quote("NOPE").await.unwrap_err();
        assert!(matches!(err, MarketDataError::PriceUnavailable { .. }));
    }
}
