use crate::error::AnalyticsError;
use crate::report::PortfolioStats;
use core_types::{Holding, OrderSide};
use ledger::Ledger;
use market_data::PriceOracle;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A stateless calculator for deriving portfolio statistics.
///
/// Holdings are read through the ledger and their `last_price` is refreshed
/// from the oracle per query; the refreshed prices are never written back.
/// A symbol whose quote cannot be resolved keeps its stored last price —
/// a stale view beats a failed one for a read-only statistics page.
pub struct StatsCalculator {
    ledger: Arc<Ledger>,
    oracle: Arc<dyn PriceOracle>,
}

impl StatsCalculator {
    pub fn new(ledger: Arc<Ledger>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self { ledger, oracle }
    }

    /// The user's holdings with query-time price refresh, ordered by symbol.
    pub async fn portfolio(&self, username: &str) -> Result<Vec<Holding>, AnalyticsError> {
        let mut holdings = self.ledger.holdings(username).await?;
        for holding in &mut holdings {
            match self.oracle.quote(&holding.symbol).await {
                Ok(quote) => holding.last_price = quote.price,
                Err(e) => {
                    tracing::warn!(
                        symbol = %holding.symbol,
                        error = %e,
                        "price refresh failed; keeping last stored price"
                    );
                }
            }
        }
        Ok(holdings)
    }

    /// Σ quantity × refreshed last price over all current holdings.
    pub async fn portfolio_value(&self, username: &str) -> Result<Decimal, AnalyticsError> {
        let holdings = self.portfolio(username).await?;
        Ok(holdings.iter().map(Holding::market_value).sum())
    }

    /// Σ (refreshed last price − average cost) × quantity over all holdings.
    pub async fn unrealized_gain_loss(&self, username: &str) -> Result<Decimal, AnalyticsError> {
        let holdings = self.portfolio(username).await?;
        Ok(holdings.iter().map(Holding::gain_loss).sum())
    }

    /// Total capital ever committed to buys, from the transaction log.
    pub async fn total_invested(&self, username: &str) -> Result<Decimal, AnalyticsError> {
        Ok(self.ledger.side_total(username, OrderSide::Buy).await?)
    }

    /// Net realized cash flow: all sell proceeds minus all buy costs.
    pub async fn realized_cash_flow(&self, username: &str) -> Result<Decimal, AnalyticsError> {
        let bought = self.ledger.side_total(username, OrderSide::Buy).await?;
        let sold = self.ledger.side_total(username, OrderSide::Sell).await?;
        Ok(sold - bought)
    }

    /// The aggregate statistics view backing the portfolio dashboard.
    pub async fn stats(&self, username: &str) -> Result<PortfolioStats, AnalyticsError> {
        let holdings = self.portfolio(username).await?;
        let total_value: Decimal = holdings.iter().map(Holding::market_value).sum();
        let total_gain_loss: Decimal = holdings.iter().map(Holding::gain_loss).sum();
        let total_invested = self.total_invested(username).await?;

        let annual_return_pct = if total_invested > Decimal::ZERO {
            total_gain_loss / total_invested * Decimal::from(100)
        } else {
            Decimal::ZERO
        };

        Ok(PortfolioStats {
            total_value,
            total_gain_loss,
            total_invested,
            holdings_count: holdings.len(),
            annual_return_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::OrderRequest;
    use ledger::MemoryStore;
    use market_data::StaticOracle;
    use rust_decimal_macros::dec;

    async fn seeded_ledger() -> Arc<Ledger> {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(Ledger::new(store.clone(), store.clone(), store.clone()));
        ledger.open_account("alice", dec!(10000)).await.unwrap();
        ledger
            .apply_buy(
                &OrderRequest::market("alice", "AAPL", "Apple Inc", 10),
                dec!(100),
            )
            .await
            .unwrap();
        ledger
            .apply_buy(
                &OrderRequest::market("alice", "TSLA", "Tesla Inc", 5),
                dec!(200),
            )
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn stats_reflect_refreshed_prices() {
        let ledger = seeded_ledger().await;
        // AAPL up 20, TSLA down 50 since purchase.
        let oracle = Arc::new(
            StaticOracle::new()
                .with_price("AAPL", dec!(120))
                .with_price("TSLA", dec!(150)),
        );
        let calc = StatsCalculator::new(ledger, oracle);

        let stats = calc.stats("alice").await.unwrap();
        assert_eq!(stats.total_value, dec!(1950)); // 10*120 + 5*150
        assert_eq!(stats.total_gain_loss, dec!(-50)); // +200 - 250
        assert_eq!(stats.total_invested, dec!(2000)); // 1000 + 1000
        assert_eq!(stats.holdings_count, 2);
        assert_eq!(stats.annual_return_pct, dec!(-2.5));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_stored_price() {
        let ledger = seeded_ledger().await;
        // Only AAPL resolves; TSLA keeps its stored last price of 200.
        let oracle = Arc::new(StaticOracle::new().with_price("AAPL", dec!(120)));
        let calc = StatsCalculator::new(ledger, oracle);

        let value = calc.portfolio_value("alice").await.unwrap();
        assert_eq!(value, dec!(2200)); // 10*120 + 5*200
    }

    #[tokio::test]
    async fn annual_return_is_zero_when_nothing_was_invested() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(Ledger::new(store.clone(), store.clone(), store.clone()));
        ledger.open_account("bob", dec!(500)).await.unwrap();
        let calc = StatsCalculator::new(ledger, Arc::new(StaticOracle::new()));

        let stats = calc.stats("bob").await.unwrap();
        assert_eq!(stats.total_invested, Decimal::ZERO);
        assert_eq!(stats.annual_return_pct, Decimal::ZERO);
        assert_eq!(stats.holdings_count, 0);
    }

    #[tokio::test]
    async fn realized_cash_flow_is_sells_minus_buys() {
        let ledger = seeded_ledger().await;
        ledger
            .apply_sell(
                &OrderRequest::market("alice", "AAPL", "Apple Inc", 10),
                dec!(110),
            )
            .await
            .unwrap();
        let calc = StatsCalculator::new(ledger, Arc::new(StaticOracle::new()));

        // Bought 2000 total, sold 1100.
        assert_eq!(
            calc.realized_cash_flow("alice").await.unwrap(),
            dec!(-900)
        );
        // total_invested is historical: unchanged by the sell.
        assert_eq!(calc.total_invested("alice").await.unwrap(), dec!(2000));
    }
}
