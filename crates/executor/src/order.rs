use core_types::{OrderReceipt, OrderRequest, OrderSide};
use ledger::Ledger;
use market_data::PriceOracle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The result of one buy or sell attempt, as handed to calling handlers.
///
/// Rejections and failures arrive as `success == false` with a message
/// naming the precondition that failed; the account state is untouched on
/// every such path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub success: bool,
    pub message: String,
    /// Total cost for a buy, total proceeds for a sell. `None` on failure.
    pub total_amount: Option<Decimal>,
    pub receipt: Option<OrderReceipt>,
}

impl OrderOutcome {
    fn executed(message: &str, receipt: OrderReceipt) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            total_amount: Some(receipt.total_amount),
            receipt: Some(receipt),
        }
    }

    fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            total_amount: None,
            receipt: None,
        }
    }
}

/// Runs the buy/sell workflow: quote lookup, then atomic ledger application.
pub struct OrderExecutor {
    oracle: Arc<dyn PriceOracle>,
    ledger: Arc<Ledger>,
}

impl OrderExecutor {
    pub fn new(oracle: Arc<dyn PriceOracle>, ledger: Arc<Ledger>) -> Self {
        Self { oracle, ledger }
    }

    /// Buys `request.quantity` shares at the oracle's current price.
    pub async fn buy(&self, request: &OrderRequest) -> OrderOutcome {
        self.execute(request, OrderSide::Buy).await
    }

    /// Sells `request.quantity` shares at the oracle's current price.
    pub async fn sell(&self, request: &OrderRequest) -> OrderOutcome {
        self.execute(request, OrderSide::Sell).await
    }

    async fn execute(&self, request: &OrderRequest, side: OrderSide) -> OrderOutcome {
        // Reject obviously malformed requests before the oracle round trip.
        if let Err(reason) = check_request(request) {
            tracing::debug!(
                client_order_id = %request.client_order_id,
                %side,
                %reason,
                "order rejected before quote lookup"
            );
            return OrderOutcome::rejected(reason);
        }

        let quote = match self.oracle.quote(&request.symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(
                    client_order_id = %request.client_order_id,
                    symbol = %request.symbol,
                    error = %e,
                    "quote lookup failed; order not executed"
                );
                return OrderOutcome::rejected(format!("Error fetching stock data: {e}"));
            }
        };

        // The request may omit the display name; the oracle knows it.
        let mut request = request.clone();
        if request.display_name.is_empty() {
            request.display_name = quote.display_name.clone();
        }

        let applied = match side {
            OrderSide::Buy => self.ledger.apply_buy(&request, quote.price).await,
            OrderSide::Sell => self.ledger.apply_sell(&request, quote.price).await,
        };

        match applied {
            Ok(receipt) => {
                tracing::info!(
                    client_order_id = %request.client_order_id,
                    username = %request.username,
                    symbol = %request.symbol,
                    %side,
                    quantity = request.quantity,
                    fill_price = %quote.price,
                    total_amount = %receipt.total_amount,
                    "order executed"
                );
                let message = match side {
                    OrderSide::Buy => "Stock purchased successfully",
                    OrderSide::Sell => "Stock sold successfully",
                };
                OrderOutcome::executed(message, receipt)
            }
            Err(e) => {
                tracing::debug!(
                    client_order_id = %request.client_order_id,
                    username = %request.username,
                    symbol = %request.symbol,
                    %side,
                    error = %e,
                    "order rejected by ledger"
                );
                OrderOutcome::rejected(e.to_string())
            }
        }
    }
}

fn check_request(request: &OrderRequest) -> Result<(), String> {
    if request.username.is_empty() {
        return Err("Invalid order: username must not be empty".to_string());
    }
    if request.symbol.is_empty() {
        return Err("Invalid order: symbol must not be empty".to_string());
    }
    if request.quantity <= 0 {
        return Err(format!(
            "Invalid order: quantity must be positive, got {}",
            request.quantity
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledger::MemoryStore;
    use market_data::{MarketDataError, Quote, StaticOracle};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts quote lookups so tests can assert the oracle was (not) hit.
    struct CountingOracle {
        inner: StaticOracle,
        calls: AtomicUsize,
    }

    impl CountingOracle {
        fn new(inner: StaticOracle) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceOracle for CountingOracle {
        async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.quote(symbol).await
        }
    }

    async fn executor_with(
        oracle: Arc<dyn PriceOracle>,
        balance: Decimal,
    ) -> (OrderExecutor, Arc<Ledger>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(Ledger::new(store.clone(), store.clone(), store.clone()));
        ledger.open_account("alice", balance).await.unwrap();
        (OrderExecutor::new(oracle, ledger.clone()), ledger)
    }

    #[tokio::test]
    async fn buy_fills_at_the_quoted_price() {
        let oracle = Arc::new(StaticOracle::new().with_price("XYZ", dec!(100)));
        let (executor, ledger) = executor_with(oracle, dec!(1000)).await;

        let outcome = executor
            .buy(&OrderRequest::market("alice", "XYZ", "XYZ Company", 5))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Stock purchased successfully");
        assert_eq!(outcome.total_amount, Some(dec!(500)));
        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(500));
    }

    #[tokio::test]
    async fn sell_reports_total_proceeds() {
        let oracle = Arc::new(StaticOracle::new().with_price("XYZ", dec!(120)));
        let (executor, ledger) = executor_with(oracle, dec!(1000)).await;
        ledger
            .apply_buy(&OrderRequest::market("alice", "XYZ", "XYZ Company", 5), dec!(100))
            .await
            .unwrap();

        let outcome = executor
            .sell(&OrderRequest::market("alice", "XYZ", "XYZ Company", 5))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Stock sold successfully");
        assert_eq!(outcome.total_amount, Some(dec!(600)));
        assert!(outcome.receipt.unwrap().holding.is_none());
    }

    #[tokio::test]
    async fn price_unavailable_fails_the_order_without_touching_the_ledger() {
        // No price registered for XYZ.
        let oracle = Arc::new(StaticOracle::new());
        let (executor, ledger) = executor_with(oracle, dec!(1000)).await;

        let outcome = executor
            .buy(&OrderRequest::market("alice", "XYZ", "XYZ Company", 5))
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("Error fetching stock data"));
        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(1000));
        assert!(ledger.transactions("alice", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_quantity_is_rejected_before_the_quote_lookup() {
        let oracle = Arc::new(CountingOracle::new(
            StaticOracle::new().with_price("XYZ", dec!(100)),
        ));
        let (executor, _) = executor_with(oracle.clone(), dec!(1000)).await;

        let outcome = executor
            .buy(&OrderRequest::market("alice", "XYZ", "XYZ Company", 0))
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("Invalid order"));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ledger_rejections_surface_in_the_message() {
        let oracle = Arc::new(StaticOracle::new().with_price("XYZ", dec!(100)));
        let (executor, _) = executor_with(oracle, dec!(100)).await;

        let outcome = executor
            .buy(&OrderRequest::market("alice", "XYZ", "XYZ Company", 5))
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("Insufficient balance"));
    }

    #[tokio::test]
    async fn missing_display_name_falls_back_to_the_quote() {
        let oracle = Arc::new(StaticOracle::new().with_price("AAPL", dec!(150)));
        let (executor, ledger) = executor_with(oracle, dec!(1000)).await;

        let outcome = executor
            .buy(&OrderRequest::market("alice", "AAPL", "", 2))
            .await;

        assert!(outcome.success);
        let holding = ledger.holding("alice", "AAPL").await.unwrap().unwrap();
        assert_eq!(holding.display_name, "Apple Inc");
    }
}
