use crate::error::LedgerError;
use crate::store::{AccountStore, HoldingStore, TransactionLog};
use chrono::Utc;
use core_types::{Holding, OrderReceipt, OrderRequest, OrderSide, Transaction};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry of per-account mutexes.
///
/// Locks are created lazily on first use and never removed; the set of
/// accounts is small and bounded by registrations.
#[derive(Debug, Default)]
struct AccountLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    async fn lock_for(&self, username: &str) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().await;
        locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Applies orders to one account's state as indivisible units.
///
/// The ledger is the only component allowed to mutate balances and
/// holdings. Every operation on a given user's state runs under that
/// user's mutex, so concurrent orders for the same account are applied
/// strictly one after another, while orders for different accounts proceed
/// in parallel.
///
/// Commits write in a fixed order (balance, holding, transaction append).
/// A persistence failure after the first write triggers compensating
/// writes that restore the pre-order state, so a rejected or failed order
/// never leaves a balance change without its transaction, or vice versa.
pub struct Ledger {
    accounts: Arc<dyn AccountStore>,
    holdings: Arc<dyn HoldingStore>,
    transactions: Arc<dyn TransactionLog>,
    locks: AccountLocks,
}

impl Ledger {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        holdings: Arc<dyn HoldingStore>,
        transactions: Arc<dyn TransactionLog>,
    ) -> Self {
        Self {
            accounts,
            holdings,
            transactions,
            locks: AccountLocks::default(),
        }
    }

    /// Applies a buy order at the given fill price.
    ///
    /// Affordability is checked against the current balance under the
    /// account lock; an unaffordable or invalid order is rejected without
    /// touching any state. On success the balance is debited, the holding
    /// is created or its weighted average cost recomputed, and a BUY
    /// transaction is appended.
    pub async fn apply_buy(
        &self,
        request: &OrderRequest,
        fill_price: Decimal,
    ) -> Result<OrderReceipt, LedgerError> {
        validate(request, fill_price)?;

        let lock = self.locks.lock_for(&request.username).await;
        let _guard = lock.lock().await;

        let balance = self
            .accounts
            .get_balance(&request.username)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(request.username.clone()))?;

        let total_cost = fill_price * Decimal::from(request.quantity);
        if total_cost > balance {
            return Err(LedgerError::InsufficientFunds {
                required: total_cost,
                available: balance,
            });
        }

        let previous = self
            .holdings
            .get_holding(&request.username, &request.symbol)
            .await?;

        let updated = match &previous {
            Some(existing) => {
                let new_quantity = existing.quantity + request.quantity;
                let combined_cost = existing.average_cost * Decimal::from(existing.quantity)
                    + fill_price * Decimal::from(request.quantity);
                Holding {
                    quantity: new_quantity,
                    average_cost: combined_cost / Decimal::from(new_quantity),
                    last_price: fill_price,
                    ..existing.clone()
                }
            }
            None => Holding {
                username: request.username.clone(),
                symbol: request.symbol.clone(),
                display_name: request.display_name.clone(),
                quantity: request.quantity,
                average_cost: fill_price,
                last_price: fill_price,
                acquired_at: Utc::now(),
            },
        };

        let new_balance = balance - total_cost;

        // Commit phase: balance, then holding, then transaction. Each later
        // failure unwinds the earlier writes.
        self.accounts
            .set_balance(&request.username, new_balance)
            .await?;

        if let Err(e) = self.holdings.upsert_holding(&updated).await {
            self.restore_balance(&request.username, balance).await;
            return Err(e.into());
        }

        let record = Transaction::new(
            &request.username,
            OrderSide::Buy,
            &request.symbol,
            &request.display_name,
            request.quantity,
            fill_price,
            request.order_type,
            request.duration,
        );
        let transaction_id = match self.transactions.append(&record).await {
            Ok(id) => id,
            Err(e) => {
                self.restore_holding(&request.username, &request.symbol, previous.as_ref())
                    .await;
                self.restore_balance(&request.username, balance).await;
                return Err(e.into());
            }
        };

        tracing::debug!(
            username = %request.username,
            symbol = %request.symbol,
            quantity = request.quantity,
            %fill_price,
            transaction_id,
            "buy committed"
        );

        Ok(OrderReceipt {
            transaction_id,
            side: OrderSide::Buy,
            symbol: request.symbol.clone(),
            quantity: request.quantity,
            fill_price,
            total_amount: total_cost,
            new_balance,
            holding: Some(updated),
        })
    }

    /// Applies a sell order at the given fill price.
    ///
    /// The owned quantity is checked under the account lock; selling more
    /// than is held (or a symbol with no holding) is rejected without
    /// touching any state. On success the proceeds are credited, the
    /// holding shrinks (and is deleted exactly when it reaches zero), and a
    /// SELL transaction is appended. The average cost is never changed by a
    /// sell; realized gain/loss is derived at read time.
    pub async fn apply_sell(
        &self,
        request: &OrderRequest,
        fill_price: Decimal,
    ) -> Result<OrderReceipt, LedgerError> {
        validate(request, fill_price)?;

        let lock = self.locks.lock_for(&request.username).await;
        let _guard = lock.lock().await;

        let previous = self
            .holdings
            .get_holding(&request.username, &request.symbol)
            .await?;
        let existing = match &previous {
            Some(h) if h.quantity >= request.quantity => h.clone(),
            Some(h) => {
                return Err(LedgerError::InsufficientHoldings {
                    requested: request.quantity,
                    available: h.quantity,
                });
            }
            None => {
                return Err(LedgerError::InsufficientHoldings {
                    requested: request.quantity,
                    available: 0,
                });
            }
        };

        let balance = self
            .accounts
            .get_balance(&request.username)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(request.username.clone()))?;

        let total_proceeds = fill_price * Decimal::from(request.quantity);
        let new_balance = balance + total_proceeds;
        let new_quantity = existing.quantity - request.quantity;

        self.accounts
            .set_balance(&request.username, new_balance)
            .await?;

        let remaining = if new_quantity == 0 {
            // A holding with zero quantity must not exist as a record.
            if let Err(e) = self
                .holdings
                .delete_holding(&request.username, &request.symbol)
                .await
            {
                self.restore_balance(&request.username, balance).await;
                return Err(e.into());
            }
            None
        } else {
            let updated = Holding {
                quantity: new_quantity,
                last_price: fill_price,
                ..existing.clone()
            };
            if let Err(e) = self.holdings.upsert_holding(&updated).await {
                self.restore_balance(&request.username, balance).await;
                return Err(e.into());
            }
            Some(updated)
        };

        let record = Transaction::new(
            &request.username,
            OrderSide::Sell,
            &request.symbol,
            &request.display_name,
            request.quantity,
            fill_price,
            request.order_type,
            request.duration,
        );
        let transaction_id = match self.transactions.append(&record).await {
            Ok(id) => id,
            Err(e) => {
                self.restore_holding(&request.username, &request.symbol, Some(&existing))
                    .await;
                self.restore_balance(&request.username, balance).await;
                return Err(e.into());
            }
        };

        tracing::debug!(
            username = %request.username,
            symbol = %request.symbol,
            quantity = request.quantity,
            %fill_price,
            transaction_id,
            "sell committed"
        );

        Ok(OrderReceipt {
            transaction_id,
            side: OrderSide::Sell,
            symbol: request.symbol.clone(),
            quantity: request.quantity,
            fill_price,
            total_amount: total_proceeds,
            new_balance,
            holding: remaining,
        })
    }

    /// Creates a new account with an opening balance.
    pub async fn open_account(
        &self,
        username: &str,
        opening_balance: Decimal,
    ) -> Result<(), LedgerError> {
        if username.is_empty() {
            return Err(LedgerError::InvalidOrder(
                "username must not be empty".to_string(),
            ));
        }
        if opening_balance < Decimal::ZERO {
            return Err(LedgerError::InvalidOrder(
                "opening balance must not be negative".to_string(),
            ));
        }
        let lock = self.locks.lock_for(username).await;
        let _guard = lock.lock().await;
        self.accounts
            .create_account(username, opening_balance)
            .await?;
        Ok(())
    }

    /// The current cash balance for a user.
    pub async fn balance(&self, username: &str) -> Result<Decimal, LedgerError> {
        let lock = self.locks.lock_for(username).await;
        let _guard = lock.lock().await;
        self.accounts
            .get_balance(username)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(username.to_string()))
    }

    /// A snapshot of one holding, if it exists.
    pub async fn holding(
        &self,
        username: &str,
        symbol: &str,
    ) -> Result<Option<Holding>, LedgerError> {
        let lock = self.locks.lock_for(username).await;
        let _guard = lock.lock().await;
        Ok(self.holdings.get_holding(username, symbol).await?)
    }

    /// All holdings for a user, ordered by symbol.
    pub async fn holdings(&self, username: &str) -> Result<Vec<Holding>, LedgerError> {
        let lock = self.locks.lock_for(username).await;
        let _guard = lock.lock().await;
        Ok(self.holdings.list_holdings(username).await?)
    }

    /// A user's transaction history, most recent first, optionally filtered
    /// to one side. The log is append-only, so this read needs no account
    /// lock.
    pub async fn transactions(
        &self,
        username: &str,
        side: Option<OrderSide>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.transactions.list_by_user(username, side).await?)
    }

    /// The summed transaction amount over one side of a user's history.
    pub async fn side_total(
        &self,
        username: &str,
        side: OrderSide,
    ) -> Result<Decimal, LedgerError> {
        Ok(self.transactions.sum_by_side(username, side).await?)
    }

    /// Compensating write for a failed commit. A rollback failure leaves
    /// the store inconsistent and is loud about it; the original error is
    /// still the one returned to the caller.
    async fn restore_balance(&self, username: &str, balance: Decimal) {
        if let Err(e) = self.accounts.set_balance(username, balance).await {
            tracing::error!(
                username = %username,
                %balance,
                error = %e,
                "balance rollback failed; account state may be inconsistent"
            );
        }
    }

    async fn restore_holding(&self, username: &str, symbol: &str, previous: Option<&Holding>) {
        let result = match previous {
            Some(holding) => self.holdings.upsert_holding(holding).await,
            None => self.holdings.delete_holding(username, symbol).await,
        };
        if let Err(e) = result {
            tracing::error!(
                username = %username,
                symbol = %symbol,
                error = %e,
                "holding rollback failed; account state may be inconsistent"
            );
        }
    }
}

/// Precondition checks shared by both sides. Rejected orders have touched
/// no state and triggered no lookups.
fn validate(request: &OrderRequest, fill_price: Decimal) -> Result<(), LedgerError> {
    if request.username.is_empty() {
        return Err(LedgerError::InvalidOrder(
            "username must not be empty".to_string(),
        ));
    }
    if request.symbol.is_empty() {
        return Err(LedgerError::InvalidOrder(
            "symbol must not be empty".to_string(),
        ));
    }
    if request.quantity <= 0 {
        return Err(LedgerError::InvalidOrder(format!(
            "quantity must be positive, got {}",
            request.quantity
        )));
    }
    if fill_price <= Decimal::ZERO {
        return Err(LedgerError::InvalidOrder(format!(
            "fill price must be positive, got {fill_price}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn ledger_with_store() -> (Ledger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), store.clone(), store.clone());
        (ledger, store)
    }

    async fn funded_ledger(username: &str, balance: Decimal) -> Ledger {
        let (ledger, _) = ledger_with_store();
        ledger.open_account(username, balance).await.unwrap();
        ledger
    }

    fn order(username: &str, symbol: &str, quantity: i64) -> OrderRequest {
        OrderRequest::market(username, symbol, &format!("{symbol} Company"), quantity)
    }

    #[tokio::test]
    async fn buy_debits_balance_and_creates_holding() {
        let ledger = funded_ledger("alice", dec!(1000)).await;

        let receipt = ledger
            .apply_buy(&order("alice", "XYZ", 5), dec!(100))
            .await
            .unwrap();

        assert_eq!(receipt.total_amount, dec!(500));
        assert_eq!(receipt.new_balance, dec!(500));
        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(500));

        let holding = receipt.holding.unwrap();
        assert_eq!(holding.quantity, 5);
        assert_eq!(holding.average_cost, dec!(100));
        assert_eq!(holding.last_price, dec!(100));

        let history = ledger.transactions("alice", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].side, OrderSide::Buy);
        assert_eq!(history[0].total_amount, dec!(500));
        assert_eq!(history[0].id, receipt.transaction_id);
    }

    #[tokio::test]
    async fn repeat_buys_recompute_weighted_average_cost() {
        let ledger = funded_ledger("alice", dec!(10000)).await;

        ledger
            .apply_buy(&order("alice", "XYZ", 10), dec!(100))
            .await
            .unwrap();
        let receipt = ledger
            .apply_buy(&order("alice", "XYZ", 10), dec!(200))
            .await
            .unwrap();

        let holding = receipt.holding.unwrap();
        assert_eq!(holding.quantity, 20);
        assert_eq!(holding.average_cost, dec!(150));
        assert_eq!(holding.last_price, dec!(200));
    }

    #[tokio::test]
    async fn sell_credits_proceeds_and_keeps_average_cost() {
        let ledger = funded_ledger("alice", dec!(1000)).await;
        ledger
            .apply_buy(&order("alice", "XYZ", 10), dec!(50))
            .await
            .unwrap();

        let receipt = ledger
            .apply_sell(&order("alice", "XYZ", 4), dec!(80))
            .await
            .unwrap();

        assert_eq!(receipt.total_amount, dec!(320));
        assert_eq!(receipt.new_balance, dec!(820));
        let holding = receipt.holding.unwrap();
        assert_eq!(holding.quantity, 6);
        // Sells never move the cost basis.
        assert_eq!(holding.average_cost, dec!(50));
        assert_eq!(holding.last_price, dec!(80));
    }

    #[tokio::test]
    async fn selling_entire_position_removes_the_holding() {
        let ledger = funded_ledger("alice", dec!(1000)).await;
        ledger
            .apply_buy(&order("alice", "XYZ", 5), dec!(100))
            .await
            .unwrap();

        let receipt = ledger
            .apply_sell(&order("alice", "XYZ", 5), dec!(120))
            .await
            .unwrap();

        assert_eq!(receipt.new_balance, dec!(1100));
        assert!(receipt.holding.is_none());
        assert!(ledger.holding("alice", "XYZ").await.unwrap().is_none());

        let sells = ledger
            .transactions("alice", Some(OrderSide::Sell))
            .await
            .unwrap();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].total_amount, dec!(600));
    }

    #[tokio::test]
    async fn round_trip_restores_the_pre_buy_balance() {
        let ledger = funded_ledger("alice", dec!(2500)).await;

        ledger
            .apply_buy(&order("alice", "AAPL", 7), dec!(150))
            .await
            .unwrap();
        ledger
            .apply_sell(&order("alice", "AAPL", 7), dec!(150))
            .await
            .unwrap();

        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(2500));
        assert!(ledger.holding("alice", "AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unaffordable_buy_is_rejected_without_side_effects() {
        let ledger = funded_ledger("alice", dec!(100)).await;

        let err = ledger
            .apply_buy(&order("alice", "XYZ", 5), dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { required, available }
                if required == dec!(500) && available == dec!(100)
        ));

        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(100));
        assert!(ledger.holding("alice", "XYZ").await.unwrap().is_none());
        assert!(ledger.transactions("alice", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn selling_without_a_holding_is_rejected_without_side_effects() {
        let ledger = funded_ledger("alice", dec!(1000)).await;

        let err = ledger
            .apply_sell(&order("alice", "XYZ", 1), dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientHoldings { requested: 1, available: 0 }
        ));
        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(1000));
        assert!(ledger.transactions("alice", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overselling_a_holding_is_rejected() {
        let ledger = funded_ledger("alice", dec!(1000)).await;
        ledger
            .apply_buy(&order("alice", "XYZ", 3), dec!(100))
            .await
            .unwrap();

        let err = ledger
            .apply_sell(&order("alice", "XYZ", 5), dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientHoldings { requested: 5, available: 3 }
        ));
        assert_eq!(
            ledger.holding("alice", "XYZ").await.unwrap().unwrap().quantity,
            3
        );
    }

    #[tokio::test]
    async fn invalid_orders_are_rejected_before_any_lookup() {
        let (ledger, _) = ledger_with_store();

        let err = ledger
            .apply_buy(&order("alice", "XYZ", 0), dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOrder(_)));

        let err = ledger
            .apply_buy(&order("alice", "XYZ", 5), dec!(0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOrder(_)));

        let err = ledger
            .apply_sell(&order("", "XYZ", 5), dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOrder(_)));
    }

    #[tokio::test]
    async fn unknown_user_is_a_rejection_not_a_crash() {
        let (ledger, _) = ledger_with_store();

        let err = ledger
            .apply_buy(&order("ghost", "XYZ", 1), dec!(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn worked_example_thousand_dollar_account() {
        let ledger = funded_ledger("alice", dec!(1000)).await;

        let buy = ledger
            .apply_buy(&order("alice", "XYZ", 5), dec!(100))
            .await
            .unwrap();
        assert_eq!(buy.new_balance, dec!(500));
        let holding = buy.holding.unwrap();
        assert_eq!((holding.quantity, holding.average_cost), (5, dec!(100)));
        assert_eq!(
            ledger.side_total("alice", OrderSide::Buy).await.unwrap(),
            dec!(500)
        );

        let sell = ledger
            .apply_sell(&order("alice", "XYZ", 5), dec!(120))
            .await
            .unwrap();
        assert_eq!(sell.new_balance, dec!(1100));
        assert!(sell.holding.is_none());
        assert_eq!(
            ledger.side_total("alice", OrderSide::Sell).await.unwrap(),
            dec!(600)
        );
    }
}
