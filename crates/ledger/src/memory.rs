use crate::store::{AccountStore, HoldingStore, StoreError, TransactionLog};
use async_trait::async_trait;
use core_types::{Holding, OrderSide, Transaction};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// An in-memory implementation of all three persistence contracts.
///
/// This is the default backend of the simulated brokerage and the substrate
/// for the test suite. One instance implements `AccountStore`,
/// `HoldingStore`, and `TransactionLog` together, so a single
/// `Arc<MemoryStore>` can be handed to the ledger three times.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Decimal>>,
    holdings: RwLock<HashMap<(String, String), Holding>>,
    transactions: RwLock<Vec<Transaction>>,
    next_transaction_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_transaction_id: AtomicI64::new(1),
            ..Self::default()
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(
        &self,
        username: &str,
        opening_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(username) {
            return Err(StoreError::AccountExists(username.to_string()));
        }
        accounts.insert(username.to_string(), opening_balance);
        Ok(())
    }

    async fn get_balance(&self, username: &str) -> Result<Option<Decimal>, StoreError> {
        Ok(self.accounts.read().await.get(username).copied())
    }

    async fn set_balance(&self, username: &str, balance: Decimal) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(username) {
            Some(stored) => {
                *stored = balance;
                Ok(())
            }
            None => Err(StoreError::AccountNotFound(username.to_string())),
        }
    }
}

#[async_trait]
impl HoldingStore for MemoryStore {
    async fn get_holding(
        &self,
        username: &str,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError> {
        let key = (username.to_string(), symbol.to_string());
        Ok(self.holdings.read().await.get(&key).cloned())
    }

    async fn list_holdings(&self, username: &str) -> Result<Vec<Holding>, StoreError> {
        let holdings = self.holdings.read().await;
        let mut result: Vec<Holding> = holdings
            .values()
            .filter(|h| h.username == username)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(result)
    }

    async fn upsert_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let key = (holding.username.clone(), holding.symbol.clone());
        self.holdings.write().await.insert(key, holding.clone());
        Ok(())
    }

    async fn delete_holding(&self, username: &str, symbol: &str) -> Result<(), StoreError> {
        let key = (username.to_string(), symbol.to_string());
        self.holdings.write().await.remove(&key);
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for MemoryStore {
    async fn append(&self, transaction: &Transaction) -> Result<i64, StoreError> {
        let id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = transaction.clone();
        stored.id = id;
        self.transactions.write().await.push(stored);
        Ok(id)
    }

    async fn list_by_user(
        &self,
        username: &str,
        side: Option<OrderSide>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self.transactions.read().await;
        // Appended in execution order, so reversing yields most recent first.
        Ok(transactions
            .iter()
            .rev()
            .filter(|tx| tx.username == username && side.is_none_or(|s| tx.side == s))
            .cloned()
            .collect())
    }

    async fn sum_by_side(&self, username: &str, side: OrderSide) -> Result<Decimal, StoreError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .filter(|tx| tx.username == username && tx.side == side)
            .map(|tx| tx.total_amount)
            .sum())
    }
}
