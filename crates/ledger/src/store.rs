use async_trait::async_trait;
use core_types::{Holding, OrderSide, Transaction};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the persistence layer. Any store operation may fail
/// this way; the ledger translates mid-commit failures into rollbacks.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Persistence for one user's cash balance.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates an account with an opening balance. Fails with
    /// `AccountExists` if the username is taken.
    async fn create_account(&self, username: &str, opening_balance: Decimal)
    -> Result<(), StoreError>;

    /// Reads the current balance, or `None` if the account does not exist.
    async fn get_balance(&self, username: &str) -> Result<Option<Decimal>, StoreError>;

    /// Overwrites the balance of an existing account.
    async fn set_balance(&self, username: &str, balance: Decimal) -> Result<(), StoreError>;
}

/// Persistence for one user's positions, keyed by `(username, symbol)`.
#[async_trait]
pub trait HoldingStore: Send + Sync {
    async fn get_holding(
        &self,
        username: &str,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError>;

    /// All holdings for a user, ordered by symbol.
    async fn list_holdings(&self, username: &str) -> Result<Vec<Holding>, StoreError>;

    /// Inserts the holding or replaces the existing record for its
    /// `(username, symbol)` key.
    async fn upsert_holding(&self, holding: &Holding) -> Result<(), StoreError>;

    /// Removes a holding. Called precisely when a sell brings the quantity
    /// to zero, and during commit rollback.
    async fn delete_holding(&self, username: &str, symbol: &str) -> Result<(), StoreError>;
}

/// Append-only persistence of executed orders.
///
/// The absence of any update or delete method here is deliberate: the
/// transaction history is immutable by construction, not by convention.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Appends a transaction and returns its assigned monotonic id. The
    /// `id` field of the argument is ignored.
    async fn append(&self, transaction: &Transaction) -> Result<i64, StoreError>;

    /// Transactions for a user, most recent first, optionally filtered to
    /// one side.
    async fn list_by_user(
        &self,
        username: &str,
        side: Option<OrderSide>,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// The summed `total_amount` over one side of a user's history. Used to
    /// derive total invested capital and realized cash flow.
    async fn sum_by_side(&self, username: &str, side: OrderSide) -> Result<Decimal, StoreError>;
}
