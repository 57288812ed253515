use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Holding, OrderSide, Transaction};
use ledger::{AccountStore, HoldingStore, StoreError, TransactionLog};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// The PostgreSQL-backed implementation of all three persistence contracts.
///
/// One `PgStore` holds a shared connection pool and can be handed to the
/// ledger as its account store, holding store, and transaction log at once.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn holding_from_row(row: &PgRow) -> Result<Holding, StoreError> {
    Ok(Holding {
        username: row.try_get("username").map_err(backend)?,
        symbol: row.try_get("symbol").map_err(backend)?,
        display_name: row.try_get("display_name").map_err(backend)?,
        quantity: row.try_get("quantity").map_err(backend)?,
        average_cost: row.try_get("average_cost").map_err(backend)?,
        last_price: row.try_get("last_price").map_err(backend)?,
        acquired_at: row.try_get("acquired_at").map_err(backend)?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let side: String = row.try_get("side").map_err(backend)?;
    let order_type: String = row.try_get("order_type").map_err(backend)?;
    let duration: String = row.try_get("duration").map_err(backend)?;
    let executed_at: DateTime<Utc> = row.try_get("executed_at").map_err(backend)?;

    Ok(Transaction {
        id: row.try_get("id").map_err(backend)?,
        username: row.try_get("username").map_err(backend)?,
        side: side.parse().map_err(StoreError::Corrupt)?,
        symbol: row.try_get("symbol").map_err(backend)?,
        display_name: row.try_get("display_name").map_err(backend)?,
        quantity: row.try_get("quantity").map_err(backend)?,
        fill_price: row.try_get("fill_price").map_err(backend)?,
        total_amount: row.try_get("total_amount").map_err(backend)?,
        order_type: order_type.parse().map_err(StoreError::Corrupt)?,
        duration: duration.parse().map_err(StoreError::Corrupt)?,
        executed_at,
    })
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_account(
        &self,
        username: &str,
        opening_balance: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO accounts (username, balance) VALUES ($1, $2) ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(opening_balance)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccountExists(username.to_string()));
        }
        Ok(())
    }

    async fn get_balance(&self, username: &str) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(|r| r.try_get("balance").map_err(backend)).transpose()
    }

    async fn set_balance(&self, username: &str, balance: Decimal) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE accounts SET balance = $1 WHERE username = $2")
            .bind(balance)
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccountNotFound(username.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HoldingStore for PgStore {
    async fn get_holding(
        &self,
        username: &str,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT username, symbol, display_name, quantity, average_cost, last_price, acquired_at
            FROM holdings
            WHERE username = $1 AND symbol = $2
            "#,
        )
        .bind(username)
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|r| holding_from_row(&r)).transpose()
    }

    async fn list_holdings(&self, username: &str) -> Result<Vec<Holding>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT username, symbol, display_name, quantity, average_cost, last_price, acquired_at
            FROM holdings
            WHERE username = $1
            ORDER BY symbol
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(holding_from_row).collect()
    }

    async fn upsert_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO holdings (username, symbol, display_name, quantity, average_cost, last_price, acquired_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (username, symbol) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                quantity = EXCLUDED.quantity,
                average_cost = EXCLUDED.average_cost,
                last_price = EXCLUDED.last_price
            "#,
        )
        .bind(&holding.username)
        .bind(&holding.symbol)
        .bind(&holding.display_name)
        .bind(holding.quantity)
        .bind(holding.average_cost)
        .bind(holding.last_price)
        .bind(holding.acquired_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete_holding(&self, username: &str, symbol: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM holdings WHERE username = $1 AND symbol = $2")
            .bind(username)
            .bind(symbol)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for PgStore {
    async fn append(&self, transaction: &Transaction) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions
                (username, side, symbol, display_name, quantity, fill_price, total_amount, order_type, duration, executed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&transaction.username)
        .bind(transaction.side.as_str())
        .bind(&transaction.symbol)
        .bind(&transaction.display_name)
        .bind(transaction.quantity)
        .bind(transaction.fill_price)
        .bind(transaction.total_amount)
        .bind(transaction.order_type.as_str())
        .bind(transaction.duration.as_str())
        .bind(transaction.executed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        row.try_get("id").map_err(backend)
    }

    async fn list_by_user(
        &self,
        username: &str,
        side: Option<OrderSide>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = match side {
            Some(side) => {
                sqlx::query(
                    r#"
                    SELECT id, username, side, symbol, display_name, quantity, fill_price,
                           total_amount, order_type, duration, executed_at
                    FROM transactions
                    WHERE username = $1 AND side = $2
                    ORDER BY executed_at DESC, id DESC
                    "#,
                )
                .bind(username)
                .bind(side.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, username, side, symbol, display_name, quantity, fill_price,
                           total_amount, order_type, duration, executed_at
                    FROM transactions
                    WHERE username = $1
                    ORDER BY executed_at DESC, id DESC
                    "#,
                )
                .bind(username)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(backend)?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn sum_by_side(&self, username: &str, side: OrderSide) -> Result<Decimal, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(total_amount), 0) AS total FROM transactions WHERE username = $1 AND side = $2",
        )
        .bind(username)
        .bind(side.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        row.try_get("total").map_err(backend)
    }
}
