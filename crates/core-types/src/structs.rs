use crate::enums::{OrderDuration, OrderSide, OrderType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's cash account. The balance is the only mutable field and is
/// only ever written by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub balance: Decimal,
}

/// A user's current position in one symbol, keyed by `(username, symbol)`.
///
/// A holding exists precisely while its quantity is positive: the first buy
/// of a symbol creates it and the sell that brings the quantity to zero
/// deletes it. `average_cost` is the quantity-weighted average purchase
/// price of the still-held shares; sells never change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub username: String,
    pub symbol: String,
    /// Human-readable company name, e.g. "Apple Inc".
    pub display_name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    /// The most recently observed quote for this symbol.
    pub last_price: Decimal,
    pub acquired_at: DateTime<Utc>,
}

impl Holding {
    /// Market value of the position at the last observed price.
    pub fn market_value(&self) -> Decimal {
        self.last_price * Decimal::from(self.quantity)
    }

    /// Total cost basis of the still-held shares.
    pub fn cost_basis(&self) -> Decimal {
        self.average_cost * Decimal::from(self.quantity)
    }

    /// Unrealized gain or loss versus the average cost basis.
    pub fn gain_loss(&self) -> Decimal {
        (self.last_price - self.average_cost) * Decimal::from(self.quantity)
    }

    /// Unrealized gain or loss as a percentage of the average cost.
    /// Zero when the average cost is not positive.
    pub fn gain_loss_pct(&self) -> Decimal {
        if self.average_cost > Decimal::ZERO {
            (self.last_price - self.average_cost) / self.average_cost * Decimal::from(100)
        } else {
            Decimal::ZERO
        }
    }
}

/// One executed order, immutable once appended to the transaction log.
///
/// The log is the sole source of historical truth: invested capital and
/// realized cash flow are derived from it, never stored elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonic identifier, assigned by the log at append time.
    pub id: i64,
    pub username: String,
    pub side: OrderSide,
    pub symbol: String,
    pub display_name: String,
    pub quantity: i64,
    pub fill_price: Decimal,
    /// Always `quantity * fill_price`.
    pub total_amount: Decimal,
    pub order_type: OrderType,
    pub duration: OrderDuration,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds an unappended transaction record for an order that is about
    /// to commit. The id stays zero until the log assigns the real one.
    pub fn new(
        username: &str,
        side: OrderSide,
        symbol: &str,
        display_name: &str,
        quantity: i64,
        fill_price: Decimal,
        order_type: OrderType,
        duration: OrderDuration,
    ) -> Self {
        Self {
            id: 0,
            username: username.to_string(),
            side,
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
            quantity,
            fill_price,
            total_amount: fill_price * Decimal::from(quantity),
            order_type,
            duration,
            executed_at: Utc::now(),
        }
    }
}

/// A fully-typed buy/sell request as submitted by a calling handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-assigned id, useful for correlating logs across components.
    pub client_order_id: Uuid,
    pub username: String,
    pub symbol: String,
    pub display_name: String,
    pub quantity: i64,
    pub order_type: OrderType,
    pub duration: OrderDuration,
}

impl OrderRequest {
    /// A market IOC order, the default combination submitted by the UI.
    pub fn market(username: &str, symbol: &str, display_name: &str, quantity: i64) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            username: username.to_string(),
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
            quantity,
            order_type: OrderType::Market,
            duration: OrderDuration::Ioc,
        }
    }
}

/// The receipt returned by the ledger after an order commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub transaction_id: i64,
    pub side: OrderSide,
    pub symbol: String,
    pub quantity: i64,
    pub fill_price: Decimal,
    /// Total cost for a buy, total proceeds for a sell.
    pub total_amount: Decimal,
    pub new_balance: Decimal,
    /// Snapshot of the holding after the order; `None` exactly when a sell
    /// closed the position.
    pub holding: Option<Holding>,
}
