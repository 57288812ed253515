use crate::store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Insufficient balance. Required: {required}, Available: {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient stocks. Requested: {requested}, Available: {available}")]
    InsufficientHoldings { requested: i64, available: i64 },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
