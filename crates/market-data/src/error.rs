use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("Failed to reach the market data provider: {0}")]
    Transport(String),

    #[error("Failed to deserialize provider response: {0}")]
    Deserialization(String),
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        MarketDataError::Transport(err.to_string())
    }
}
