use rust_decimal::Decimal;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub market_data: MarketDataConfig,
    pub brokerage: BrokerageConfig,
}

/// Connection parameters for the market data provider.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    /// The provider's query endpoint (e.g., "https://www.alphavantage.co/query").
    pub base_url: String,
    /// The provider API key. Usually supplied through the environment
    /// (`PAPERBROKER__MARKET_DATA__API_KEY`) rather than the config file.
    #[serde(default)]
    pub api_key: String,
}

/// Parameters of the simulated brokerage itself.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerageConfig {
    /// The cash balance a newly opened account starts with.
    pub opening_balance: Decimal,
}
