use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{BrokerageConfig, Config, MarketDataConfig};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, layers environment overrides on top (prefix
/// `PAPERBROKER`, `__` as the separator, so the provider API key can stay
/// out of the file), and deserializes into our strongly-typed `Config`.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`
        .add_source(config::File::with_name("config.toml"))
        .add_source(
            config::Environment::with_prefix("PAPERBROKER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;

    if config.brokerage.opening_balance < rust_decimal::Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "brokerage.opening_balance must not be negative".to_string(),
        ));
    }

    Ok(config)
}
