use crate::error::MarketDataError;
use crate::oracle::{PriceOracle, Quote, company_name};
use async_trait::async_trait;
use configuration::MarketDataConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// A `PriceOracle` backed by the Alpha Vantage GLOBAL_QUOTE endpoint.
#[derive(Clone)]
pub struct AlphaVantageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(config: &MarketDataConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl PriceOracle for AlphaVantageClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        tracing::debug!(%symbol, "requesting quote from Alpha Vantage");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: format!("provider returned HTTP {status}"),
            });
        }

        let body = response.text().await?;
        parse_global_quote(symbol, &body)
    }
}

// Alpha Vantage names its JSON keys with positional prefixes, and answers
// an unknown symbol with an empty "Global Quote" object rather than an
// error status.
#[derive(Debug, Deserialize)]
struct GlobalQuoteEnvelope {
    #[serde(rename = "Global Quote")]
    global_quote: Option<RawGlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct RawGlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// Parses a GLOBAL_QUOTE response body into a `Quote`.
///
/// Split out from the HTTP path so the quirky payload format is covered by
/// unit tests without a live provider.
fn parse_global_quote(symbol: &str, body: &str) -> Result<Quote, MarketDataError> {
    let envelope: GlobalQuoteEnvelope =
        serde_json::from_str(body).map_err(|e| MarketDataError::Deserialization(e.to_string()))?;

    let raw = envelope
        .global_quote
        .ok_or_else(|| MarketDataError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: "response carried no Global Quote object".to_string(),
        })?;

    let price_text = raw.price.ok_or_else(|| MarketDataError::PriceUnavailable {
        symbol: symbol.to_string(),
        reason: "quote carried no price field (unknown symbol?)".to_string(),
    })?;

    let price = Decimal::from_str(&price_text)
        .map_err(|e| MarketDataError::Deserialization(format!("bad price {price_text:?}: {e}")))?;
    if price <= Decimal::ZERO {
        return Err(MarketDataError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: format!("provider returned non-positive price {price}"),
        });
    }

    let change = raw
        .change
        .as_deref()
        .and_then(|c| Decimal::from_str(c).ok())
        .unwrap_or(Decimal::ZERO);

    Ok(Quote {
        symbol: raw.symbol.unwrap_or_else(|| symbol.to_string()),
        display_name: company_name(symbol),
        price,
        change,
        change_percent: raw.change_percent.unwrap_or_else(|| "0.00%".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_a_well_formed_global_quote() {
        let body = r#"{
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "186.06",
                "05. price": "187.44",
                "09. change": "1.38",
                "10. change percent": "0.7420%"
            }
        }"#;

        let quote = parse_global_quote("AAPL", body).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(187.44));
        assert_eq!(quote.change, dec!(1.38));
        assert_eq!(quote.change_percent, "0.7420%");
        assert_eq!(quote.display_name, "Apple Inc");
    }

    #[test]
    fn empty_quote_object_means_price_unavailable() {
        // This is how the provider answers an unknown symbol.
        let body = r#"{ "Global Quote": {} }"#;
        let err = parse_global_quote("NOPE", body).unwrap_err();
        assert!(matches!(err, MarketDataError::PriceUnavailable { .. }));
    }

    #[test]
    fn missing_envelope_means_price_unavailable() {
        // Rate-limit notes arrive as a bare informational object.
        let body = r#"{ "Note": "Thank you for using Alpha Vantage!" }"#;
        let err = parse_global_quote("AAPL", body).unwrap_err();
        assert!(matches!(err, MarketDataError::PriceUnavailable { .. }));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let body = r#"{ "Global Quote": { "05. price": "0.0000" } }"#;
        let err = parse_global_quote("AAPL", body).unwrap_err();
        assert!(matches!(err, MarketDataError::PriceUnavailable { .. }));
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let err = parse_global_quote("AAPL", "not json").unwrap_err();
        assert!(matches!(err, MarketDataError::Deserialization(_)));
    }
}
