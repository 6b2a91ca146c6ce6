use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::quote::QuoteResult;
use super::traits::QuoteSource;

/// Yahoo Finance quote source.
///
/// - **Free**: No API key required.
/// - **No strict rate limits** (unofficial public API).
/// - **Coverage**: Global equities, ETFs, REITs — including the
///   Shanghai/Shenzhen (".SS"/".SZ") and Hong Kong (".HK") suffixed
///   tickers the seeded markets use.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's
/// public endpoints. Prices come back in the instrument's native
/// currency; cross-currency conversion happens downstream.
///
/// The batch contract is honored by iterating identifiers and demoting
/// each individual failure to `QuoteResult::Unavailable` — only a
/// connector that cannot be built at all surfaces as an error.
pub struct YahooQuoteSource {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooQuoteSource {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Fetch one identifier's quote, reading the last close as the
    /// current price and the close before it as the previous close.
    ///
    /// A few days of daily bars are requested so that weekends and
    /// market holidays still yield two closes.
    async fn fetch_one(&self, code: &str) -> QuoteResult {
        let resp = match self.connector.get_quote_range(code, "1d", "5d").await {
            Ok(resp) => resp,
            Err(_) => return QuoteResult::Unavailable,
        };

        let quotes = match resp.quotes() {
            Ok(quotes) if !quotes.is_empty() => quotes,
            _ => return QuoteResult::Unavailable,
        };

        let last = quotes[quotes.len() - 1].close;
        if !last.is_finite() {
            return QuoteResult::Unavailable;
        }
        let previous_close = if quotes.len() >= 2 {
            Some(quotes[quotes.len() - 2].close)
        } else {
            None
        };

        QuoteResult::Price {
            last,
            previous_close,
        }
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_quotes(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, QuoteResult>, CoreError> {
        let mut results = HashMap::new();
        for code in codes {
            // Duplicate identifiers in a table map to one fetch each pass.
            if results.contains_key(code) {
                continue;
            }
            let quote = self.fetch_one(code).await;
            results.insert(code.clone(), quote);
        }
        Ok(results)
    }
}
