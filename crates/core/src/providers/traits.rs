use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::quote::QuoteResult;

/// Trait abstraction for market quote sources.
///
/// A source takes one batch of identifiers per valuation pass and must
/// report per-identifier failures as `QuoteResult::Unavailable` values
/// in the map — an unknown ticker never aborts the batch. Returning
/// `Err` means the whole batch failed (network down, endpoint broken)
/// and the engine degrades the entire market to zeroed rows.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch last price and previous close for every identifier.
    /// Identifiers missing from the returned map are treated as
    /// `Unavailable` by the caller.
    async fn fetch_quotes(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, QuoteResult>, CoreError>;
}

/// Trait abstraction for currency conversion rate sources.
///
/// Only spot rates are needed; staleness and fallback policy live in
/// `RateService`, not here.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Current conversion rate from one currency to another.
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, CoreError>;
}
