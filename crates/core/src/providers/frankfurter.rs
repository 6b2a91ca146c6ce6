use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use super::traits::RateSource;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// How long a single rate request may take before it counts as failed.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Frankfurter API source for fiat currency exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) data.
/// - **Coverage**: ~30+ currencies (EUR, USD, CNY, HKD, GBP, JPY, etc.)
///
/// Only the `/latest` endpoint is used; historical rates are not needed
/// because the valuation pipeline values everything at spot.
pub struct FrankfurterRateSource {
    client: Client,
}

impl FrankfurterRateSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for FrankfurterRateSource {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateSource for FrankfurterRateSource {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        let base = from.to_uppercase();
        let target = to.to_uppercase();

        // Same currency → rate is 1.0
        if base == target {
            return Ok(1.0);
        }

        let url = format!("{BASE_URL}/latest?base={base}&symbols={target}");

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse response for {base}/{target}: {e}"),
            })?;

        resp.rates
            .get(&target)
            .copied()
            .ok_or_else(|| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("No rate found for {base} → {target}"),
            })
    }
}
