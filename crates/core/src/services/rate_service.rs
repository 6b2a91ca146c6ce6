use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::models::rate::{default_rate, RateCache, RATE_TTL_SECS};
use crate::providers::traits::RateSource;

/// Upper bound on one rate fetch.
const RATE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Conversion rate lookup with a time-to-live cache and layered fallback.
///
/// Lookup order on every call:
/// 1. fresh cached value → returned without a fetch;
/// 2. cache miss or expired entry → fetch from the source;
/// 3. fetch failed (error, timeout, non-positive or non-finite rate) →
///    last known good value if one exists, else the pair's hardcoded
///    default.
///
/// Guarantee: `get_rate` never errors and always returns a strictly
/// positive, finite rate. Callers multiply by it blindly.
pub struct RateService {
    source: Arc<dyn RateSource>,
    ttl_secs: i64,
}

impl RateService {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            ttl_secs: RATE_TTL_SECS,
        }
    }

    /// Override the default one-hour TTL (tests, aggressive refresh).
    pub fn with_ttl_secs(source: Arc<dyn RateSource>, ttl_secs: i64) -> Self {
        Self { source, ttl_secs }
    }

    /// Current conversion rate from `from` to `to`.
    pub async fn get_rate(&self, cache: &mut RateCache, from: &str, to: &str) -> f64 {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        // Identity pairs never hit the cache or the source.
        if from == to {
            return 1.0;
        }

        let cached = cache.get(&from, &to);
        if let Some(entry) = cached {
            if RateCache::is_fresh(&entry, Utc::now(), self.ttl_secs) {
                return entry.rate;
            }
        }

        match tokio::time::timeout(RATE_FETCH_TIMEOUT, self.source.fetch_rate(&from, &to)).await
        {
            Ok(Ok(rate)) if rate.is_finite() && rate > 0.0 => {
                cache.set(&from, &to, rate);
                rate
            }
            // Anything else — source error, timeout, or a rate that would
            // corrupt every downstream value — falls back. A stale cached
            // rate beats a hardcoded constant.
            _ => match cached {
                Some(entry) => entry.rate,
                None => default_rate(&from, &to),
            },
        }
    }
}
