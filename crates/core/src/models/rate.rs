use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cache key: (source currency, reporting currency), both uppercased.
pub type RatePairKey = (String, String);

/// Default time-to-live for a cached conversion rate, in seconds.
/// FX spot rates move slowly and the rate endpoint is rate-limited,
/// so one hour is plenty.
pub const RATE_TTL_SECS: i64 = 3600;

/// One cached conversion rate with its fetch timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedRate {
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
}

/// In-memory cache of currency conversion rates with a time-to-live.
///
/// An expired entry is not evicted: it stays around as the
/// last-known-good value that `RateService` falls back to when a
/// refetch fails. Entries only disappear on `clear()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateCache {
    pub entries: HashMap<RatePairKey, CachedRate>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached entry for a pair, fresh or stale.
    pub fn get(&self, from: &str, to: &str) -> Option<CachedRate> {
        let key = (from.to_uppercase(), to.to_uppercase());
        self.entries.get(&key).copied()
    }

    /// Store a freshly fetched rate, stamping it with the current time.
    pub fn set(&mut self, from: &str, to: &str, rate: f64) {
        let key = (from.to_uppercase(), to.to_uppercase());
        self.entries.insert(
            key,
            CachedRate {
                rate,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Whether a cached entry is still within its TTL.
    pub fn is_fresh(entry: &CachedRate, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        (now - entry.fetched_at).num_seconds() < ttl_secs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Hardcoded fallback rate for a pair, used when a fetch fails and no
/// cached value exists. Strictly positive by construction — a zero rate
/// would silently erase a whole market's value.
///
/// The table covers the pairs the seeded markets actually need; anything
/// else degrades to 1.0, which at least keeps values visible.
pub fn default_rate(from: &str, to: &str) -> f64 {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    if from == to {
        return 1.0;
    }
    match (from.as_str(), to.as_str()) {
        ("USD", "CNY") => 7.2,
        ("SGD", "CNY") => 5.3,
        ("HKD", "CNY") => 0.92,
        ("CNY", "USD") => 0.14,
        ("HKD", "USD") => 0.13,
        _ => 1.0,
    }
}
