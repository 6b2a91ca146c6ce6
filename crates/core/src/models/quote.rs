use serde::{Deserialize, Serialize};

/// Per-identifier outcome of a batched quote fetch.
///
/// A failed identifier is an ordinary value, not an error: the engine
/// pattern-matches on it and substitutes zeros, so one bad ticker can
/// never abort a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuoteResult {
    Price {
        /// Last traded price in the instrument's local currency.
        last: f64,
        /// Previous session's close; sources sometimes omit it
        /// (fresh listings, thin instruments).
        previous_close: Option<f64>,
    },
    /// The source could not produce a price for this identifier:
    /// unknown ticker, malformed response, missing field.
    Unavailable,
}

impl QuoteResult {
    /// Last price, if present and finite.
    pub fn last_price(&self) -> Option<f64> {
        match self {
            QuoteResult::Price { last, .. } if last.is_finite() => Some(*last),
            _ => None,
        }
    }

    /// Previous close, if present, finite and positive. Non-positive
    /// closes are useless as a change baseline and treated as absent.
    pub fn previous_close(&self) -> Option<f64> {
        match self {
            QuoteResult::Price {
                previous_close: Some(pc),
                ..
            } if pc.is_finite() && *pc > 0.0 => Some(*pc),
            _ => None,
        }
    }
}
