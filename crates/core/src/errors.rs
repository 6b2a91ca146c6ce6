use thiserror::Error;

/// Unified error type for the entire portfolio-board-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// The valuation pipeline itself is deliberately infallible: per-identifier
/// and whole-batch quote failures degrade to zeroed rows, and rate lookups
/// fall back to cached/default values. The variants here cover the
/// remaining surfaces: source adapters, table writes, and serialization
/// of reports for a frontend.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown market: {0}")]
    MarketNotFound(String),

    // ── Serialization ───────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs so a
        // source that authenticates via query string never leaks its key.
        let is_timeout = e.is_timeout();
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        if is_timeout {
            CoreError::Timeout(sanitized)
        } else {
            CoreError::Network(sanitized)
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
