use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::position::{MarketTable, Position, StrategyMode};

/// Stable keys for the seeded markets.
pub const MARKET_CN_DIVIDEND: &str = "cn_dividend";
pub const MARKET_HK_REIT: &str = "hk_reit";
pub const MARKET_US_GROWTH: &str = "us_growth";

/// In-memory store of user-entered market tables.
///
/// All state lives for one process session; `reset()` puts everything
/// back to the seed defaults. The valuation engine never touches this
/// store directly — it receives cloned snapshots, so an edit landing
/// mid-pass cannot race an in-flight computation.
#[derive(Debug, Clone)]
pub struct HoldingsStore {
    /// (key, display label) in presentation order.
    markets: Vec<(String, String)>,
    tables: HashMap<String, MarketTable>,
}

impl HoldingsStore {
    /// A store pre-populated with the default markets and rows a first
    /// run starts from.
    pub fn seeded() -> Self {
        let markets = vec![
            (MARKET_CN_DIVIDEND.to_string(), "A-Share Dividend".to_string()),
            (MARKET_HK_REIT.to_string(), "HK REITs".to_string()),
            (MARKET_US_GROWTH.to_string(), "US Growth".to_string()),
        ];

        let mut tables = HashMap::new();
        tables.insert(MARKET_CN_DIVIDEND.to_string(), seed_cn_dividend());
        tables.insert(MARKET_HK_REIT.to_string(), seed_hk_reit());
        tables.insert(MARKET_US_GROWTH.to_string(), seed_us_growth());

        Self { markets, tables }
    }

    /// Keys and display labels of all markets, in presentation order.
    #[must_use]
    pub fn markets(&self) -> &[(String, String)] {
        &self.markets
    }

    /// Snapshot of one market's table. The clone is intentional: the
    /// caller's copy stays stable even if a write lands afterwards.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<MarketTable> {
        self.tables.get(key).cloned()
    }

    /// Full-table replace — covers row edits, insertions and deletions.
    ///
    /// Rejects unknown market keys and rows with negative numeric
    /// fields. Threshold pairs are *not* validated: a row with
    /// `buy_yield < sell_yield` is legal and resolved by the engine's
    /// buy-first tie-break.
    pub fn write(&mut self, key: &str, table: MarketTable) -> Result<(), CoreError> {
        if !self.tables.contains_key(key) {
            return Err(CoreError::MarketNotFound(key.to_string()));
        }
        validate_table(&table)?;
        self.tables.insert(key.to_string(), table);
        Ok(())
    }

    /// Restore every market to its seed rows.
    pub fn reset(&mut self) {
        *self = Self::seeded();
    }
}

impl Default for HoldingsStore {
    fn default() -> Self {
        Self::seeded()
    }
}

fn validate_table(table: &MarketTable) -> Result<(), CoreError> {
    let currency = table.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::Validation(format!(
            "Invalid currency code '{}': must be exactly 3 ASCII letters (e.g., CNY, HKD, USD)",
            table.currency
        )));
    }
    for (i, p) in table.positions.iter().enumerate() {
        if p.cost < 0.0 || !p.cost.is_finite() {
            return Err(CoreError::Validation(format!(
                "Row {i} ('{}'): cost must be a non-negative number, got {}",
                p.code, p.cost
            )));
        }
        if p.qty < 0.0 || !p.qty.is_finite() {
            return Err(CoreError::Validation(format!(
                "Row {i} ('{}'): quantity must be a non-negative number, got {}",
                p.code, p.qty
            )));
        }
        if p.expected_div < 0.0 || !p.expected_div.is_finite() {
            return Err(CoreError::Validation(format!(
                "Row {i} ('{}'): expected dividend must be a non-negative number, got {}",
                p.code, p.expected_div
            )));
        }
    }
    Ok(())
}

// ── Seed data ───────────────────────────────────────────────────────

fn seed_cn_dividend() -> MarketTable {
    MarketTable::with_positions(
        "CNY",
        StrategyMode::Yield,
        vec![
            Position::yield_entry("601919.SS", "COSCO Shipping", 10.0, 1000.0, 1.5, 12.0, 5.0),
            Position::yield_entry("603565.SS", "Zhonggu Logistics", 9.0, 0.0, 0.8, 8.0, 3.0),
            Position::yield_entry("601668.SS", "China State Construction", 5.5, 2000.0, 0.3, 6.0, 3.0),
            Position::yield_entry("600900.SS", "Yangtze Power", 22.0, 500.0, 0.9, 4.0, 2.0),
            Position::yield_entry("601088.SS", "China Shenhua", 30.0, 0.0, 2.5, 9.0, 4.0),
            Position::yield_entry("600938.SS", "CNOOC", 18.0, 0.0, 1.8, 10.0, 5.0),
            Position::yield_entry("000651.SZ", "Gree Electric", 35.0, 100.0, 2.8, 7.0, 3.0),
            Position::yield_entry("600941.SS", "China Mobile", 90.0, 200.0, 4.5, 6.0, 3.0),
        ],
    )
}

fn seed_hk_reit() -> MarketTable {
    MarketTable::with_positions(
        "HKD",
        StrategyMode::Yield,
        vec![
            Position::yield_entry("0823.HK", "Link REIT", 38.0, 500.0, 2.6, 8.0, 4.0),
            Position::yield_entry("0778.HK", "Fortune REIT", 4.2, 0.0, 0.33, 9.0, 5.0),
            Position::yield_entry("2778.HK", "Champion REIT", 2.8, 0.0, 0.22, 10.0, 5.0),
        ],
    )
}

fn seed_us_growth() -> MarketTable {
    MarketTable::with_positions(
        "USD",
        StrategyMode::Growth,
        vec![
            Position::growth_entry("VOO", "Vanguard S&P 500 ETF", 400.0, 10.0),
            Position::growth_entry("QQQ", "Invesco QQQ Trust", 360.0, 5.0),
            Position::growth_entry("AAPL", "Apple Inc.", 180.0, 0.0),
        ],
    )
}
