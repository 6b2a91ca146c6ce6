use serde::{Deserialize, Serialize};

use super::position::AnnotatedPosition;

/// One fully annotated market, ready for aggregation and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketValuation {
    /// Stable market key (e.g., "cn_dividend").
    pub key: String,

    /// Display label (e.g., "A-Share Dividend").
    pub label: String,

    /// The market's local currency.
    pub currency: String,

    /// Local → reporting conversion rate used for this pass.
    pub rate: f64,

    pub positions: Vec<AnnotatedPosition>,
}

impl MarketValuation {
    /// Total market value of this market in the reporting currency.
    pub fn reporting_value(&self) -> f64 {
        self.positions.iter().map(|p| p.reporting_market_value).sum()
    }
}

/// One category of the asset-allocation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    /// Market label, or the fixed "bonds" / "cash" categories.
    pub label: String,

    /// Value in the reporting currency.
    pub value: f64,

    /// `value / net_worth * 100`; 0 for every slice when net worth is 0.
    pub percent: f64,
}

/// Portfolio-level totals over all markets plus manual cash/bond inputs.
///
/// Fully re-derived on every valuation pass — there is no incremental
/// update, so repeated aggregation of the same inputs is bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Currency every monetary field below is expressed in.
    pub currency: String,

    /// Stocks + cash + bonds.
    pub net_worth: f64,

    /// Sum of reporting market values over all positions.
    pub total_stock_value: f64,

    /// Manual cash balances converted to the reporting currency.
    pub total_cash: f64,

    /// Manual bond value converted to the reporting currency.
    pub total_bond: f64,

    /// Sum of absolute per-unit day changes times quantity, converted.
    pub total_day_change: f64,

    /// Sum of unrealized profit over all positions, converted.
    pub total_profit: f64,

    /// Estimated annual dividend income from yield-market holdings.
    pub expected_annual_dividend: f64,

    /// Per-category breakdown, sorted by value (largest first).
    pub allocation: Vec<AllocationSlice>,
}

/// Output of one full valuation pass: every market annotated, plus the
/// portfolio summary derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub markets: Vec<MarketValuation>,
    pub summary: PortfolioSummary,
}

/// A row that crossed one of its thresholds, lifted out of its market
/// for the alerts panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub market_label: String,
    pub code: String,
    pub name: String,
    pub price: f64,
    pub current_yield: f64,
    pub signal: super::position::Signal,
}
