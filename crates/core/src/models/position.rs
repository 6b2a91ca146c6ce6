use serde::{Deserialize, Serialize};

/// Strategy under which a market's positions are evaluated.
/// Determines which derived metrics and signals are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyMode {
    /// Buy/sell signals driven by dividend yield versus user thresholds.
    Yield,
    /// Only total percentage return is tracked; no yield signal.
    Growth,
}

impl std::fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyMode::Yield => write!(f, "Yield"),
            StrategyMode::Growth => write!(f, "Growth"),
        }
    }
}

/// One user-entered holding in one market.
///
/// `code` is an opaque identifier in the quote source's namespace
/// (e.g., "601919.SS", "0823.HK", "VOO"). `qty == 0` is a valid
/// watch-list row. The engine only ever reads positions; all mutation
/// happens through full-table replaces on the holdings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Quote-source identifier for the instrument.
    pub code: String,

    /// Human-readable label; never used in computation.
    pub name: String,

    /// Average cost per unit in the market's local currency.
    pub cost: f64,

    /// Units held. Decimal on purpose: fractional units are legal.
    pub qty: f64,

    /// Expected dividend per unit. Meaningful in yield markets only.
    pub expected_div: f64,

    /// Dividend yield (%) at or above which the row signals a buy.
    pub buy_yield: f64,

    /// Dividend yield (%) at or below which the row signals a sell.
    pub sell_yield: f64,
}

impl Position {
    /// A yield-market row with full dividend parameters.
    pub fn yield_entry(
        code: impl Into<String>,
        name: impl Into<String>,
        cost: f64,
        qty: f64,
        expected_div: f64,
        buy_yield: f64,
        sell_yield: f64,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            cost,
            qty,
            expected_div,
            buy_yield,
            sell_yield,
        }
    }

    /// A growth-market row: dividend fields are irrelevant and zeroed.
    pub fn growth_entry(
        code: impl Into<String>,
        name: impl Into<String>,
        cost: f64,
        qty: f64,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            cost,
            qty,
            expected_div: 0.0,
            buy_yield: 0.0,
            sell_yield: 0.0,
        }
    }

    /// A freshly added row with everything zeroed except identity,
    /// mirroring what a user gets when they add a ticker to watch.
    pub fn watch_entry(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self::yield_entry(code, name, 0.0, 0.0, 0.0, 5.0, 2.0)
    }

    /// Rows with a blank code cannot be quoted and are filtered out
    /// before any fetch.
    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty()
    }
}

/// Ordered sequence of positions sharing one local currency and one
/// strategy mode. Two markets with the same currency may still differ
/// in mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTable {
    /// ISO 4217 code of the market's local currency (e.g., "CNY", "HKD").
    pub currency: String,

    /// Strategy applied to every row of this table.
    pub mode: StrategyMode,

    /// The rows, in user-defined order.
    pub positions: Vec<Position>,
}

impl MarketTable {
    pub fn new(currency: impl Into<String>, mode: StrategyMode) -> Self {
        Self {
            currency: currency.into().to_uppercase(),
            mode,
            positions: Vec::new(),
        }
    }

    pub fn with_positions(
        currency: impl Into<String>,
        mode: StrategyMode,
        positions: Vec<Position>,
    ) -> Self {
        Self {
            currency: currency.into().to_uppercase(),
            mode,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Buy/sell advice attached to a yield-mode row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
    /// Quote fetch failed or returned a non-positive price; thresholds
    /// are meaningless without a real price.
    DataError,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "Buy"),
            Signal::Sell => write!(f, "Sell"),
            Signal::Hold => write!(f, "Hold"),
            Signal::DataError => write!(f, "DataError"),
        }
    }
}

/// Metrics that only exist under one strategy mode.
///
/// Keeping these in an enum (rather than optional columns) means a row
/// can never be missing the fields its mode requires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrategyMetrics {
    Yield {
        /// `expected_div / price * 100`, 0 when price is not positive.
        current_yield: f64,
        signal: Signal,
    },
    Growth {
        /// `(price - cost) / cost * 100`, 0 when cost is not positive.
        total_return_percent: f64,
    },
}

impl StrategyMetrics {
    pub fn signal(&self) -> Option<Signal> {
        match self {
            StrategyMetrics::Yield { signal, .. } => Some(*signal),
            StrategyMetrics::Growth { .. } => None,
        }
    }

    pub fn current_yield(&self) -> Option<f64> {
        match self {
            StrategyMetrics::Yield { current_yield, .. } => Some(*current_yield),
            StrategyMetrics::Growth { .. } => None,
        }
    }
}

/// A position plus every derived column the presentation layer needs.
///
/// The engine guarantees that every numeric field is finite — downstream
/// aggregation and rendering assume total column presence and never
/// re-check for NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPosition {
    pub position: Position,

    /// Last traded price in local currency; 0 when the quote failed.
    pub price: f64,

    /// `price - previous_close`, 0 when previous close is missing or
    /// non-positive.
    pub change_amount: f64,

    /// Day change as a percentage of previous close.
    pub change_percent: f64,

    /// `price * qty` in local currency.
    pub local_market_value: f64,

    /// Market value converted to the reporting currency.
    pub reporting_market_value: f64,

    /// `(price - cost) * qty`, converted to the reporting currency.
    pub reporting_profit: f64,

    /// This row's share of its market's total local market value (%).
    pub market_weight_percent: f64,

    /// Yield or growth metrics, matching the table's mode.
    pub metrics: StrategyMetrics,
}

impl AnnotatedPosition {
    /// True when this row should appear in the alerts panel.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self.metrics.signal(),
            Some(Signal::Buy) | Some(Signal::Sell)
        )
    }
}
