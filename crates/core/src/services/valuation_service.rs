use std::sync::Arc;
use std::time::Duration;

use crate::models::position::{
    AnnotatedPosition, MarketTable, Position, Signal, StrategyMetrics, StrategyMode,
};
use crate::models::quote::QuoteResult;
use crate::providers::traits::QuoteSource;

/// Upper bound on one batched quote fetch. A timed-out batch is treated
/// exactly like a failed one; a valuation pass must never hang on a
/// slow source.
const QUOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The valuation engine: annotates one market's positions with prices,
/// day changes, currency-converted values and strategy signals.
///
/// Resilience contract:
/// - a single failed identifier becomes a zeroed row, never an error;
/// - a failed (or timed-out) batch zeroes the whole market;
/// - every derived field of every output row is a finite number.
///
/// The output has the same length and order as the input minus rows
/// with blank codes, and the engine never mutates the input table.
pub struct ValuationService {
    quotes: Arc<dyn QuoteSource>,
}

impl ValuationService {
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self { quotes }
    }

    /// Annotate every quotable row of `table`, converting local values
    /// into the reporting currency at `rate`.
    ///
    /// An empty (or all-blank) table short-circuits without touching the
    /// quote source — an empty batch is an error condition for some
    /// sources, not a no-op.
    pub async fn compute_market(
        &self,
        table: &MarketTable,
        rate: f64,
    ) -> Vec<AnnotatedPosition> {
        let positions: Vec<&Position> =
            table.positions.iter().filter(|p| p.has_code()).collect();
        if positions.is_empty() {
            return Vec::new();
        }

        let codes: Vec<String> = positions.iter().map(|p| p.code.clone()).collect();

        let quotes = match tokio::time::timeout(
            QUOTE_FETCH_TIMEOUT,
            self.quotes.fetch_quotes(&codes),
        )
        .await
        {
            Ok(Ok(quotes)) => quotes,
            // Whole-batch failure or timeout: the pipeline must stay
            // renderable, so every row gets all-zero derived fields.
            // Unlike a single failed identifier, nothing is computed
            // against the zero price here.
            Ok(Err(_)) | Err(_) => {
                return positions
                    .into_iter()
                    .map(|p| zeroed_row(p, table.mode))
                    .collect();
            }
        };

        let mut annotated: Vec<AnnotatedPosition> = positions
            .into_iter()
            .map(|position| {
                let quote = quotes
                    .get(&position.code)
                    .copied()
                    .unwrap_or(QuoteResult::Unavailable);
                annotate(position, &quote, rate, table.mode)
            })
            .collect();

        apply_market_weights(&mut annotated);
        annotated
    }
}

/// Derive every column for one position from its quote.
fn annotate(
    position: &Position,
    quote: &QuoteResult,
    rate: f64,
    mode: StrategyMode,
) -> AnnotatedPosition {
    // A missing/non-finite last price zeroes the whole row.
    let price = quote.last_price().unwrap_or(0.0);

    let (change_amount, change_percent) = match quote.previous_close() {
        Some(prev) if price > 0.0 => {
            let amount = price - prev;
            (amount, amount / prev * 100.0)
        }
        _ => (0.0, 0.0),
    };

    let local_market_value = price * position.qty;
    let reporting_market_value = local_market_value * rate;
    let reporting_profit = (price - position.cost) * position.qty * rate;

    let metrics = match mode {
        StrategyMode::Yield => {
            let current_yield = if price > 0.0 {
                finite_or_zero(position.expected_div / price * 100.0)
            } else {
                0.0
            };
            // Buy is checked before sell on purpose: when a malformed row
            // has buy_yield < sell_yield and the yield satisfies both,
            // the buy signal wins. This tie-break is part of the contract.
            let signal = if price <= 0.0 {
                Signal::DataError
            } else if current_yield >= position.buy_yield {
                Signal::Buy
            } else if current_yield <= position.sell_yield {
                Signal::Sell
            } else {
                Signal::Hold
            };
            StrategyMetrics::Yield {
                current_yield,
                signal,
            }
        }
        StrategyMode::Growth => {
            let total_return_percent = if position.cost > 0.0 {
                finite_or_zero((price - position.cost) / position.cost * 100.0)
            } else {
                0.0
            };
            StrategyMetrics::Growth {
                total_return_percent,
            }
        }
    };

    AnnotatedPosition {
        position: position.clone(),
        price: finite_or_zero(price),
        change_amount: finite_or_zero(change_amount),
        change_percent: finite_or_zero(change_percent),
        local_market_value: finite_or_zero(local_market_value),
        reporting_market_value: finite_or_zero(reporting_market_value),
        reporting_profit: finite_or_zero(reporting_profit),
        market_weight_percent: 0.0, // filled by apply_market_weights
        metrics,
    }
}

/// A row with every derived column zeroed, used when the whole batch
/// failed and no quote data exists at all.
fn zeroed_row(position: &Position, mode: StrategyMode) -> AnnotatedPosition {
    let metrics = match mode {
        StrategyMode::Yield => StrategyMetrics::Yield {
            current_yield: 0.0,
            signal: Signal::DataError,
        },
        StrategyMode::Growth => StrategyMetrics::Growth {
            total_return_percent: 0.0,
        },
    };
    AnnotatedPosition {
        position: position.clone(),
        price: 0.0,
        change_amount: 0.0,
        change_percent: 0.0,
        local_market_value: 0.0,
        reporting_market_value: 0.0,
        reporting_profit: 0.0,
        market_weight_percent: 0.0,
        metrics,
    }
}

/// Final pass: each row's share of the market's total local value.
/// All zeros when the market holds no value (watch-list only).
fn apply_market_weights(rows: &mut [AnnotatedPosition]) {
    let total: f64 = rows.iter().map(|r| r.local_market_value).sum();
    if total > 0.0 {
        for row in rows.iter_mut() {
            row.market_weight_percent = finite_or_zero(row.local_market_value / total * 100.0);
        }
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
