// ═══════════════════════════════════════════════════════════════════
// Valuation Engine Tests — derived columns, signals, degradation
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use portfolio_board_core::errors::CoreError;
use portfolio_board_core::models::position::{
    MarketTable, Position, Signal, StrategyMetrics, StrategyMode,
};
use portfolio_board_core::models::quote::QuoteResult;
use portfolio_board_core::providers::traits::QuoteSource;
use portfolio_board_core::services::valuation_service::ValuationService;

// ═══════════════════════════════════════════════════════════════════
// Mock Sources
// ═══════════════════════════════════════════════════════════════════

/// Serves a fixed quote map and counts batch calls.
struct MockQuoteSource {
    quotes: HashMap<String, QuoteResult>,
    calls: AtomicUsize,
}

impl MockQuoteSource {
    fn new(entries: Vec<(&str, QuoteResult)>) -> Self {
        Self {
            quotes: entries
                .into_iter()
                .map(|(code, q)| (code.to_string(), q))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &str {
        "MockQuotes"
    }

    async fn fetch_quotes(
        &self,
        _codes: &[String],
    ) -> Result<HashMap<String, QuoteResult>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.quotes.clone())
    }
}

/// Fails every batch, simulating the network being down.
struct FailingQuoteSource;

#[async_trait]
impl QuoteSource for FailingQuoteSource {
    fn name(&self) -> &str {
        "FailingQuotes"
    }

    async fn fetch_quotes(
        &self,
        _codes: &[String],
    ) -> Result<HashMap<String, QuoteResult>, CoreError> {
        Err(CoreError::Network("simulated outage".into()))
    }
}

fn price(last: f64, previous_close: f64) -> QuoteResult {
    QuoteResult::Price {
        last,
        previous_close: Some(previous_close),
    }
}

fn yield_table(positions: Vec<Position>) -> MarketTable {
    MarketTable::with_positions("CNY", StrategyMode::Yield, positions)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ═══════════════════════════════════════════════════════════════════
// Yield mode — derived columns and signals
// ═══════════════════════════════════════════════════════════════════

mod yield_mode {
    use super::*;

    #[tokio::test]
    async fn high_yield_triggers_buy_signal() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(10.0, 9.9))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![Position::yield_entry(
            "X", "Example", 10.0, 1000.0, 1.5, 12.0, 5.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert!(approx(row.price, 10.0));
        assert!(approx(row.local_market_value, 10_000.0));
        assert!(approx(row.reporting_market_value, 10_000.0));
        // Bought at cost == price, so unrealized profit is zero.
        assert!(approx(row.reporting_profit, 0.0));
        match row.metrics {
            StrategyMetrics::Yield {
                current_yield,
                signal,
            } => {
                assert!(approx(current_yield, 15.0));
                assert_eq!(signal, Signal::Buy);
            }
            _ => panic!("expected yield metrics"),
        }
    }

    #[tokio::test]
    async fn low_yield_triggers_sell_signal() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(100.0, 99.0))]));
        let engine = ValuationService::new(source);
        // 1.5 / 100 = 1.5% <= sell threshold of 5%
        let table = yield_table(vec![Position::yield_entry(
            "X", "Example", 10.0, 100.0, 1.5, 12.0, 5.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows[0].metrics.signal(), Some(Signal::Sell));
    }

    #[tokio::test]
    async fn mid_yield_holds() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(20.0, 20.0))]));
        let engine = ValuationService::new(source);
        // 1.5 / 20 = 7.5%, between 5% and 12%
        let table = yield_table(vec![Position::yield_entry(
            "X", "Example", 10.0, 100.0, 1.5, 12.0, 5.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows[0].metrics.signal(), Some(Signal::Hold));
    }

    #[tokio::test]
    async fn zero_price_yields_data_error_regardless_of_thresholds() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(0.0, 9.9))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![Position::yield_entry(
            "X", "Example", 10.0, 1000.0, 1.5, 0.0, 0.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        let row = &rows[0];
        assert_eq!(row.metrics.signal(), Some(Signal::DataError));
        assert!(approx(row.metrics.current_yield().unwrap(), 0.0));
        assert!(approx(row.change_amount, 0.0));
        assert!(approx(row.change_percent, 0.0));
    }

    #[tokio::test]
    async fn buy_check_wins_when_thresholds_are_inverted() {
        // Malformed row: buy threshold below sell threshold. The yield
        // (8%) satisfies both checks; buy is evaluated first and wins.
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(10.0, 10.0))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![Position::yield_entry(
            "X", "Example", 10.0, 100.0, 0.8, 5.0, 12.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows[0].metrics.signal(), Some(Signal::Buy));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Growth mode
// ═══════════════════════════════════════════════════════════════════

mod growth_mode {
    use super::*;

    #[tokio::test]
    async fn total_return_from_cost_basis() {
        let source = Arc::new(MockQuoteSource::new(vec![("VOO", price(440.0, 430.0))]));
        let engine = ValuationService::new(source);
        let table = MarketTable::with_positions(
            "USD",
            StrategyMode::Growth,
            vec![Position::growth_entry("VOO", "Vanguard S&P 500", 400.0, 10.0)],
        );

        let rows = engine.compute_market(&table, 1.0).await;
        match rows[0].metrics {
            StrategyMetrics::Growth {
                total_return_percent,
            } => assert!(approx(total_return_percent, 10.0)),
            _ => panic!("expected growth metrics"),
        }
        assert!(approx(rows[0].change_amount, 10.0));
    }

    #[tokio::test]
    async fn zero_cost_basis_returns_zero_percent() {
        let source = Arc::new(MockQuoteSource::new(vec![("AAPL", price(180.0, 175.0))]));
        let engine = ValuationService::new(source);
        let table = MarketTable::with_positions(
            "USD",
            StrategyMode::Growth,
            vec![Position::growth_entry("AAPL", "Apple", 0.0, 5.0)],
        );

        let rows = engine.compute_market(&table, 1.0).await;
        match rows[0].metrics {
            StrategyMetrics::Growth {
                total_return_percent,
            } => assert!(approx(total_return_percent, 0.0)),
            _ => panic!("expected growth metrics"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Day change
// ═══════════════════════════════════════════════════════════════════

mod day_change {
    use super::*;

    #[tokio::test]
    async fn change_fields_from_previous_close() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(10.0, 9.9))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![Position::yield_entry(
            "X", "Example", 10.0, 100.0, 1.0, 50.0, 1.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert!((rows[0].change_amount - 0.1).abs() < 1e-9);
        assert!((rows[0].change_percent - 0.1 / 9.9 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn non_positive_previous_close_zeroes_change() {
        let source = Arc::new(MockQuoteSource::new(vec![
            ("A", price(10.0, 0.0)),
            ("B", price(10.0, -3.0)),
            (
                "C",
                QuoteResult::Price {
                    last: 10.0,
                    previous_close: None,
                },
            ),
        ]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("A", "A", 1.0, 1.0, 0.0, 0.0, 0.0),
            Position::yield_entry("B", "B", 1.0, 1.0, 0.0, 0.0, 0.0),
            Position::yield_entry("C", "C", 1.0, 1.0, 0.0, 0.0, 0.0),
        ]);

        let rows = engine.compute_market(&table, 1.0).await;
        for row in &rows {
            assert!(approx(row.change_amount, 0.0));
            assert!(approx(row.change_percent, 0.0));
            // Change is zeroed but price is still real.
            assert!(approx(row.price, 10.0));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Degradation — per-identifier and whole-batch failures
// ═══════════════════════════════════════════════════════════════════

mod degradation {
    use super::*;

    #[tokio::test]
    async fn unavailable_identifier_zeroes_only_its_row() {
        let source = Arc::new(MockQuoteSource::new(vec![
            ("GOOD", price(10.0, 9.9)),
            ("BAD", QuoteResult::Unavailable),
        ]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("GOOD", "Good", 10.0, 100.0, 1.5, 12.0, 5.0),
            Position::yield_entry("BAD", "Bad", 10.0, 100.0, 1.5, 12.0, 5.0),
        ]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows[0].metrics.signal(), Some(Signal::Buy));
        let bad = &rows[1];
        assert!(approx(bad.price, 0.0));
        assert!(approx(bad.local_market_value, 0.0));
        assert_eq!(bad.metrics.signal(), Some(Signal::DataError));
    }

    #[tokio::test]
    async fn identifier_missing_from_batch_is_unavailable() {
        let source = Arc::new(MockQuoteSource::new(vec![("KNOWN", price(5.0, 5.0))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![Position::yield_entry(
            "UNKNOWN", "Unknown", 1.0, 10.0, 0.5, 10.0, 2.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows[0].metrics.signal(), Some(Signal::DataError));
        assert!(approx(rows[0].price, 0.0));
    }

    #[tokio::test]
    async fn whole_batch_failure_returns_zeroed_rows_not_error() {
        let engine = ValuationService::new(Arc::new(FailingQuoteSource));
        let table = yield_table(vec![
            Position::yield_entry("X", "X", 10.0, 1000.0, 1.5, 12.0, 5.0),
            Position::yield_entry("Y", "Y", 5.0, 500.0, 0.5, 8.0, 3.0),
        ]);

        let rows = engine.compute_market(&table, 7.2).await;

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(approx(row.price, 0.0));
            assert!(approx(row.change_amount, 0.0));
            assert!(approx(row.change_percent, 0.0));
            assert!(approx(row.local_market_value, 0.0));
            assert!(approx(row.reporting_market_value, 0.0));
            assert_eq!(row.metrics.signal(), Some(Signal::DataError));
            assert!(approx(row.metrics.current_yield().unwrap(), 0.0));
            // Whole-batch failure zeroes every derived column; profit is
            // not computed against the substituted zero price.
            assert!(approx(row.reporting_profit, 0.0));
        }
    }

    #[tokio::test]
    async fn single_failed_identifier_still_prices_profit_at_zero_price() {
        // Contrast with the whole-batch case: a per-identifier failure
        // substitutes price 0 and the loss against cost stays visible.
        let source = Arc::new(MockQuoteSource::new(vec![("OK", price(5.0, 5.0))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("OK", "Ok", 5.0, 100.0, 0.0, 0.0, 0.0),
            Position::yield_entry("GONE", "Gone", 10.0, 1000.0, 1.5, 12.0, 5.0),
        ]);

        let rows = engine.compute_market(&table, 7.2).await;
        assert!(approx(rows[1].reporting_profit, -10.0 * 1000.0 * 7.2));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Row-set invariants
// ═══════════════════════════════════════════════════════════════════

mod row_invariants {
    use super::*;

    #[tokio::test]
    async fn blank_codes_filtered_preserving_order() {
        let source = Arc::new(MockQuoteSource::new(vec![
            ("A", price(1.0, 1.0)),
            ("B", price(2.0, 2.0)),
        ]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("A", "First", 1.0, 1.0, 0.0, 0.0, 0.0),
            Position::yield_entry("", "Blank", 1.0, 1.0, 0.0, 0.0, 0.0),
            Position::yield_entry("   ", "Whitespace", 1.0, 1.0, 0.0, 0.0, 0.0),
            Position::yield_entry("B", "Second", 2.0, 1.0, 0.0, 0.0, 0.0),
        ]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].position.code, "A");
        assert_eq!(rows[1].position.code, "B");
    }

    #[tokio::test]
    async fn duplicate_codes_each_get_their_own_row() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(10.0, 9.0))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("X", "Lot 1", 8.0, 100.0, 1.0, 20.0, 1.0),
            Position::yield_entry("X", "Lot 2", 12.0, 200.0, 1.0, 20.0, 1.0),
        ]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert_eq!(rows.len(), 2);
        // Same quote, different cost/qty per lot.
        assert!(approx(rows[0].price, 10.0));
        assert!(approx(rows[1].price, 10.0));
        assert!(approx(rows[0].reporting_profit, 200.0));
        assert!(approx(rows[1].reporting_profit, -400.0));
    }

    #[tokio::test]
    async fn empty_table_skips_the_fetch_entirely() {
        let source = Arc::new(MockQuoteSource::new(vec![]));
        let engine = ValuationService::new(source.clone());

        let empty = yield_table(vec![]);
        assert!(engine.compute_market(&empty, 1.0).await.is_empty());

        let all_blank = yield_table(vec![Position::yield_entry(
            "", "Blank", 0.0, 0.0, 0.0, 0.0, 0.0,
        )]);
        assert!(engine.compute_market(&all_blank, 1.0).await.is_empty());

        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn recomputation_with_identical_inputs_is_identical() {
        let source = Arc::new(MockQuoteSource::new(vec![
            ("X", price(10.0, 9.9)),
            ("Y", price(3.3, 3.4)),
        ]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("X", "X", 10.0, 1000.0, 1.5, 12.0, 5.0),
            Position::yield_entry("Y", "Y", 4.0, 300.0, 0.2, 9.0, 2.0),
        ]);

        let first = engine.compute_market(&table, 7.2).await;
        let second = engine.compute_market(&table, 7.2).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn all_derived_fields_are_finite() {
        // Pathological quotes must never leak NaN/inf into a row.
        let source = Arc::new(MockQuoteSource::new(vec![
            ("NAN", price(f64::NAN, 9.0)),
            ("INF", price(f64::INFINITY, 9.0)),
            ("OK", price(10.0, 9.0)),
        ]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("NAN", "NaN", 1.0, 10.0, 0.5, 5.0, 1.0),
            Position::yield_entry("INF", "Inf", 1.0, 10.0, 0.5, 5.0, 1.0),
            Position::yield_entry("OK", "Ok", 1.0, 10.0, 0.5, 5.0, 1.0),
        ]);

        let rows = engine.compute_market(&table, 7.2).await;
        for row in &rows {
            assert!(row.price.is_finite());
            assert!(row.change_amount.is_finite());
            assert!(row.change_percent.is_finite());
            assert!(row.local_market_value.is_finite());
            assert!(row.reporting_market_value.is_finite());
            assert!(row.reporting_profit.is_finite());
            assert!(row.market_weight_percent.is_finite());
        }
        // Non-finite last prices degrade like unavailable quotes.
        assert_eq!(rows[0].metrics.signal(), Some(Signal::DataError));
        assert_eq!(rows[1].metrics.signal(), Some(Signal::DataError));
        assert_eq!(rows[2].metrics.signal(), Some(Signal::Buy));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Currency conversion & market weights
// ═══════════════════════════════════════════════════════════════════

mod conversion_and_weights {
    use super::*;

    #[tokio::test]
    async fn reporting_values_use_the_conversion_rate() {
        let source = Arc::new(MockQuoteSource::new(vec![("X", price(10.0, 10.0))]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![Position::yield_entry(
            "X", "X", 8.0, 100.0, 0.5, 50.0, 0.0,
        )]);

        let rows = engine.compute_market(&table, 7.2).await;
        let row = &rows[0];
        assert!(approx(row.local_market_value, 1000.0));
        assert!(approx(row.reporting_market_value, 7200.0));
        assert!(approx(row.reporting_profit, 2.0 * 100.0 * 7.2));
    }

    #[tokio::test]
    async fn market_weights_sum_to_one_hundred() {
        let source = Arc::new(MockQuoteSource::new(vec![
            ("A", price(10.0, 10.0)),
            ("B", price(20.0, 20.0)),
            ("C", price(5.0, 5.0)),
        ]));
        let engine = ValuationService::new(source);
        let table = yield_table(vec![
            Position::yield_entry("A", "A", 1.0, 100.0, 0.0, 0.0, 0.0),
            Position::yield_entry("B", "B", 1.0, 50.0, 0.0, 0.0, 0.0),
            Position::yield_entry("C", "C", 1.0, 400.0, 0.0, 0.0, 0.0),
        ]);

        let rows = engine.compute_market(&table, 1.0).await;
        let total: f64 = rows.iter().map(|r| r.market_weight_percent).sum();
        assert!((total - 100.0).abs() < 1e-6);
        // 1000 / 4000, 1000 / 4000, 2000 / 4000
        assert!(approx(rows[0].market_weight_percent, 25.0));
        assert!(approx(rows[1].market_weight_percent, 25.0));
        assert!(approx(rows[2].market_weight_percent, 50.0));
    }

    #[tokio::test]
    async fn valueless_market_has_all_zero_weights() {
        let source = Arc::new(MockQuoteSource::new(vec![("A", price(10.0, 10.0))]));
        let engine = ValuationService::new(source);
        // Watch-list rows only: qty 0 everywhere.
        let table = yield_table(vec![Position::yield_entry(
            "A", "A", 1.0, 0.0, 0.0, 0.0, 0.0,
        )]);

        let rows = engine.compute_market(&table, 1.0).await;
        assert!(approx(rows[0].market_weight_percent, 0.0));
    }
}
