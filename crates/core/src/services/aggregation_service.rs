use std::collections::HashMap;

use crate::models::position::StrategyMetrics;
use crate::models::summary::{AllocationSlice, MarketValuation, PortfolioSummary};

/// Combines annotated markets plus manual cash/bond inputs into
/// portfolio-level totals.
///
/// Pure and stateless — the summary is fully re-derived on every call,
/// so identical inputs always produce bit-identical output.
pub struct AggregationService;

impl AggregationService {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate all markets into a summary in `reporting_currency`.
    ///
    /// `cash_balances` maps currency code → balance in that currency;
    /// `rates` maps currency code → rate into the reporting currency.
    /// The facade always supplies a complete rate map; a missing entry
    /// degrades to 1.0 rather than dropping the balance.
    #[allow(clippy::too_many_arguments)]
    pub fn aggregate(
        &self,
        markets: &[MarketValuation],
        cash_balances: &HashMap<String, f64>,
        bond_value: f64,
        bond_currency: &str,
        rates: &HashMap<String, f64>,
        reporting_currency: &str,
    ) -> PortfolioSummary {
        let rate_for = |currency: &str| -> f64 {
            if currency.eq_ignore_ascii_case(reporting_currency) {
                1.0
            } else {
                rates.get(&currency.to_uppercase()).copied().unwrap_or(1.0)
            }
        };

        // 1. Stock totals over every annotated row
        let mut total_stock_value = 0.0;
        let mut total_day_change = 0.0;
        let mut total_profit = 0.0;
        let mut expected_annual_dividend = 0.0;

        for market in markets {
            for row in &market.positions {
                total_stock_value += row.reporting_market_value;
                // Day change must be the absolute per-unit change times
                // quantity — change_percent would not be a currency amount.
                total_day_change += row.change_amount * row.position.qty * market.rate;
                total_profit += row.reporting_profit;
                if let StrategyMetrics::Yield { .. } = row.metrics {
                    expected_annual_dividend +=
                        row.position.qty * row.position.expected_div * market.rate;
                }
            }
        }

        // 2. Manual inputs
        let total_cash: f64 = cash_balances
            .iter()
            .map(|(currency, balance)| balance * rate_for(currency))
            .sum();
        let total_bond = bond_value * rate_for(bond_currency);

        let net_worth = total_stock_value + total_cash + total_bond;

        // 3. Allocation: one slice per market plus fixed bond/cash buckets
        let mut allocation: Vec<AllocationSlice> = markets
            .iter()
            .map(|m| AllocationSlice {
                label: m.label.clone(),
                value: m.reporting_value(),
                percent: 0.0,
            })
            .collect();
        allocation.push(AllocationSlice {
            label: "bonds".to_string(),
            value: total_bond,
            percent: 0.0,
        });
        allocation.push(AllocationSlice {
            label: "cash".to_string(),
            value: total_cash,
            percent: 0.0,
        });

        // An empty portfolio yields 0% everywhere, never a division error.
        if net_worth > 0.0 {
            for slice in &mut allocation {
                slice.percent = slice.value / net_worth * 100.0;
            }
        }

        // Largest categories first.
        allocation.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        PortfolioSummary {
            currency: reporting_currency.to_uppercase(),
            net_worth,
            total_stock_value,
            total_cash,
            total_bond,
            total_day_change,
            total_profit,
            expected_annual_dividend,
            allocation,
        }
    }
}

impl Default for AggregationService {
    fn default() -> Self {
        Self::new()
    }
}
