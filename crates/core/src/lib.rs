pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use errors::CoreError;
use models::position::{MarketTable, Signal, StrategyMetrics};
use models::rate::RateCache;
use models::summary::{Alert, MarketValuation, ValuationReport};
use providers::frankfurter::FrankfurterRateSource;
use providers::traits::{QuoteSource, RateSource};
use providers::yahoo_finance::YahooQuoteSource;
use services::aggregation_service::AggregationService;
use services::rate_service::RateService;
use services::valuation_service::ValuationService;
use store::holdings::HoldingsStore;

/// Main entry point for the Portfolio Board core library.
///
/// Owns the session state (holdings store, rate cache, manual cash/bond
/// inputs) and the services that turn it into a valuation report. The
/// frontend edits tables and inputs between passes, then calls
/// `run_valuation_pass()` on every refresh. If an edit supersedes a pass
/// already in flight, the caller simply discards the stale report.
#[must_use]
pub struct PortfolioBoard {
    holdings: HoldingsStore,
    rate_cache: RateCache,
    valuation_service: ValuationService,
    rate_service: RateService,
    aggregation_service: AggregationService,
    reporting_currency: String,
    /// Manual cash balances, one per currency.
    cash_balances: HashMap<String, f64>,
    /// Manual bond present value and its currency.
    bond_value: f64,
    bond_currency: String,
}

impl std::fmt::Debug for PortfolioBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioBoard")
            .field("markets", &self.holdings.markets().len())
            .field("reporting_currency", &self.reporting_currency)
            .field("cash_currencies", &self.cash_balances.len())
            .field("bond_value", &self.bond_value)
            .field("cached_rates", &self.rate_cache.len())
            .finish()
    }
}

impl PortfolioBoard {
    /// A board wired to the live sources (Yahoo Finance quotes,
    /// Frankfurter FX rates), seeded with the default markets.
    pub fn new() -> Result<Self, CoreError> {
        let quotes: Arc<dyn QuoteSource> = Arc::new(YahooQuoteSource::new()?);
        let rates: Arc<dyn RateSource> = Arc::new(FrankfurterRateSource::new());
        Ok(Self::with_sources(quotes, rates))
    }

    /// A board with injected sources. This is the constructor tests use
    /// to plug in mocks; the engine and aggregator behave identically.
    pub fn with_sources(quotes: Arc<dyn QuoteSource>, rates: Arc<dyn RateSource>) -> Self {
        Self {
            holdings: HoldingsStore::seeded(),
            rate_cache: RateCache::new(),
            valuation_service: ValuationService::new(quotes),
            rate_service: RateService::new(rates),
            aggregation_service: AggregationService::new(),
            reporting_currency: "CNY".to_string(),
            cash_balances: HashMap::new(),
            bond_value: 0.0,
            bond_currency: "CNY".to_string(),
        }
    }

    // ── Holdings ────────────────────────────────────────────────────

    /// Keys and display labels of all markets, in presentation order.
    #[must_use]
    pub fn markets(&self) -> &[(String, String)] {
        self.holdings.markets()
    }

    /// Snapshot of one market's table.
    pub fn read_market(&self, key: &str) -> Result<MarketTable, CoreError> {
        self.holdings
            .read(key)
            .ok_or_else(|| CoreError::MarketNotFound(key.to_string()))
    }

    /// Replace one market's table wholesale (row edits, adds, deletes).
    pub fn write_market(&mut self, key: &str, table: MarketTable) -> Result<(), CoreError> {
        self.holdings.write(key, table)
    }

    // ── Manual inputs ───────────────────────────────────────────────

    /// Set the cash balance held in one currency.
    pub fn set_cash_balance(
        &mut self,
        currency: &str,
        amount: f64,
    ) -> Result<(), CoreError> {
        let code = validate_currency_code(currency)?;
        if amount < 0.0 || !amount.is_finite() {
            return Err(CoreError::Validation(format!(
                "Cash balance must be a non-negative number, got {amount}"
            )));
        }
        self.cash_balances.insert(code, amount);
        Ok(())
    }

    /// Drop the cash balance entry for a currency entirely.
    pub fn remove_cash_balance(&mut self, currency: &str) -> bool {
        self.cash_balances
            .remove(&currency.trim().to_uppercase())
            .is_some()
    }

    #[must_use]
    pub fn cash_balances(&self) -> &HashMap<String, f64> {
        &self.cash_balances
    }

    /// Set the bond present value and the currency it is denominated in.
    pub fn set_bond(&mut self, value: f64, currency: &str) -> Result<(), CoreError> {
        let code = validate_currency_code(currency)?;
        if value < 0.0 || !value.is_finite() {
            return Err(CoreError::Validation(format!(
                "Bond value must be a non-negative number, got {value}"
            )));
        }
        self.bond_value = value;
        self.bond_currency = code;
        Ok(())
    }

    #[must_use]
    pub fn bond(&self) -> (f64, &str) {
        (self.bond_value, &self.bond_currency)
    }

    /// Change the currency all cross-market values are converted into.
    pub fn set_reporting_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        self.reporting_currency = validate_currency_code(currency)?;
        Ok(())
    }

    #[must_use]
    pub fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }

    // ── Valuation pass ──────────────────────────────────────────────

    /// One end-to-end pass: snapshot every market, fetch quotes and
    /// rates, annotate, aggregate.
    ///
    /// Degradation is built into the layers below — a dead quote source
    /// yields zeroed markets and a dead rate source falls back to
    /// cached/default rates — so this only errors on genuinely
    /// unexpected conditions, for which the recovery action is `reset()`.
    pub async fn run_valuation_pass(&mut self) -> Result<ValuationReport, CoreError> {
        let mut markets = Vec::with_capacity(self.holdings.markets().len());

        for (key, label) in self.holdings.markets().to_vec() {
            let table = self
                .holdings
                .read(&key)
                .ok_or_else(|| CoreError::MarketNotFound(key.clone()))?;
            let rate = self
                .rate_service
                .get_rate(&mut self.rate_cache, &table.currency, &self.reporting_currency)
                .await;
            let positions = self.valuation_service.compute_market(&table, rate).await;
            markets.push(MarketValuation {
                key,
                label,
                currency: table.currency,
                rate,
                positions,
            });
        }

        // Rates for the manual inputs (cash currencies + bond currency).
        let mut rates = HashMap::new();
        let mut input_currencies: Vec<String> =
            self.cash_balances.keys().cloned().collect();
        input_currencies.push(self.bond_currency.clone());
        for currency in input_currencies {
            if currency == self.reporting_currency || rates.contains_key(&currency) {
                continue;
            }
            let rate = self
                .rate_service
                .get_rate(&mut self.rate_cache, &currency, &self.reporting_currency)
                .await;
            rates.insert(currency, rate);
        }

        let summary = self.aggregation_service.aggregate(
            &markets,
            &self.cash_balances,
            self.bond_value,
            &self.bond_currency,
            &rates,
            &self.reporting_currency,
        );

        Ok(ValuationReport { markets, summary })
    }

    /// Rows from a report whose signal crossed a threshold, in market
    /// and row order. Feeds the alerts panel.
    #[must_use]
    pub fn alerts(report: &ValuationReport) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for market in &report.markets {
            for row in &market.positions {
                if let StrategyMetrics::Yield {
                    current_yield,
                    signal: signal @ (Signal::Buy | Signal::Sell),
                } = row.metrics
                {
                    alerts.push(Alert {
                        market_label: market.label.clone(),
                        code: row.position.code.clone(),
                        name: row.position.name.clone(),
                        price: row.price,
                        current_yield,
                        signal,
                    });
                }
            }
        }
        alerts
    }

    /// Serialize a report for a frontend.
    pub fn report_to_json(report: &ValuationReport) -> Result<String, CoreError> {
        serde_json::to_string_pretty(report).map_err(CoreError::from)
    }

    // ── Administration ──────────────────────────────────────────────

    /// Full state reset: holdings back to seed defaults, rate cache
    /// emptied, manual inputs zeroed. The recovery action for anything
    /// unexpected.
    pub fn reset(&mut self) {
        self.holdings.reset();
        self.rate_cache.clear();
        self.cash_balances.clear();
        self.bond_value = 0.0;
        self.bond_currency = self.reporting_currency.clone();
    }

    /// Number of currency pairs currently cached.
    #[must_use]
    pub fn rate_cache_len(&self) -> usize {
        self.rate_cache.len()
    }

    /// Drop all cached rates; the next pass refetches everything.
    pub fn clear_rate_cache(&mut self) {
        self.rate_cache.clear();
    }
}

fn validate_currency_code(currency: &str) -> Result<String, CoreError> {
    let trimmed = currency.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::Validation(format!(
            "Invalid currency code '{currency}': must be exactly 3 ASCII letters (e.g., CNY, USD, HKD)"
        )));
    }
    Ok(trimmed)
}
