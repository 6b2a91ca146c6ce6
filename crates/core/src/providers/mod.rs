pub mod traits;

// Live data source implementations
pub mod frankfurter;
pub mod yahoo_finance;
