pub mod position;
pub mod quote;
pub mod rate;
pub mod summary;
