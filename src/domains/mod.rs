pub mod export;
pub mod units;
