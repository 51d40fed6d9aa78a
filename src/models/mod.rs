//! Data models for currency pairs and sizing requests/results.

mod pair;
mod sizing;

pub use pair::CurrencyPair;
pub use sizing::{SizingRequest, SizingResult};
