//! Response types for the rate provider APIs.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Frankfurter /latest response: rates keyed by uppercase quote code.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestRatesResponse {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub rates: HashMap<String, Decimal>,
}

/// One entry of a floatrates daily file, keyed by lowercase quote code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRateEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub inverse_rate: Decimal,
    #[serde(default)]
    pub date: String,
}
