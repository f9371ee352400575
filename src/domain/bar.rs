//! Price bar representation.
//!
//! A bar carries a mandatory close plus optional OHLV fields; sequences are
//! chronologically ordered and may contain gaps, which downstream consumers
//! tolerate but never reorder.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceBar {
    pub fn new(symbol: &str, timestamp: DateTime<Utc>, close: f64) -> Self {
        PriceBar {
            symbol: symbol.to_string(),
            timestamp,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }

    /// A close usable for indicator and state-machine purposes: finite and positive.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
