//! CSV price history adapter.
//!
//! Reads one `{symbol}.csv` file per symbol from a data directory. Expected
//! header: `date,open,high,low,close,volume` with ISO dates; rows are sorted
//! by date after loading so files need not be ordered on disk.

use crate::domain::bar::PriceBar;
use crate::domain::error::PulseError;
use crate::ports::price_port::PricePort;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub struct CsvPriceAdapter {
    data_dir: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        CsvPriceAdapter {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, PulseError> {
        let path = self.data_dir.join(format!("{}.csv", symbol));
        let mut reader = csv::Reader::from_path(&path).map_err(|e| PulseError::Feed {
            symbol: symbol.to_string(),
            reason: format!("cannot open {}: {}", path.display(), e),
        })?;

        let headers = reader
            .headers()
            .map_err(|e| PulseError::Feed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?
            .clone();
        let column = |name: &str| -> Result<usize, PulseError> {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| PulseError::Feed {
                    symbol: symbol.to_string(),
                    reason: format!("missing column '{}' in {}", name, path.display()),
                })
        };
        let date_col = column("date")?;
        let close_col = column("close")?;
        let open_col = headers.iter().position(|h| h.eq_ignore_ascii_case("open"));
        let high_col = headers.iter().position(|h| h.eq_ignore_ascii_case("high"));
        let low_col = headers.iter().position(|h| h.eq_ignore_ascii_case("low"));
        let volume_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("volume"));

        let mut bars = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| PulseError::Feed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;
            let date_str = record.get(date_col).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                PulseError::Feed {
                    symbol: symbol.to_string(),
                    reason: format!("bad date '{}': {}", date_str, e),
                }
            })?;
            let close_str = record.get(close_col).unwrap_or_default();
            let close: f64 = close_str.parse().map_err(|_| PulseError::Feed {
                symbol: symbol.to_string(),
                reason: format!("bad close '{}' on {}", close_str, date),
            })?;

            let optional = |col: Option<usize>| -> Option<f64> {
                col.and_then(|i| record.get(i)).and_then(|v| v.parse().ok())
            };

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                timestamp: date.and_time(chrono::NaiveTime::MIN).and_utc(),
                close,
                open: optional(open_col),
                high: optional(high_col),
                low: optional(low_col),
                volume: optional(volume_col),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

#[async_trait]
impl PricePort for CsvPriceAdapter {
    async fn recent_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<PriceBar>, PulseError> {
        let bars = self.load_bars(symbol)?;
        let start = bars.len().saturating_sub(lookback);
        Ok(bars[start..].to_vec())
    }
}
