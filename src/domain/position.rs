//! Position, trade and exit-reason records.

use chrono::{DateTime, Utc};
use std::fmt;

/// Unit counts at or below this are treated as dust and closed in full.
pub const MIN_UNITS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionStatus {
    #[default]
    Flat,
    Hold,
    ScaleOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub status: PositionStatus,
    pub entry_price: f64,
    pub highest_price: f64,
    pub units: f64,
    pub weight: f64,
    pub stop_threshold: f64,
    pub scaled_out: bool,
}

impl Position {
    pub fn flat(symbol: &str) -> Self {
        Position {
            symbol: symbol.to_string(),
            status: PositionStatus::Flat,
            entry_price: 0.0,
            highest_price: 0.0,
            units: 0.0,
            weight: 0.0,
            stop_threshold: 0.0,
            scaled_out: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != PositionStatus::Flat
    }

    pub fn unrealized_pnl_pct(&self, price: f64) -> Option<f64> {
        if !self.is_open() || self.entry_price <= 0.0 {
            return None;
        }
        Some((price - self.entry_price) / self.entry_price * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TrailingStop,
    SignalExit,
    ScaleOut,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::TrailingStop => "trailing stop",
            ExitReason::SignalExit => "signal exit",
            ExitReason::ScaleOut => "scale out",
        };
        write!(f, "{}", name)
    }
}

/// Closed or partially closed trade record.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub units_closed: f64,
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
    pub exited_at: DateTime<Utc>,
}
