//! MACD (12, 26, 9) built from three seeded EMAs.
//!
//! The MACD line is fast EMA minus slow EMA; the signal line is an EMA of the
//! MACD line itself, which only begins seeding once both underlying EMAs have
//! produced values.

use crate::domain::indicator::ema::EmaState;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacdPoint {
    pub line: Option<f64>,
    pub signal: Option<f64>,
    pub hist: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MacdState {
    fast: EmaState,
    slow: EmaState,
    signal: EmaState,
}

impl MacdState {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        MacdState {
            fast: EmaState::new(fast),
            slow: EmaState::new(slow),
            signal: EmaState::new(signal),
        }
    }

    pub fn update(&mut self, close: f64) -> MacdPoint {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let line = match (fast, slow) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        };
        let signal = match line {
            Some(l) => self.signal.update(l),
            None => None,
        };
        let hist = match (line, signal) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        };
        MacdPoint { line, signal, hist }
    }
}
