//! Annualized volatility over a rolling window of log returns.
//!
//! Keeps the most recent `window` log returns and reports the sample standard
//! deviation scaled by the square root of the trading-day count. Undefined
//! until the window is full.

use std::collections::VecDeque;

pub const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct VolWindow {
    window: usize,
    prev_close: Option<f64>,
    returns: VecDeque<f64>,
}

impl VolWindow {
    pub fn new(window: usize) -> Self {
        VolWindow {
            window,
            prev_close: None,
            returns: VecDeque::with_capacity(window + 1),
        }
    }

    /// Feed one close and return the annualized volatility once the window
    /// holds `window` log returns.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if let Some(prev) = self.prev_close.replace(close) {
            self.returns.push_back((close / prev).ln());
            if self.returns.len() > self.window {
                self.returns.pop_front();
            }
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.returns.len() < self.window || self.window < 2 {
            return None;
        }
        let n = self.returns.len() as f64;
        let mean = self.returns.iter().sum::<f64>() / n;
        let var = self
            .returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        Some(var.sqrt() * TRADING_DAYS.sqrt())
    }
}
