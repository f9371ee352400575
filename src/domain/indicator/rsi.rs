//! Relative Strength Index using Wilder smoothing.
//!
//! The first `period` gains and losses are averaged directly; subsequent
//! updates use `avg = (prev * (period - 1) + current) / period`. When the
//! average loss is zero the RSI saturates at 100.

#[derive(Debug, Clone)]
pub struct RsiState {
    period: usize,
    prev_close: Option<f64>,
    seed_gains: f64,
    seed_losses: f64,
    seed_count: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl RsiState {
    pub fn new(period: usize) -> Self {
        RsiState {
            period,
            prev_close: None,
            seed_gains: 0.0,
            seed_losses: 0.0,
            seed_count: 0,
            avg_gain: None,
            avg_loss: None,
        }
    }

    /// Feed one close and return the RSI, or `None` until `period` price
    /// changes have been observed.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = match self.prev_close.replace(close) {
            Some(p) => p,
            None => return None,
        };
        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        match (self.avg_gain, self.avg_loss) {
            (Some(ag), Some(al)) => {
                let n = self.period as f64;
                self.avg_gain = Some((ag * (n - 1.0) + gain) / n);
                self.avg_loss = Some((al * (n - 1.0) + loss) / n);
            }
            _ => {
                self.seed_gains += gain;
                self.seed_losses += loss;
                self.seed_count += 1;
                if self.seed_count >= self.period {
                    self.avg_gain = Some(self.seed_gains / self.period as f64);
                    self.avg_loss = Some(self.seed_losses / self.period as f64);
                }
            }
        }

        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        let (ag, al) = (self.avg_gain?, self.avg_loss?);
        if al == 0.0 {
            return Some(100.0);
        }
        let rs = ag / al;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}
