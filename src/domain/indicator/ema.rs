//! Exponential moving average with simple-average seeding.
//!
//! The first `period` values are accumulated into a simple average; once
//! seeded, updates use the standard smoothing factor k = 2 / (period + 1).

#[derive(Debug, Clone)]
pub struct EmaState {
    period: usize,
    k: f64,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Self {
        EmaState {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    /// Feed one value and return the current EMA, or `None` while seeding.
    pub fn update(&mut self, input: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = (input - prev) * self.k + prev;
                self.value = Some(next);
                self.value
            }
            None => {
                self.seed_sum += input;
                self.seed_count += 1;
                if self.seed_count >= self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
                self.value
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
