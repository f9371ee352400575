//! Price history port.

use crate::domain::bar::PriceBar;
use crate::domain::error::PulseError;
use async_trait::async_trait;

#[async_trait]
pub trait PricePort: Send + Sync {
    /// Fetch up to `lookback` most recent bars for a symbol, oldest first.
    async fn recent_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<PriceBar>, PulseError>;
}
