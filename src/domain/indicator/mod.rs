//! Streaming technical indicators.
//!
//! Each indicator keeps its own incremental state; [`IndicatorPipeline`]
//! bundles the full set used by the signal layer and folds bars one at a
//! time, so batch and realtime paths share the exact same arithmetic.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod volatility;

use crate::domain::bar::PriceBar;
use macd::MacdState;
use rsi::RsiState;
use volatility::VolWindow;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const VOL_WINDOW: usize = 20;

/// Indicator values as of a single bar. Any field may be `None` while its
/// underlying window is still warming up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub ann_vol: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    rsi: RsiState,
    macd: MacdState,
    vol: VolWindow,
}

impl IndicatorPipeline {
    pub fn new() -> Self {
        IndicatorPipeline {
            rsi: RsiState::new(RSI_PERIOD),
            macd: MacdState::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL),
            vol: VolWindow::new(VOL_WINDOW),
        }
    }

    /// Fold one bar into the pipeline. Bars without a usable close leave all
    /// state untouched and yield an empty snapshot.
    pub fn update(&mut self, bar: &PriceBar) -> IndicatorSnapshot {
        if !bar.has_valid_close() {
            return IndicatorSnapshot::default();
        }
        let rsi = self.rsi.update(bar.close);
        let macd = self.macd.update(bar.close);
        let ann_vol = self.vol.update(bar.close);
        IndicatorSnapshot {
            rsi,
            macd_line: macd.line,
            macd_signal: macd.signal,
            macd_hist: macd.hist,
            ann_vol,
        }
    }
}

impl Default for IndicatorPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute one snapshot per bar over a chronological series.
pub fn compute_indicators(bars: &[PriceBar]) -> Vec<IndicatorSnapshot> {
    let mut pipeline = IndicatorPipeline::new();
    bars.iter().map(|bar| pipeline.update(bar)).collect()
}
