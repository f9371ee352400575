//! Position sizing: fractional Kelly scaled by inverse volatility.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::compute_indicators;
use crate::domain::profile::StrategyProfile;

/// Guards the volatility divisor against zero.
pub const VOL_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingResult {
    pub ann_vol: Option<f64>,
    pub vol_weight: f64,
    pub kelly_f: f64,
    pub weight: f64,
}

/// Fractional Kelly from the profile's assumed win rate and payoff ratio,
/// floored at zero.
pub fn optimal_kelly(profile: &StrategyProfile) -> f64 {
    let p = profile.win_rate;
    let b = profile.payoff_ratio;
    let base = (b * p - (1.0 - p)) / b;
    base.max(0.0) * profile.kelly_fraction
}

/// Combine the Kelly fraction with inverse-volatility scaling. An undefined
/// volatility produces a zero weight rather than a guess.
pub fn size_from_vol(ann_vol: Option<f64>, profile: &StrategyProfile) -> SizingResult {
    let kelly_f = optimal_kelly(profile);
    match ann_vol {
        Some(vol) => {
            let vol_weight = profile.target_vol / (vol + VOL_EPSILON);
            SizingResult {
                ann_vol,
                vol_weight,
                kelly_f,
                weight: (vol_weight * kelly_f).min(1.0),
            }
        }
        None => SizingResult {
            ann_vol: None,
            vol_weight: 0.0,
            kelly_f,
            weight: 0.0,
        },
    }
}

/// Size from a bar history, using the volatility as of the final bar.
pub fn size_position(bars: &[PriceBar], profile: &StrategyProfile) -> SizingResult {
    let ann_vol = compute_indicators(bars)
        .last()
        .and_then(|snap| snap.ann_vol);
    size_from_vol(ann_vol, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_kelly_fraction_is_exact() {
        // p = 0.55, b = 2.0: base = (1.1 - 0.45) / 2 = 0.325
        // fractional = 0.325 * 0.75 = 0.24375
        let profile = StrategyProfile::default();
        assert_relative_eq!(optimal_kelly(&profile), 0.24375);
    }

    #[test]
    fn losing_edge_floors_at_zero() {
        let profile = StrategyProfile {
            win_rate: 0.20,
            payoff_ratio: 1.0,
            ..StrategyProfile::default()
        };
        assert_relative_eq!(optimal_kelly(&profile), 0.0);
    }

    #[test]
    fn undefined_volatility_gives_zero_weight() {
        let result = size_from_vol(None, &StrategyProfile::default());
        assert_relative_eq!(result.weight, 0.0);
        assert_relative_eq!(result.vol_weight, 0.0);
        assert!(result.ann_vol.is_none());
    }

    #[test]
    fn weight_scales_inversely_with_volatility() {
        let profile = StrategyProfile::default();
        let calm = size_from_vol(Some(0.15), &profile);
        let wild = size_from_vol(Some(0.60), &profile);
        assert!(calm.weight > wild.weight);
        // target 0.30 / vol 0.60 = 0.5, times kelly 0.24375
        assert_relative_eq!(wild.weight, 0.5 * 0.24375, epsilon = 1e-6);
    }

    #[test]
    fn weight_is_capped_at_one() {
        let profile = StrategyProfile {
            target_vol: 10.0,
            ..StrategyProfile::default()
        };
        let result = size_from_vol(Some(0.01), &profile);
        assert_relative_eq!(result.weight, 1.0);
    }

    #[test]
    fn size_position_uses_final_bar_volatility() {
        use crate::domain::bar::PriceBar;
        use chrono::{TimeZone, Utc};

        let profile = StrategyProfile::default();
        let bars: Vec<PriceBar> = (0..40)
            .map(|i| {
                let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64);
                PriceBar::new("AAPL", ts, 100.0 + 3.0 * (i as f64 * 0.5).sin())
            })
            .collect();
        let sized = size_position(&bars, &profile);
        assert!(sized.ann_vol.is_some());
        assert!(sized.weight > 0.0 && sized.weight <= 1.0);

        // too short for the volatility window: no exposure
        let short = size_position(&bars[..10], &profile);
        assert!(short.ann_vol.is_none());
        assert_relative_eq!(short.weight, 0.0);
    }

    #[test]
    fn zero_volatility_does_not_divide_by_zero() {
        let result = size_from_vol(Some(0.0), &StrategyProfile::default());
        assert!(result.weight.is_finite());
        assert_relative_eq!(result.weight, 1.0);
    }
}
