//! Position state machine.
//!
//! `advance` is a pure function from (position, bar input, profile) to the
//! next position plus any trade produced on this step. Both the backtester
//! and the realtime loop drive positions exclusively through it.

use crate::domain::position::{ExitReason, Position, PositionStatus, Trade, MIN_UNITS};
use crate::domain::profile::StrategyProfile;
use crate::domain::signal::Signal;
use chrono::{DateTime, Utc};

/// Everything the state machine needs for one bar.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
    pub rsi: Option<f64>,
    /// Units to acquire if this step opens a position.
    pub entry_units: f64,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub position: Position,
    pub trade: Option<Trade>,
    pub exit_reason: Option<ExitReason>,
}

impl StepResult {
    fn unchanged(position: Position) -> Self {
        StepResult {
            position,
            trade: None,
            exit_reason: None,
        }
    }
}

fn position_is_consistent(position: &Position) -> bool {
    let fields = [
        position.entry_price,
        position.highest_price,
        position.units,
        position.weight,
        position.stop_threshold,
    ];
    if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return false;
    }
    if position.is_open() && (position.entry_price <= 0.0 || position.units <= 0.0) {
        return false;
    }
    true
}

fn close_all(
    position: &Position,
    price: f64,
    timestamp: DateTime<Utc>,
    reason: ExitReason,
) -> StepResult {
    let pnl_pct = (price - position.entry_price) / position.entry_price * 100.0;
    let trade = Trade {
        symbol: position.symbol.clone(),
        entry_price: position.entry_price,
        exit_price: price,
        units_closed: position.units,
        pnl_pct,
        exit_reason: reason,
        exited_at: timestamp,
    };
    StepResult {
        position: Position::flat(&position.symbol),
        trade: Some(trade),
        exit_reason: Some(reason),
    }
}

/// Advance one position by one bar.
///
/// A corrupted input position is returned untouched so callers keep the last
/// good state; an unusable price is a no-op. Exits are checked in priority
/// order: trailing stop, then signal exit, then scale-out.
pub fn advance(position: &Position, input: &StepInput, profile: &StrategyProfile) -> StepResult {
    if !position_is_consistent(position) {
        return StepResult::unchanged(position.clone());
    }
    if !input.price.is_finite() || input.price <= 0.0 {
        return StepResult::unchanged(position.clone());
    }
    let price = input.price;

    if !position.is_open() {
        if input.signal.is_strong_buy() && input.entry_units > 0.0 {
            let entered = Position {
                symbol: position.symbol.clone(),
                status: PositionStatus::Hold,
                entry_price: price,
                highest_price: price,
                units: input.entry_units,
                weight: input.weight,
                stop_threshold: price * (1.0 - profile.trailing_pct),
                scaled_out: false,
            };
            return StepResult::unchanged(entered);
        }
        return StepResult::unchanged(position.clone());
    }

    let mut next = position.clone();
    next.highest_price = next.highest_price.max(price);

    // Stop only ever ratchets upward.
    let mut candidate = next.highest_price * (1.0 - profile.trailing_pct);
    if next.highest_price > next.entry_price * (1.0 + profile.profit_lock_trigger) {
        candidate = candidate.max(next.entry_price * (1.0 + profile.profit_lock_floor));
    }
    next.stop_threshold = next.stop_threshold.max(candidate);

    // a touch of the stop holds; only a close strictly below it exits
    if price < next.stop_threshold {
        return close_all(&next, price, input.timestamp, ExitReason::TrailingStop);
    }

    if input.signal.is_strong_sell() {
        return close_all(&next, price, input.timestamp, ExitReason::SignalExit);
    }

    let overheated = input.rsi.is_some_and(|r| r > profile.scale_out_rsi);
    if overheated && next.status == PositionStatus::Hold && !next.scaled_out {
        let units_closed = next.units * 0.5;
        let remaining = next.units - units_closed;
        if remaining <= MIN_UNITS {
            return close_all(&next, price, input.timestamp, ExitReason::ScaleOut);
        }
        let pnl_pct = (price - next.entry_price) / next.entry_price * 100.0;
        let trade = Trade {
            symbol: next.symbol.clone(),
            entry_price: next.entry_price,
            exit_price: price,
            units_closed,
            pnl_pct,
            exit_reason: ExitReason::ScaleOut,
            exited_at: input.timestamp,
        };
        next.units = remaining;
        next.status = PositionStatus::ScaleOut;
        next.scaled_out = true;
        next.stop_threshold = next
            .stop_threshold
            .max(next.entry_price * (1.0 + profile.profit_lock_floor));
        return StepResult {
            position: next,
            trade: Some(trade),
            exit_reason: Some(ExitReason::ScaleOut),
        };
    }

    StepResult::unchanged(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{SignalKind, Strength};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
    }

    fn strong(kind: SignalKind) -> Signal {
        Signal {
            kind,
            strength: Strength::Strong,
        }
    }

    fn input(price: f64, signal: Signal) -> StepInput {
        StepInput {
            price,
            timestamp: ts(),
            signal,
            rsi: Some(50.0),
            entry_units: 10.0,
            weight: 0.25,
        }
    }

    fn open_at(entry: f64) -> Position {
        let result = advance(
            &Position::flat("AAPL"),
            &input(entry, strong(SignalKind::Buy)),
            &StrategyProfile::default(),
        );
        result.position
    }

    #[test]
    fn entry_only_on_strong_buy() {
        let profile = StrategyProfile::default();
        let flat = Position::flat("AAPL");
        let held = advance(&flat, &input(100.0, Signal::hold()), &profile);
        assert!(!held.position.is_open());
        let sold = advance(&flat, &input(100.0, strong(SignalKind::Sell)), &profile);
        assert!(!sold.position.is_open());
        let bought = advance(&flat, &input(100.0, strong(SignalKind::Buy)), &profile);
        assert!(bought.position.is_open());
        assert_eq!(bought.position.status, PositionStatus::Hold);
        assert_relative_eq!(bought.position.entry_price, 100.0);
        assert_relative_eq!(bought.position.stop_threshold, 90.0);
        assert_relative_eq!(bought.position.units, 10.0);
    }

    #[test]
    fn invalid_price_is_a_no_op() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        for bad in [f64::NAN, 0.0, -5.0, f64::INFINITY] {
            let result = advance(&pos, &input(bad, strong(SignalKind::Sell)), &profile);
            assert_eq!(result.position, pos);
            assert!(result.trade.is_none());
        }
    }

    #[test]
    fn corrupt_position_is_returned_untouched() {
        let profile = StrategyProfile::default();
        let mut pos = open_at(100.0);
        pos.units = f64::NAN;
        let result = advance(&pos, &input(50.0, strong(SignalKind::Sell)), &profile);
        assert!(result.trade.is_none());
        assert!(result.position.units.is_nan());
    }

    #[test]
    fn stop_follows_highest_price() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let pos = advance(&pos, &input(120.0, Signal::hold()), &profile).position;
        // highest 120, trailing stop 120 * 0.90 = 108
        assert_relative_eq!(pos.stop_threshold, 108.0);
        assert_relative_eq!(pos.highest_price, 120.0);
    }

    #[test]
    fn stop_never_decreases() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let pos = advance(&pos, &input(120.0, Signal::hold()), &profile).position;
        let stop = pos.stop_threshold;
        // price drifts back down but stays above the stop
        let pos = advance(&pos, &input(110.0, Signal::hold()), &profile).position;
        assert!(pos.stop_threshold >= stop);
    }

    #[test]
    fn profit_lock_raises_stop_to_floor() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        // highest 106 > 105 trigger; trailing candidate is 95.4, floor is 101
        let pos = advance(&pos, &input(106.0, Signal::hold()), &profile).position;
        assert_relative_eq!(pos.stop_threshold, 101.0);
    }

    #[test]
    fn price_exactly_at_stop_holds() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        assert_relative_eq!(pos.stop_threshold, 90.0);
        let result = advance(&pos, &input(90.0, Signal::hold()), &profile);
        assert!(result.position.is_open());
        assert!(result.trade.is_none());
        assert_eq!(result.exit_reason, None);

        // one tick below the stop exits
        let result = advance(&pos, &input(89.999, Signal::hold()), &profile);
        assert_eq!(result.exit_reason, Some(ExitReason::TrailingStop));
    }

    #[test]
    fn trailing_stop_closes_full_position() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let pos = advance(&pos, &input(120.0, Signal::hold()), &profile).position;
        let result = advance(&pos, &input(107.0, Signal::hold()), &profile);
        assert_eq!(result.exit_reason, Some(ExitReason::TrailingStop));
        assert!(!result.position.is_open());
        let trade = result.trade.unwrap();
        assert_relative_eq!(trade.units_closed, 10.0);
        assert_relative_eq!(trade.pnl_pct, 7.0);
    }

    #[test]
    fn stop_takes_priority_over_signal_exit() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let pos = advance(&pos, &input(120.0, Signal::hold()), &profile).position;
        let result = advance(&pos, &input(105.0, strong(SignalKind::Sell)), &profile);
        assert_eq!(result.exit_reason, Some(ExitReason::TrailingStop));
    }

    #[test]
    fn strong_sell_closes_position() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let result = advance(&pos, &input(103.0, strong(SignalKind::Sell)), &profile);
        assert_eq!(result.exit_reason, Some(ExitReason::SignalExit));
        assert!(!result.position.is_open());
        assert_relative_eq!(result.trade.unwrap().pnl_pct, 3.0);
    }

    #[test]
    fn scale_out_halves_units_once() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let mut inp = input(104.0, Signal::hold());
        inp.rsi = Some(70.0);
        let result = advance(&pos, &inp, &profile);
        assert_eq!(result.exit_reason, Some(ExitReason::ScaleOut));
        assert_eq!(result.position.status, PositionStatus::ScaleOut);
        assert!(result.position.scaled_out);
        assert_relative_eq!(result.position.units, 5.0);
        let trade = result.trade.unwrap();
        assert_relative_eq!(trade.units_closed, 5.0);
        assert_relative_eq!(trade.pnl_pct, 4.0);
        // stop forced up to entry * 1.01; entry and highest untouched
        assert_relative_eq!(result.position.stop_threshold, 101.0);
        assert_relative_eq!(result.position.entry_price, 100.0);
        assert_relative_eq!(result.position.highest_price, 104.0);

        // a second overheated bar does not scale out again
        let mut inp2 = input(108.0, Signal::hold());
        inp2.rsi = Some(75.0);
        let again = advance(&result.position, &inp2, &profile);
        assert!(again.trade.is_none());
        assert_relative_eq!(again.position.units, 5.0);
    }

    #[test]
    fn scale_out_dust_closes_everything() {
        let profile = StrategyProfile::default();
        let mut pos = open_at(100.0);
        pos.units = 1.5e-6;
        let mut inp = input(104.0, Signal::hold());
        inp.rsi = Some(70.0);
        let result = advance(&pos, &inp, &profile);
        assert_eq!(result.exit_reason, Some(ExitReason::ScaleOut));
        assert!(!result.position.is_open());
        assert_relative_eq!(result.trade.unwrap().units_closed, 1.5e-6);
    }

    #[test]
    fn scale_out_requires_hold_status() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let mut inp = input(104.0, Signal::hold());
        inp.rsi = Some(70.0);
        let scaled = advance(&pos, &inp, &profile).position;
        assert_eq!(scaled.status, PositionStatus::ScaleOut);
        let mut inp2 = input(106.0, Signal::hold());
        inp2.rsi = Some(80.0);
        let result = advance(&scaled, &inp2, &profile);
        assert!(result.trade.is_none());
    }

    #[test]
    fn reentry_after_exit_resets_scale_out_flag() {
        let profile = StrategyProfile::default();
        let pos = open_at(100.0);
        let mut inp = input(104.0, Signal::hold());
        inp.rsi = Some(70.0);
        let scaled = advance(&pos, &inp, &profile).position;
        let closed = advance(&scaled, &input(104.0, strong(SignalKind::Sell)), &profile);
        assert!(!closed.position.is_open());
        let reopened = advance(
            &closed.position,
            &input(100.0, strong(SignalKind::Buy)),
            &profile,
        );
        assert!(!reopened.position.scaled_out);
        assert_eq!(reopened.position.status, PositionStatus::Hold);
    }
}
