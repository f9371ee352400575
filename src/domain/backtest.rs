//! Vectorized backtest over daily bars.
//!
//! `run_backtest` derives signals and weights from the indicator pipeline and
//! hands them to `simulate`, which drives the position state machine bar by
//! bar. Keeping `simulate` separate lets callers replay arbitrary signal and
//! weight series against the same accounting.

use crate::domain::bar::PriceBar;
use crate::domain::engine::{advance, StepInput};
use crate::domain::error::PulseError;
use crate::domain::indicator::compute_indicators;
use crate::domain::metrics::{summarize, Summary};
use crate::domain::position::{Position, Trade};
use crate::domain::profile::StrategyProfile;
use crate::domain::signal::{classify, Signal};
use crate::domain::sizing::size_from_vol;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Fewer bars than this cannot warm up the indicator stack meaningfully.
pub const MIN_BACKTEST_BARS: usize = 50;

#[derive(Debug, Clone)]
pub struct BacktestPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub market_return: f64,
    pub strategy_return: f64,
    pub strategy_equity: f64,
    pub benchmark_equity: f64,
    /// Fraction of the sized allocation held: 1.0, 0.5 after a scale-out, 0.0 flat.
    pub fraction: f64,
    pub weight: f64,
    pub rsi: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub symbol: String,
    pub points: Vec<BacktestPoint>,
    pub trades: Vec<Trade>,
    pub summary: Summary,
}

/// Replay a precomputed signal, weight and RSI series against the position
/// state machine. All four slices must be the same length.
///
/// Returns are applied one bar late: the return on bar `t` is earned by the
/// exposure held at the end of bar `t - 1`.
pub fn simulate(
    symbol: &str,
    bars: &[PriceBar],
    signals: &[Signal],
    weights: &[f64],
    rsi: &[Option<f64>],
    capital: f64,
    profile: &StrategyProfile,
) -> BacktestResult {
    debug_assert_eq!(bars.len(), signals.len());
    debug_assert_eq!(bars.len(), weights.len());
    debug_assert_eq!(bars.len(), rsi.len());

    let mut position = Position::flat(symbol);
    let mut trades = Vec::new();
    let mut points = Vec::with_capacity(bars.len());

    let mut strategy_equity = capital;
    let mut benchmark_equity = capital;
    let mut prev_close: Option<f64> = None;
    let mut prev_fraction = 0.0;
    let mut prev_weight = 0.0;

    for i in 0..bars.len() {
        let bar = &bars[i];
        let market_return = match prev_close {
            Some(prev) if prev > 0.0 => bar.close / prev - 1.0,
            _ => 0.0,
        };
        let strategy_return = market_return * prev_fraction * prev_weight;
        strategy_equity *= 1.0 + strategy_return;
        benchmark_equity *= 1.0 + market_return;

        let step = advance(
            &position,
            &StepInput {
                price: bar.close,
                timestamp: bar.timestamp,
                signal: signals[i],
                rsi: rsi[i],
                entry_units: 1.0,
                weight: weights[i],
            },
            profile,
        );
        position = step.position;
        if let Some(trade) = step.trade {
            trades.push(trade);
        }

        let fraction = if position.is_open() { position.units } else { 0.0 };
        points.push(BacktestPoint {
            timestamp: bar.timestamp,
            close: bar.close,
            market_return,
            strategy_return,
            strategy_equity,
            benchmark_equity,
            fraction,
            weight: weights[i],
            rsi: rsi[i],
        });

        prev_close = Some(bar.close);
        prev_fraction = fraction;
        prev_weight = weights[i];
    }

    let strategy_curve: Vec<f64> = std::iter::once(capital)
        .chain(points.iter().map(|p| p.strategy_equity))
        .collect();
    let benchmark_curve: Vec<f64> = std::iter::once(capital)
        .chain(points.iter().map(|p| p.benchmark_equity))
        .collect();
    let returns: Vec<f64> = points.iter().map(|p| p.strategy_return).collect();
    let span = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
        _ => None,
    };
    let summary = summarize(&strategy_curve, &benchmark_curve, &returns, &trades, span);

    BacktestResult {
        symbol: symbol.to_string(),
        points,
        trades,
        summary,
    }
}

/// Full pipeline for one symbol: filter unusable bars, enforce the history
/// floor, derive signals and weights, then simulate.
pub fn run_backtest(
    symbol: &str,
    bars: &[PriceBar],
    capital: f64,
    profile: &StrategyProfile,
) -> Result<BacktestResult, PulseError> {
    let clean: Vec<PriceBar> = bars
        .iter()
        .filter(|b| b.has_valid_close())
        .cloned()
        .collect();
    if clean.len() < MIN_BACKTEST_BARS {
        return Err(PulseError::InsufficientData {
            symbol: symbol.to_string(),
            bars: clean.len(),
            minimum: MIN_BACKTEST_BARS,
        });
    }

    let snapshots = compute_indicators(&clean);
    let mut signals = Vec::with_capacity(clean.len());
    let mut weights = Vec::with_capacity(clean.len());
    let mut rsi = Vec::with_capacity(clean.len());
    for i in 0..clean.len() {
        let signal = if i == 0 {
            Signal::hold()
        } else {
            classify(&snapshots[i - 1], &snapshots[i], profile)
        };
        signals.push(signal);
        weights.push(size_from_vol(snapshots[i].ann_vol, profile).weight);
        rsi.push(snapshots[i].rsi);
    }

    Ok(simulate(symbol, &clean, &signals, &weights, &rsi, capital, profile))
}

#[derive(Debug)]
pub struct UniverseResult {
    pub per_symbol: BTreeMap<String, Summary>,
    pub skipped: Vec<(String, PulseError)>,
    /// Equal-weight portfolio summary across all symbols that produced a result.
    pub aggregate: Option<Summary>,
}

/// Backtest a set of symbols in parallel and combine them into an
/// equal-weight portfolio, averaging returns per timestamp.
pub fn run_universe(
    universe: &BTreeMap<String, Vec<PriceBar>>,
    capital: f64,
    profile: &StrategyProfile,
) -> UniverseResult {
    let outcomes: Vec<(String, Result<BacktestResult, PulseError>)> = universe
        .par_iter()
        .map(|(symbol, bars)| (symbol.clone(), run_backtest(symbol, bars, capital, profile)))
        .collect();

    let mut per_symbol = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut results = Vec::new();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                per_symbol.insert(symbol, result.summary.clone());
                results.push(result);
            }
            Err(err) => skipped.push((symbol, err)),
        }
    }

    let aggregate = aggregate_results(&results, capital);
    UniverseResult {
        per_symbol,
        skipped,
        aggregate,
    }
}

fn aggregate_results(results: &[BacktestResult], capital: f64) -> Option<Summary> {
    if results.is_empty() {
        return None;
    }

    let mut strategy_by_ts: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    let mut benchmark_by_ts: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    for result in results {
        for point in &result.points {
            let s = strategy_by_ts.entry(point.timestamp).or_insert((0.0, 0));
            s.0 += point.strategy_return;
            s.1 += 1;
            let b = benchmark_by_ts.entry(point.timestamp).or_insert((0.0, 0));
            b.0 += point.market_return;
            b.1 += 1;
        }
    }

    let returns: Vec<f64> = strategy_by_ts
        .values()
        .map(|(sum, count)| sum / *count as f64)
        .collect();
    let benchmark_returns: Vec<f64> = benchmark_by_ts
        .values()
        .map(|(sum, count)| sum / *count as f64)
        .collect();

    let compound = |series: &[f64]| {
        let mut equity = capital;
        let mut curve = Vec::with_capacity(series.len() + 1);
        curve.push(equity);
        for r in series {
            equity *= 1.0 + r;
            curve.push(equity);
        }
        curve
    };
    let strategy_curve = compound(&returns);
    let benchmark_curve = compound(&benchmark_returns);

    let trades: Vec<Trade> = results.iter().flat_map(|r| r.trades.clone()).collect();
    let span = match (strategy_by_ts.keys().next(), strategy_by_ts.keys().last()) {
        (Some(&start), Some(&end)) if end > start => Some((start, end)),
        _ => None,
    };

    Some(summarize(
        &strategy_curve,
        &benchmark_curve,
        &returns,
        &trades,
        span,
    ))
}
