//! Performance metrics over equity curves and trade lists.

use crate::domain::position::Trade;
use chrono::{DateTime, Utc};

pub const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_return_pct: f64,
    pub benchmark_return_pct: f64,
    pub outperformance_pct: f64,
    pub cagr_pct: Option<f64>,
    pub max_drawdown_pct: f64,
    pub sharpe: f64,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
}

/// Maximum peak-to-trough drawdown of an equity curve, in percent (>= 0).
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst * 100.0
}

/// Annualized Sharpe ratio from per-bar returns, using the sample standard
/// deviation. Zero when the returns carry no variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    mean / std * TRADING_DAYS.sqrt()
}

/// Compound annual growth rate between two equity points; `None` when the
/// elapsed span is not positive.
pub fn cagr_pct(
    start_equity: f64,
    end_equity: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<f64> {
    let days = (end - start).num_days();
    if days <= 0 || start_equity <= 0.0 || end_equity <= 0.0 {
        return None;
    }
    let years = days as f64 / 365.25;
    Some(((end_equity / start_equity).powf(1.0 / years) - 1.0) * 100.0)
}

/// Trade statistics and return figures rolled into one summary.
pub fn summarize(
    strategy_equity: &[f64],
    benchmark_equity: &[f64],
    strategy_returns: &[f64],
    trades: &[Trade],
    span: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Summary {
    let total_return_pct = curve_return_pct(strategy_equity);
    let benchmark_return_pct = curve_return_pct(benchmark_equity);

    let wins: Vec<f64> = trades.iter().map(|t| t.pnl_pct).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pnl_pct).filter(|p| *p <= 0.0).collect();
    let avg_win_pct = mean(&wins);
    let avg_loss_pct = mean(&losses).abs();
    let profit_factor = if avg_loss_pct > 0.0 {
        avg_win_pct / avg_loss_pct
    } else if avg_win_pct > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let win_rate_pct = if trades.is_empty() {
        0.0
    } else {
        wins.len() as f64 / trades.len() as f64 * 100.0
    };

    let cagr = span.and_then(|(start, end)| {
        let first = strategy_equity.first().copied()?;
        let last = strategy_equity.last().copied()?;
        cagr_pct(first, last, start, end)
    });

    Summary {
        total_return_pct,
        benchmark_return_pct,
        outperformance_pct: total_return_pct - benchmark_return_pct,
        cagr_pct: cagr,
        max_drawdown_pct: max_drawdown_pct(strategy_equity),
        sharpe: sharpe_ratio(strategy_returns),
        win_rate_pct,
        avg_win_pct,
        avg_loss_pct,
        profit_factor,
        trade_count: trades.len(),
    }
}

fn curve_return_pct(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => (last / first - 1.0) * 100.0,
        _ => 0.0,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
