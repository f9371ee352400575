//! Realtime decision loop.
//!
//! Polls each watched symbol on a fixed interval, replays the latest bars
//! through the indicator pipeline and the position state machine, and applies
//! the outcome through the state port. Symbols are isolated from each other:
//! one symbol's feed failure never blocks the rest, and a per-symbol lock
//! skips a symbol whose previous evaluation is still in flight.

use crate::domain::backtest::MIN_BACKTEST_BARS;
use crate::domain::engine::{advance, StepInput};
use crate::domain::error::PulseError;
use crate::domain::indicator::compute_indicators;
use crate::domain::position::ExitReason;
use crate::domain::profile::StrategyProfile;
use crate::domain::signal::classify;
use crate::domain::sizing::size_from_vol;
use crate::ports::config_port::ConfigPort;
use crate::ports::notify_port::{NotifyPort, Severity};
use crate::ports::price_port::PricePort;
use crate::ports::state_port::{StatePort, StateTransaction};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Orders below this notional are not worth placing.
pub const MIN_ORDER_VALUE: f64 = 500.0;

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub symbols: Vec<String>,
    pub interval: Duration,
    pub lookback: usize,
    pub min_order_value: f64,
    pub call_timeout: Duration,
}

impl WatchConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PulseError> {
        let symbols: Vec<String> = config
            .get_string("watch", "symbols")
            .ok_or_else(|| PulseError::ConfigMissing {
                section: "watch".into(),
                key: "symbols".into(),
            })?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(PulseError::ConfigInvalid {
                section: "watch".into(),
                key: "symbols".into(),
                reason: "no symbols listed".into(),
            });
        }
        let positive_secs = |key: &str, default: i64| -> Result<Duration, PulseError> {
            let secs = config.get_int("watch", key, default);
            if secs <= 0 {
                return Err(PulseError::ConfigInvalid {
                    section: "watch".into(),
                    key: key.into(),
                    reason: format!("{} is not a positive number of seconds", secs),
                });
            }
            Ok(Duration::from_secs(secs as u64))
        };
        Ok(WatchConfig {
            symbols,
            interval: positive_secs("interval_secs", 300)?,
            lookback: config.get_int("watch", "lookback", 120).max(0) as usize,
            min_order_value: config.get_double("watch", "min_order_value", MIN_ORDER_VALUE),
            call_timeout: positive_secs("call_timeout_secs", 10)?,
        })
    }
}

/// Outcome of evaluating one symbol on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Previous evaluation still running.
    Skipped,
    NoAction,
    Entered { units: f64, price: f64 },
    ScaledOut { units_closed: f64, price: f64 },
    Exited { reason: ExitReason, pnl_pct: f64 },
}

#[derive(Clone)]
pub struct DecisionLoop {
    prices: Arc<dyn PricePort>,
    state: Arc<dyn StatePort>,
    notifier: Arc<dyn NotifyPort>,
    profile: StrategyProfile,
    config: WatchConfig,
    locks: Arc<HashMap<String, Arc<Mutex<()>>>>,
}

impl DecisionLoop {
    pub fn new(
        prices: Arc<dyn PricePort>,
        state: Arc<dyn StatePort>,
        notifier: Arc<dyn NotifyPort>,
        profile: StrategyProfile,
        config: WatchConfig,
    ) -> Self {
        let locks = config
            .symbols
            .iter()
            .map(|s| (s.clone(), Arc::new(Mutex::new(()))))
            .collect();
        DecisionLoop {
            prices,
            state,
            notifier,
            profile,
            config,
            locks: Arc::new(locks),
        }
    }

    /// Run until `shutdown` is notified. An in-flight cycle always completes
    /// before the loop exits.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.notified() => {
                    tracing::info!("shutdown requested, stopping decision loop");
                    break;
                }
            }
        }
    }

    /// Evaluate every watched symbol once, concurrently. Failures are logged
    /// per symbol and retried on the next tick.
    pub async fn run_cycle(&self) {
        let handles: Vec<_> = self
            .config
            .symbols
            .iter()
            .map(|symbol| {
                let this = self.clone();
                let symbol = symbol.clone();
                tokio::spawn(async move {
                    let outcome = this.decide_symbol(&symbol).await;
                    (symbol, outcome)
                })
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok((symbol, Ok(decision))) => {
                    tracing::debug!(%symbol, ?decision, "cycle decision");
                }
                Ok((symbol, Err(err))) => {
                    tracing::warn!(%symbol, error = %err, "symbol evaluation failed");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "symbol task panicked");
                }
            }
        }
    }

    /// Evaluate one symbol: fetch bars, classify, size, step the state
    /// machine, and persist whatever changed as one transaction.
    pub async fn decide_symbol(&self, symbol: &str) -> Result<Decision, PulseError> {
        let lock = self.locks.get(symbol).ok_or_else(|| PulseError::InvariantViolation {
            reason: format!("no lock registered for {}", symbol),
        })?;
        let Ok(_guard) = lock.try_lock() else {
            tracing::debug!(%symbol, "previous evaluation still running, skipping tick");
            return Ok(Decision::Skipped);
        };

        let bars = self
            .feed_call(symbol, self.prices.recent_bars(symbol, self.config.lookback))
            .await?;
        let usable = bars.iter().filter(|b| b.has_valid_close()).count();
        if usable < bars.len() {
            tracing::warn!(%symbol, skipped = bars.len() - usable, "ignoring bars without a usable close");
        }
        if usable < MIN_BACKTEST_BARS {
            return Err(PulseError::InsufficientData {
                symbol: symbol.to_string(),
                bars: usable,
                minimum: MIN_BACKTEST_BARS,
            });
        }

        let last_bar = bars.last().ok_or_else(|| PulseError::Feed {
            symbol: symbol.to_string(),
            reason: "empty bar history".into(),
        })?;
        if !last_bar.has_valid_close() {
            return Err(PulseError::InvalidPrice {
                symbol: symbol.to_string(),
                value: last_bar.close,
            });
        }
        let price = last_bar.close;

        let snapshots = compute_indicators(&bars);
        let curr = snapshots[snapshots.len() - 1];
        let prev = snapshots[snapshots.len() - 2];
        let signal = classify(&prev, &curr, &self.profile);
        let sizing = size_from_vol(curr.ann_vol, &self.profile);

        let position = self
            .storage_call(self.state.get_position(symbol))
            .await?;
        let account = self.storage_call(self.state.get_account()).await?;

        let budget = account.cash_available * sizing.weight;
        let entry_units = if budget >= self.config.min_order_value && price > 0.0 {
            budget / price
        } else {
            0.0
        };

        let step = advance(
            &position,
            &StepInput {
                price,
                timestamp: last_bar.timestamp,
                signal,
                rsi: curr.rsi,
                entry_units,
                weight: sizing.weight,
            },
            &self.profile,
        );

        let mut next_account = account;
        let decision = if !position.is_open() && step.position.is_open() {
            let spend = step.position.units * price;
            next_account.cash_available -= spend;
            Decision::Entered {
                units: step.position.units,
                price,
            }
        } else if let Some(trade) = &step.trade {
            let proceeds = trade.units_closed * trade.exit_price;
            let realized = trade.units_closed * (trade.exit_price - trade.entry_price);
            next_account.cash_available += proceeds;
            next_account.total_assets += realized;
            match trade.exit_reason {
                ExitReason::ScaleOut => Decision::ScaledOut {
                    units_closed: trade.units_closed,
                    price,
                },
                reason => Decision::Exited {
                    reason,
                    pnl_pct: trade.pnl_pct,
                },
            }
        } else {
            Decision::NoAction
        };

        if decision != Decision::NoAction {
            let txn = StateTransaction {
                symbol: symbol.to_string(),
                position: Some(step.position.clone()),
                account: Some(next_account),
                trade: step.trade.clone(),
            };
            self.storage_call(self.state.apply(txn)).await?;
            self.notify(symbol, &decision).await;
        }

        Ok(decision)
    }

    async fn notify(&self, symbol: &str, decision: &Decision) {
        match decision {
            Decision::Entered { units, price } => {
                self.notifier
                    .send(
                        &format!("{} entry", symbol),
                        &format!("bought {:.4} units at {:.2}", units, price),
                        Severity::Info,
                    )
                    .await;
            }
            Decision::ScaledOut { units_closed, price } => {
                self.notifier
                    .send(
                        &format!("{} scale-out", symbol),
                        &format!("sold {:.4} units at {:.2}", units_closed, price),
                        Severity::Warning,
                    )
                    .await;
            }
            Decision::Exited { reason, pnl_pct } => {
                let severity = match reason {
                    ExitReason::TrailingStop => Severity::Critical,
                    _ => Severity::Warning,
                };
                self.notifier
                    .send(
                        &format!("{} exit", symbol),
                        &format!("{} at {:+.2}%", reason, pnl_pct),
                        severity,
                    )
                    .await;
            }
            Decision::Skipped | Decision::NoAction => {}
        }
    }

    async fn feed_call<T>(
        &self,
        symbol: &str,
        fut: impl Future<Output = Result<T, PulseError>>,
    ) -> Result<T, PulseError> {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .map_err(|_| PulseError::Feed {
                symbol: symbol.to_string(),
                reason: format!("timed out after {:?}", self.config.call_timeout),
            })?
    }

    async fn storage_call<T>(
        &self,
        fut: impl Future<Output = Result<T, PulseError>>,
    ) -> Result<T, PulseError> {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .map_err(|_| PulseError::Storage {
                reason: format!("timed out after {:?}", self.config.call_timeout),
            })?
    }
}
