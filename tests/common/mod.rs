#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pulsetrader::domain::account::Account;
use pulsetrader::domain::bar::PriceBar;
use pulsetrader::domain::error::PulseError;
use pulsetrader::domain::position::{Position, Trade};
use pulsetrader::ports::notify_port::{NotifyPort, Severity};
use pulsetrader::ports::price_port::PricePort;
use pulsetrader::ports::state_port::{StatePort, StateTransaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn ts(day_offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day_offset)
}

pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar::new(symbol, ts(i as i64), close))
        .collect()
}

/// A wavy series long enough to warm every indicator up.
pub fn warm_series(len: usize, base: f64) -> Vec<f64> {
    (0..len)
        .map(|i| base + 5.0 * (i as f64 * 0.25).sin() + 0.05 * i as f64)
        .collect()
}

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub delay: Option<Duration>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delay: None,
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PricePort for MockPricePort {
    async fn recent_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<PriceBar>, PulseError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.errors.get(symbol) {
            return Err(PulseError::Feed {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).cloned().unwrap_or_default();
        let start = bars.len().saturating_sub(lookback);
        Ok(bars[start..].to_vec())
    }
}

#[derive(Debug, Default)]
struct StateInner {
    positions: HashMap<String, Position>,
    account: Option<Account>,
    trades: Vec<Trade>,
}

/// In-memory state with injectable apply failures.
pub struct MockStatePort {
    inner: Mutex<StateInner>,
    fail_apply: AtomicBool,
}

impl MockStatePort {
    pub fn new(account: Account) -> Self {
        Self {
            inner: Mutex::new(StateInner {
                account: Some(account),
                ..StateInner::default()
            }),
            fail_apply: AtomicBool::new(false),
        }
    }

    pub fn set_position(&self, position: Position) {
        let mut inner = self.inner.lock().unwrap();
        inner.positions.insert(position.symbol.clone(), position);
    }

    pub fn fail_next_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.inner.lock().unwrap().trades.clone()
    }

    pub fn position(&self, symbol: &str) -> Position {
        self.inner
            .lock()
            .unwrap()
            .positions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::flat(symbol))
    }

    pub fn account(&self) -> Account {
        self.inner.lock().unwrap().account.unwrap()
    }
}

#[async_trait]
impl StatePort for MockStatePort {
    async fn get_position(&self, symbol: &str) -> Result<Position, PulseError> {
        Ok(self.position(symbol))
    }

    async fn get_account(&self) -> Result<Account, PulseError> {
        self.inner
            .lock()
            .unwrap()
            .account
            .ok_or_else(|| PulseError::Storage {
                reason: "no account".into(),
            })
    }

    async fn apply(&self, txn: StateTransaction) -> Result<(), PulseError> {
        if self.fail_apply.swap(false, Ordering::SeqCst) {
            return Err(PulseError::Storage {
                reason: "injected apply failure".into(),
            });
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(position) = txn.position {
            inner.positions.insert(txn.symbol.clone(), position);
        }
        if let Some(account) = txn.account {
            inner.account = Some(account);
        }
        if let Some(trade) = txn.trade {
            inner.trades.push(trade);
        }
        Ok(())
    }
}

/// Records every notification it is asked to deliver.
pub struct MockNotifyPort {
    pub sent: Mutex<Vec<(String, String, Severity)>>,
}

impl MockNotifyPort {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<(String, String, Severity)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyPort for MockNotifyPort {
    async fn send(&self, title: &str, description: &str, severity: Severity) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), description.to_string(), severity));
    }
}
