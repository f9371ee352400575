//! In-memory trading state adapter.
//!
//! All fields live behind a single mutex, so a transaction's position,
//! account and trade-log writes become visible together or not at all.

use crate::domain::account::Account;
use crate::domain::error::PulseError;
use crate::domain::position::{Position, Trade};
use crate::ports::state_port::{StatePort, StateTransaction};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    positions: HashMap<String, Position>,
    account: Option<Account>,
    trades: Vec<Trade>,
}

pub struct MemoryStateAdapter {
    inner: Mutex<Inner>,
}

impl MemoryStateAdapter {
    pub fn new(account: Account) -> Self {
        MemoryStateAdapter {
            inner: Mutex::new(Inner {
                account: Some(account),
                ..Inner::default()
            }),
        }
    }

    pub fn trade_log(&self) -> Result<Vec<Trade>, PulseError> {
        Ok(self.lock()?.trades.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, PulseError> {
        self.inner.lock().map_err(|_| PulseError::Storage {
            reason: "state lock poisoned".into(),
        })
    }
}

#[async_trait]
impl StatePort for MemoryStateAdapter {
    async fn get_position(&self, symbol: &str) -> Result<Position, PulseError> {
        let inner = self.lock()?;
        Ok(inner
            .positions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::flat(symbol)))
    }

    async fn get_account(&self) -> Result<Account, PulseError> {
        let inner = self.lock()?;
        inner.account.ok_or_else(|| PulseError::Storage {
            reason: "no account configured".into(),
        })
    }

    async fn apply(&self, txn: StateTransaction) -> Result<(), PulseError> {
        let mut inner = self.lock()?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, PositionStatus};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn adapter() -> MemoryStateAdapter {
        MemoryStateAdapter::new(Account::new(10_000.0))
    }

    #[tokio::test]
    async fn unknown_symbol_reads_as_flat() {
        let state = adapter();
        let position = state.get_position("AAPL").await.unwrap();
        assert!(!position.is_open());
        assert_eq!(position.symbol, "AAPL");
    }

    #[tokio::test]
    async fn apply_writes_position_account_and_trade_together() {
        let state = adapter();
        let mut position = Position::flat("AAPL");
        position.status = PositionStatus::Hold;
        position.entry_price = 100.0;
        position.units = 5.0;
        let trade = Trade {
            symbol: "AAPL".into(),
            entry_price: 90.0,
            exit_price: 100.0,
            units_closed: 5.0,
            pnl_pct: 11.11,
            exit_reason: ExitReason::SignalExit,
            exited_at: Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
        };
        let txn = StateTransaction {
            symbol: "AAPL".into(),
            position: Some(position.clone()),
            account: Some(Account {
                cash_available: 9_500.0,
                total_assets: 10_050.0,
            }),
            trade: Some(trade),
        };
        state.apply(txn).await.unwrap();

        assert_eq!(state.get_position("AAPL").await.unwrap(), position);
        let account = state.get_account().await.unwrap();
        assert_relative_eq!(account.cash_available, 9_500.0);
        assert_eq!(state.trade_log().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_transaction_changes_nothing() {
        let state = adapter();
        state
            .apply(StateTransaction::for_symbol("AAPL"))
            .await
            .unwrap();
        assert!(!state.get_position("AAPL").await.unwrap().is_open());
        assert_relative_eq!(
            state.get_account().await.unwrap().cash_available,
            10_000.0
        );
        assert!(state.trade_log().unwrap().is_empty());
    }

    #[tokio::test]
    async fn positions_are_tracked_per_symbol() {
        let state = adapter();
        let mut aapl = Position::flat("AAPL");
        aapl.status = PositionStatus::Hold;
        aapl.entry_price = 100.0;
        aapl.units = 1.0;
        let mut txn = StateTransaction::for_symbol("AAPL");
        txn.position = Some(aapl);
        state.apply(txn).await.unwrap();

        assert!(state.get_position("AAPL").await.unwrap().is_open());
        assert!(!state.get_position("MSFT").await.unwrap().is_open());
    }
}
