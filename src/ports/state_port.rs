//! Trading state port.
//!
//! Position, account and trade-log mutations travel together in a
//! [`StateTransaction`] so adapters can apply them atomically: either the
//! whole transaction lands or none of it does.

use crate::domain::account::Account;
use crate::domain::error::PulseError;
use crate::domain::position::{Position, Trade};
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct StateTransaction {
    pub symbol: String,
    pub position: Option<Position>,
    pub account: Option<Account>,
    pub trade: Option<Trade>,
}

impl StateTransaction {
    pub fn for_symbol(symbol: &str) -> Self {
        StateTransaction {
            symbol: symbol.to_string(),
            ..StateTransaction::default()
        }
    }
}

#[async_trait]
pub trait StatePort: Send + Sync {
    /// Current position for a symbol; a flat position if none is stored.
    async fn get_position(&self, symbol: &str) -> Result<Position, PulseError>;

    async fn get_account(&self) -> Result<Account, PulseError>;

    /// Apply a transaction atomically.
    async fn apply(&self, txn: StateTransaction) -> Result<(), PulseError>;
}
