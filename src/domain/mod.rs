//! Pure domain logic: indicators, signals, sizing, the position state
//! machine and the backtester. Nothing in here performs I/O.

pub mod account;
pub mod backtest;
pub mod bar;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod position;
pub mod profile;
pub mod signal;
pub mod sizing;
