//! pulsetrader — screening, signal and auto-trading decision engine.
//!
//! Hexagonal architecture: pure logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the polling decision loop in
//! [`realtime`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod realtime;
