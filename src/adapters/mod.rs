//! Concrete implementations of the port traits.

pub mod csv_price_adapter;
pub mod file_config_adapter;
pub mod memory_state_adapter;
pub mod webhook_notify_adapter;
