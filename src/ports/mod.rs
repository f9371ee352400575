//! Port traits separating domain logic from the outside world.

pub mod config_port;
pub mod notify_port;
pub mod price_port;
pub mod state_port;
