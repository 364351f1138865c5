//! Port traits the analytics talk to.

pub mod config_port;
pub mod export_port;
pub mod holdings_store;
pub mod market_data_port;
