//! File-backed implementations of the ports.

pub mod csv_adapter;
pub mod csv_export_adapter;
pub mod file_config_adapter;
pub mod holdings_file_adapter;
