//! Port traits implemented by adapters and collaborators.

pub mod config_port;
pub mod data_port;
pub mod equity_port;
pub mod gateway_port;
pub mod report_port;
pub mod signal_port;
