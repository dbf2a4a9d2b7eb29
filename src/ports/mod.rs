//! Port traits at the boundary of the engine.

pub mod config_port;
pub mod data_port;
pub mod report_port;
pub mod state_port;
