//! Port traits (interfaces) for external dependencies.

pub mod config_port;
pub mod record_store_port;
