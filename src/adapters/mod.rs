//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod json_file_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
