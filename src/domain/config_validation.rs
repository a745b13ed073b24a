//! Configuration validation.
//!
//! Checks every ledger setting before a store is opened.

use crate::domain::brokers::parse_brokers;
use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;

pub const SUPPORTED_BACKENDS: [&str; 2] = ["json", "sqlite"];

pub fn validate_ledger_config(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    validate_backend(config)?;
    validate_store_key(config)?;
    validate_pool_size(config)?;
    validate_brokers(config)?;
    Ok(())
}

fn validate_backend(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let backend = config.get_string_or("storage", "backend", "json").to_lowercase();
    if !SUPPORTED_BACKENDS.contains(&backend.as_str()) {
        return Err(LedgerError::ConfigInvalid {
            section: "storage".to_string(),
            key: "backend".to_string(),
            reason: format!("unknown backend '{backend}', expected json or sqlite"),
        });
    }
    if backend == "sqlite" && !cfg!(feature = "sqlite") {
        return Err(LedgerError::ConfigInvalid {
            section: "storage".to_string(),
            key: "backend".to_string(),
            reason: "built without the sqlite feature".to_string(),
        });
    }
    Ok(())
}

fn validate_store_key(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    match config.get_string("storage", "key") {
        Some(key) if key.trim().is_empty() => Err(LedgerError::ConfigInvalid {
            section: "storage".to_string(),
            key: "key".to_string(),
            reason: "key must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let Some(raw) = config.get_string("storage", "pool_size") else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(size) if (1..=64).contains(&size) => Ok(()),
        _ => Err(LedgerError::ConfigInvalid {
            section: "storage".to_string(),
            key: "pool_size".to_string(),
            reason: format!("pool_size must be an integer between 1 and 64, got '{raw}'"),
        }),
    }
}

fn validate_brokers(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let Some(raw) = config.get_string("ledger", "brokers") else {
        return Ok(());
    };
    parse_brokers(&raw)
        .map(|_| ())
        .map_err(|e| LedgerError::ConfigInvalid {
            section: "ledger".to_string(),
            key: "brokers".to_string(),
            reason: e.to_string(),
        })
}
