//! Recognized broker labels offered for new records.
//!
//! Stored records may carry any label; this list only constrains input.

use std::collections::HashSet;

pub const DEFAULT_BROKERS: [&str; 3] = ["Broker 1", "Broker 2", "Broker 3"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerListError {
    #[error("empty token in broker list")]
    EmptyToken,

    #[error("duplicate broker: {0}")]
    DuplicateBroker(String),
}

/// Parse a comma-separated broker list. Labels are trimmed; case is kept.
pub fn parse_brokers(input: &str) -> Result<Vec<String>, BrokerListError> {
    let mut brokers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(BrokerListError::EmptyToken);
        }
        if !seen.insert(trimmed) {
            return Err(BrokerListError::DuplicateBroker(trimmed.to_string()));
        }
        brokers.push(trimmed.to_string());
    }

    Ok(brokers)
}

pub fn default_brokers() -> Vec<String> {
    DEFAULT_BROKERS.iter().map(|b| b.to_string()).collect()
}
