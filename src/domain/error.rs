//! Domain error types.

/// Top-level error type for tradeledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("invalid index {index}: ledger holds {len} records")]
    InvalidIndex { index: usize, len: usize },

    #[error("malformed import: {reason}")]
    MalformedImport { reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn storage(reason: impl Into<String>) -> Self {
        LedgerError::StorageUnavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed_import(reason: impl Into<String>) -> Self {
        LedgerError::MalformedImport {
            reason: reason.into(),
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err {
            LedgerError::Io(_) => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::StorageUnavailable { .. } => 3,
            LedgerError::InvalidInput { .. } | LedgerError::InvalidIndex { .. } => 4,
            LedgerError::MalformedImport { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
