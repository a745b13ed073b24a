//! JSON blob store: the whole collection lives under one key of a JSON file.

use crate::domain::error::LedgerError;
use crate::domain::record::TradeRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_store_port::{RecordStore, StorageUsage};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_JSON_PATH: &str = "trade_records.json";
pub const DEFAULT_STORE_KEY: &str = "trade_records";

/// File layout: `{ "<key>": [ record, ... ], ...other keys untouched }`.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the target,
/// so a reader sees either the old or the new collection.
pub struct JsonFileStore {
    path: PathBuf,
    key: String,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_key(path, DEFAULT_STORE_KEY)
    }

    pub fn with_key<P: Into<PathBuf>>(path: P, key: &str) -> Self {
        Self {
            path: path.into(),
            key: key.to_string(),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let path = config.get_string_or("storage", "path", DEFAULT_JSON_PATH);
        let key = config.get_string_or("storage", "key", DEFAULT_STORE_KEY);
        Self::with_key(path, &key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_document(&self) -> Result<Map<String, Value>, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(LedgerError::storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(LedgerError::storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(LedgerError::storage(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn read_records(&self) -> Result<Vec<TradeRecord>, LedgerError> {
        let mut document = self.read_document()?;
        match document.remove(&self.key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                LedgerError::storage(format!(
                    "corrupted records under '{}' in {}: {}",
                    self.key,
                    self.path.display(),
                    e
                ))
            }),
        }
    }

    fn write_records(&self, records: &[TradeRecord]) -> Result<(), LedgerError> {
        let mut document = self.read_document()?;
        let value = serde_json::to_value(records)
            .map_err(|e| LedgerError::storage(format!("failed to encode records: {e}")))?;
        document.insert(self.key.clone(), value);

        let content = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| LedgerError::storage(format!("failed to encode records: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LedgerError::storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let temp = self.temp_path();
        fs::write(&temp, content).map_err(|e| {
            LedgerError::storage(format!("failed to write {}: {}", temp.display(), e))
        })?;
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(LedgerError::storage(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!(path = %self.path.display(), records = records.len(), "wrote json store");
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<TradeRecord>, LedgerError> {
        self.read_records()
    }

    /// Given ids are kept while unique; missing and repeated ids get
    /// `max(id) + 1` onwards, in order.
    fn save_all(&self, records: &[TradeRecord]) -> Result<(), LedgerError> {
        self.write_records(&assign_ids(records))
    }

    fn add(&self, record: &TradeRecord) -> Result<i64, LedgerError> {
        let mut records = self.read_records()?;
        let id = records.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(record.clone().with_id(id));
        self.write_records(&records)?;
        Ok(id)
    }

    fn clear(&self) -> Result<(), LedgerError> {
        self.write_records(&[])
    }

    fn usage(&self) -> Result<StorageUsage, LedgerError> {
        let records = self.read_records()?.len();
        let bytes = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(LedgerError::storage(format!(
                    "failed to stat {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        Ok(StorageUsage {
            records,
            bytes: Some(bytes),
        })
    }

    fn describe(&self) -> String {
        format!("json file {} [{}]", self.path.display(), self.key)
    }
}

fn assign_ids(records: &[TradeRecord]) -> Vec<TradeRecord> {
    let mut next = records.iter().filter_map(|r| r.id).max().unwrap_or(0);
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|record| match record.id {
            Some(id) if seen.insert(id) => record.clone(),
            _ => {
                next += 1;
                seen.insert(next);
                record.clone().with_id(next)
            }
        })
        .collect()
}
