//! The ledger service: in-memory view of the records over a [`RecordStore`].
//!
//! Every mutation goes to the store first. The in-memory view is only
//! replaced once the store call has returned `Ok`.

use super::error::LedgerError;
use super::interchange::{self, ExportFormat};
use super::record::TradeRecord;
use crate::ports::record_store_port::{RecordStore, StorageUsage};
use tracing::{debug, info, warn};

pub struct Ledger {
    store: Box<dyn RecordStore>,
    records: Vec<TradeRecord>,
}

impl Ledger {
    /// Load everything from `store`. An unavailable store yields an empty
    /// ledger and a warning rather than an error.
    pub fn open(store: Box<dyn RecordStore>) -> Self {
        let records = match store.load_all() {
            Ok(records) => {
                debug!(store = %store.describe(), records = records.len(), "loaded records");
                records
            }
            Err(e) => {
                warn!(store = %store.describe(), error = %e, "store unavailable, starting empty");
                Vec::new()
            }
        };
        Self { store, records }
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn store_description(&self) -> String {
        self.store.describe()
    }

    pub fn reload(&mut self) -> Result<(), LedgerError> {
        self.records = self.store.load_all()?;
        Ok(())
    }

    /// Persist one new record and append it with the id the store assigned.
    pub fn add(&mut self, record: TradeRecord) -> Result<&TradeRecord, LedgerError> {
        record
            .validate()
            .map_err(|e| LedgerError::invalid_input("record", e.to_string()))?;

        let id = self.store.add(&record)?;
        info!(id, date = %record.date, broker = %record.broker, "added record");
        self.records.push(record.with_id(id));
        Ok(&self.records[self.records.len() - 1])
    }

    /// Remove the record at `index` of the current view.
    pub fn delete_at(&mut self, index: usize) -> Result<TradeRecord, LedgerError> {
        if index >= self.records.len() {
            return Err(LedgerError::InvalidIndex {
                index,
                len: self.records.len(),
            });
        }

        let mut remaining = self.records.clone();
        let removed = remaining.remove(index);
        self.persist(remaining)?;
        info!(index, date = %removed.date, broker = %removed.broker, "deleted record");
        Ok(removed)
    }

    /// Replace the whole collection.
    pub fn replace_all(&mut self, records: Vec<TradeRecord>) -> Result<(), LedgerError> {
        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(|e| {
                LedgerError::invalid_input("record", format!("record {index}: {e}"))
            })?;
        }
        self.persist(records)
    }

    /// Parse `payload` as an exported record array and replace the ledger
    /// with it. Returns the number of records imported.
    pub fn import_json(&mut self, payload: &str) -> Result<usize, LedgerError> {
        let records = interchange::parse_import(payload)?;
        let count = records.len();
        self.persist(records)?;
        info!(records = count, "imported records");
        Ok(count)
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, LedgerError> {
        interchange::render(&self.records, format)
    }

    pub fn clear(&mut self) -> Result<(), LedgerError> {
        self.store.clear()?;
        info!(removed = self.records.len(), "cleared ledger");
        self.records.clear();
        Ok(())
    }

    pub fn usage(&self) -> Result<StorageUsage, LedgerError> {
        self.store.usage()
    }

    /// `save_all`, then re-read so store-assigned ids show up. If the re-read
    /// fails the saved collection is kept as is.
    fn persist(&mut self, records: Vec<TradeRecord>) -> Result<(), LedgerError> {
        self.store.save_all(&records)?;
        self.records = match self.store.load_all() {
            Ok(reloaded) => reloaded,
            Err(e) => {
                warn!(error = %e, "reload after save failed, keeping saved records");
                records
            }
        };
        Ok(())
    }
}
