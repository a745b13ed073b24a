//! Record persistence port trait.

use crate::domain::error::LedgerError;
use crate::domain::record::TradeRecord;

/// Space taken by a backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUsage {
    pub records: usize,
    /// `None` when the backend has no meaningful on-disk size (in-memory).
    pub bytes: Option<u64>,
}

/// Durable storage for the trade record collection.
///
/// A read after a completed write reflects that write. Any failure to reach
/// the backing store is reported as [`LedgerError::StorageUnavailable`] and
/// leaves the persisted collection as it was.
pub trait RecordStore {
    /// All persisted records in storage order.
    fn load_all(&self) -> Result<Vec<TradeRecord>, LedgerError>;

    /// Replace the whole collection. Either every prior record is gone and
    /// every given record is written, or nothing changes.
    fn save_all(&self, records: &[TradeRecord]) -> Result<(), LedgerError>;

    /// Append one record and return the identifier assigned to it.
    fn add(&self, record: &TradeRecord) -> Result<i64, LedgerError>;

    fn clear(&self) -> Result<(), LedgerError>;

    fn usage(&self) -> Result<StorageUsage, LedgerError>;

    /// Short label used in log lines, e.g. `json file trade_records.json`.
    fn describe(&self) -> String;
}
