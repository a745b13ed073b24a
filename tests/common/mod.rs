#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tradeledger::domain::error::LedgerError;
use tradeledger::domain::record::{Outcome, TradeRecord};
use tradeledger::ports::record_store_port::{RecordStore, StorageUsage};

#[derive(Default)]
struct MockState {
    rows: Vec<TradeRecord>,
    next_id: i64,
    fail_loads: bool,
    fail_writes: bool,
    writes: usize,
}

/// In-memory store. Clones share state so a test can keep a handle after
/// boxing one into a `Ledger`.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TradeRecord>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap();
            state.next_id = records.iter().filter_map(|r| r.id).max().unwrap_or(0);
            state.rows = records;
        }
        store
    }

    pub fn fail_loads(&self, fail: bool) {
        self.state.lock().unwrap().fail_loads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn rows(&self) -> Vec<TradeRecord> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Number of successful mutating calls.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

impl RecordStore for MockStore {
    fn load_all(&self) -> Result<Vec<TradeRecord>, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.fail_loads {
            return Err(LedgerError::storage("mock load failure"));
        }
        Ok(state.rows.clone())
    }

    fn save_all(&self, records: &[TradeRecord]) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(LedgerError::storage("mock write failure"));
        }
        state.rows = records.to_vec();
        state.writes += 1;
        Ok(())
    }

    fn add(&self, record: &TradeRecord) -> Result<i64, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(LedgerError::storage("mock write failure"));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.rows.push(record.clone().with_id(id));
        state.writes += 1;
        Ok(id)
    }

    fn clear(&self) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(LedgerError::storage("mock write failure"));
        }
        state.rows.clear();
        state.writes += 1;
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(StorageUsage {
            records: state.rows.len(),
            bytes: None,
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn profit(on: NaiveDate, broker: &str, amount: f64) -> TradeRecord {
    TradeRecord::new(on, broker, Outcome::Profit, amount, None).unwrap()
}

pub fn loss(on: NaiveDate, broker: &str, amount: f64) -> TradeRecord {
    TradeRecord::new(on, broker, Outcome::Loss, amount, None).unwrap()
}

/// Jan: A +100, A -40. Feb: B +50.
pub fn three_record_sample() -> Vec<TradeRecord> {
    vec![
        profit(date(2024, 1, 5), "A", 100.0),
        loss(date(2024, 1, 20), "A", 40.0),
        profit(date(2024, 2, 1), "B", 50.0),
    ]
}
