//! JSON import/export and CSV export of trade records.

use super::error::LedgerError;
use super::record::{DATE_FORMAT, TradeRecord};
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const EXPORT_FILE_PREFIX: &str = "trade_records";

const CSV_HEADER: [&str; 7] = ["id", "date", "broker", "profit", "loss", "difference", "roi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{other}', expected json or csv")),
        }
    }
}

/// Parse an import payload: a JSON array of record objects.
///
/// Each element must deserialize as a [`TradeRecord`] and satisfy its numeric
/// invariants. Dates are kept verbatim even when they do not parse.
pub fn parse_import(payload: &str) -> Result<Vec<TradeRecord>, LedgerError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| LedgerError::malformed_import(format!("invalid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(LedgerError::malformed_import(format!(
                "expected a JSON array of records, got {}",
                json_kind(&other)
            )));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record: TradeRecord = serde_json::from_value(item)
            .map_err(|e| LedgerError::malformed_import(format!("record {index}: {e}")))?;
        record
            .validate()
            .map_err(|e| LedgerError::malformed_import(format!("record {index}: {e}")))?;
        records.push(record);
    }

    Ok(records)
}

/// Pretty-printed JSON array, the inverse of [`parse_import`].
pub fn export_json(records: &[TradeRecord]) -> Result<String, LedgerError> {
    serde_json::to_string_pretty(records)
        .map_err(|e| LedgerError::Io(std::io::Error::from(e)))
}

pub fn export_csv(records: &[TradeRecord]) -> Result<String, LedgerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| LedgerError::Io(e.into()))?;
    // Rows go out as tuples so absent optionals still occupy their column.
    for record in records {
        writer
            .serialize((
                record.id,
                &record.date,
                &record.broker,
                record.profit,
                record.loss,
                record.difference,
                record.roi,
            ))
            .map_err(|e| LedgerError::Io(e.into()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::Io(std::io::Error::other(e)))
}

pub fn render(records: &[TradeRecord], format: ExportFormat) -> Result<String, LedgerError> {
    match format {
        ExportFormat::Json => export_json(records),
        ExportFormat::Csv => export_csv(records),
    }
}

/// `trade_records_<YYYY-MM-DD>.<ext>`
pub fn export_file_name(date: NaiveDate, format: ExportFormat) -> String {
    format!(
        "{}_{}.{}",
        EXPORT_FILE_PREFIX,
        date.format(DATE_FORMAT),
        format.extension()
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
