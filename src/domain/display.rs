//! Text formatting for dates, months and money columns.

use super::month::YearMonth;
use super::record::DATE_FORMAT;
use chrono::NaiveDate;

pub const NO_DATA: &str = "no data";

/// `YYYY-MM-DD` → `DD.MM.YYYY`. Anything that is not a valid date is echoed
/// back unchanged so the record stays visible.
pub fn format_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => date.format("%d.%m.%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// `MM.YYYY`
pub fn format_month(month: YearMonth) -> String {
    format!("{:02}.{:04}", month.month(), month.year())
}

pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Profit/loss cell: a dash for the empty side of a record.
pub fn format_magnitude(value: f64) -> String {
    if value == 0.0 {
        "-".to_string()
    } else {
        format_amount(value)
    }
}

pub fn format_roi(roi: Option<f64>) -> String {
    match roi {
        Some(value) => format!("{value:.2}%"),
        None => NO_DATA.to_string(),
    }
}
