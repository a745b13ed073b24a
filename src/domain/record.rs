//! Trade record representation and user-input parsing.

use super::error::LedgerError;
use super::month::YearMonth;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Relative slack allowed between `difference` and `profit - loss` on
/// records that came from outside (imports, stores).
const DIFFERENCE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Profit,
    Loss,
}

/// One observed trading-signal outcome.
///
/// `date` keeps the raw `YYYY-MM-DD` text so records with a malformed date
/// survive load and export untouched; month-based views skip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub date: String,
    pub broker: String,
    pub profit: f64,
    pub loss: f64,
    pub difference: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{field} must be a finite non-negative number, got {value}")]
    BadMagnitude { field: &'static str, value: f64 },

    #[error("profit ({profit}) and loss ({loss}) are both non-zero")]
    BothSides { profit: f64, loss: f64 },

    #[error("difference {difference} does not equal profit - loss ({expected})")]
    DifferenceMismatch { difference: f64, expected: f64 },

    #[error("roi must be finite, got {roi}")]
    NonFiniteRoi { roi: f64 },

    #[error("roi {roi} disagrees in sign with difference {difference}")]
    RoiSign { roi: f64, difference: f64 },
}

impl TradeRecord {
    /// Build a record from user input. Exactly one of `profit`/`loss`
    /// carries `amount`, and `difference` is derived from them.
    pub fn new(
        date: NaiveDate,
        broker: impl Into<String>,
        outcome: Outcome,
        amount: f64,
        roi: Option<f64>,
    ) -> Result<Self, LedgerError> {
        let broker = broker.into();
        if broker.trim().is_empty() {
            return Err(LedgerError::invalid_input("broker", "broker must not be empty"));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::invalid_input(
                "amount",
                format!("amount must be a non-negative number, got {amount}"),
            ));
        }

        let (profit, loss) = match outcome {
            Outcome::Profit => (amount, 0.0),
            Outcome::Loss => (0.0, amount),
        };

        let record = Self {
            id: None,
            date: date.format(DATE_FORMAT).to_string(),
            broker,
            profit,
            loss,
            difference: profit - loss,
            roi,
        };

        if let Some(roi) = roi {
            check_roi(roi, record.difference)
                .map_err(|e| LedgerError::invalid_input("roi", e.to_string()))?;
        }

        Ok(record)
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// `None` when the stored date string is not a valid calendar date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }

    /// `None` for unparseable dates and for years outside `0..=9999`.
    pub fn month(&self) -> Option<YearMonth> {
        self.parsed_date()
            .and_then(|d| YearMonth::new(d.year(), d.month()))
    }

    /// `None` for a zero-amount record.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.profit > 0.0 {
            Some(Outcome::Profit)
        } else if self.loss > 0.0 {
            Some(Outcome::Loss)
        } else {
            None
        }
    }

    /// Check the numeric invariants of a record that did not go through
    /// [`TradeRecord::new`]. The date is deliberately not checked.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for (field, value) in [("profit", self.profit), ("loss", self.loss)] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvariantViolation::BadMagnitude { field, value });
            }
        }
        if self.profit != 0.0 && self.loss != 0.0 {
            return Err(InvariantViolation::BothSides {
                profit: self.profit,
                loss: self.loss,
            });
        }

        let expected = self.profit - self.loss;
        let slack = DIFFERENCE_TOLERANCE * expected.abs().max(1.0);
        if !self.difference.is_finite() || (self.difference - expected).abs() > slack {
            return Err(InvariantViolation::DifferenceMismatch {
                difference: self.difference,
                expected,
            });
        }

        match self.roi {
            Some(roi) => check_roi(roi, self.difference),
            None => Ok(()),
        }
    }
}

fn check_roi(roi: f64, difference: f64) -> Result<(), InvariantViolation> {
    if !roi.is_finite() {
        return Err(InvariantViolation::NonFiniteRoi { roi });
    }
    let agrees = if roi == 0.0 {
        true
    } else if difference == 0.0 {
        false
    } else {
        roi.signum() == difference.signum()
    };
    if agrees {
        Ok(())
    } else {
        Err(InvariantViolation::RoiSign { roi, difference })
    }
}

fn normalize_number(input: &str) -> String {
    input.trim().replace(',', ".")
}

/// Parse a user-entered amount. A comma is accepted as decimal separator.
pub fn parse_amount(input: &str) -> Result<f64, LedgerError> {
    let text = normalize_number(input);
    if text.is_empty() {
        return Err(LedgerError::invalid_input("amount", "amount is required"));
    }
    let value: f64 = text
        .parse()
        .map_err(|_| LedgerError::invalid_input("amount", format!("{input:?} is not a number")))?;
    if !value.is_finite() {
        return Err(LedgerError::invalid_input(
            "amount",
            format!("{input:?} is not a finite number"),
        ));
    }
    if value < 0.0 {
        return Err(LedgerError::invalid_input(
            "amount",
            "amount must not be negative; choose profit or loss instead",
        ));
    }
    Ok(value)
}

/// Parse a user-entered ROI percentage, e.g. `12,5`, `-3.1` or `7%`.
pub fn parse_roi(input: &str) -> Result<f64, LedgerError> {
    let text = normalize_number(input);
    let text = text.strip_suffix('%').unwrap_or(&text).trim_end();
    if text.is_empty() {
        return Err(LedgerError::invalid_input("roi", "roi is empty"));
    }
    let value: f64 = text
        .parse()
        .map_err(|_| LedgerError::invalid_input("roi", format!("{input:?} is not a number")))?;
    if !value.is_finite() {
        return Err(LedgerError::invalid_input(
            "roi",
            format!("{input:?} is not a finite number"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn five_digit_year_has_no_month() {
        let mut r = TradeRecord::new(day(2024, 1, 5), "Broker 1", Outcome::Profit, 1.0, None).unwrap();
        r.date = "+10000-01-05".into();
        assert_eq!(r.month(), None);
        assert!(crate::domain::aggregate::monthly_summaries([&r]).is_empty());

        r.date = "9999-12-31".into();
        assert_eq!(r.month(), YearMonth::new(9999, 12));
    }

    #[test]
    fn profit_record_fills_profit_side() {
        let r = TradeRecord::new(day(2024, 1, 5), "Broker 1", Outcome::Profit, 100.0, None).unwrap();
        assert_eq!(r.date, "2024-01-05");
        assert_eq!(r.profit, 100.0);
        assert_eq!(r.loss, 0.0);
        assert_eq!(r.difference, 100.0);
        assert_eq!(r.id, None);
        assert_eq!(r.outcome(), Some(Outcome::Profit));
    }

    #[test]
    fn loss_record_has_negative_difference() {
        let r = TradeRecord::new(day(2024, 1, 20), "Broker 1", Outcome::Loss, 40.0, Some(-4.0)).unwrap();
        assert_eq!(r.profit, 0.0);
        assert_eq!(r.loss, 40.0);
        assert_eq!(r.difference, -40.0);
        assert_eq!(r.roi, Some(-4.0));
        assert!(r.validate().is_ok());
    }

    #[test]
    fn zero_amount_difference_is_positive_zero() {
        let r = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Loss, 0.0, None).unwrap();
        assert_eq!(r.difference, 0.0);
        assert!(r.difference.is_sign_positive());
        assert_eq!(r.outcome(), None);
    }

    #[test]
    fn new_rejects_negative_amount() {
        let err = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Profit, -1.0, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { ref field, .. } if field == "amount"));
    }

    #[test]
    fn new_rejects_empty_broker() {
        let err = TradeRecord::new(day(2024, 1, 1), "  ", Outcome::Profit, 1.0, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { ref field, .. } if field == "broker"));
    }

    #[test]
    fn new_rejects_roi_with_wrong_sign() {
        let err = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Loss, 10.0, Some(5.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { ref field, .. } if field == "roi"));

        let err = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Profit, 0.0, Some(5.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
    }

    #[test]
    fn zero_roi_is_always_accepted() {
        assert!(TradeRecord::new(day(2024, 1, 1), "B", Outcome::Loss, 10.0, Some(0.0)).is_ok());
    }

    #[test]
    fn malformed_date_parses_to_none() {
        let mut r = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Profit, 1.0, None).unwrap();
        r.date = "31/01/2024".into();
        assert_eq!(r.parsed_date(), None);
        assert_eq!(r.month(), None);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn validate_catches_each_violation() {
        let base = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Profit, 10.0, None).unwrap();

        let mut r = base.clone();
        r.loss = 5.0;
        assert!(matches!(r.validate(), Err(InvariantViolation::BothSides { .. })));

        let mut r = base.clone();
        r.difference = 9.0;
        assert!(matches!(r.validate(), Err(InvariantViolation::DifferenceMismatch { .. })));

        let mut r = base.clone();
        r.profit = -10.0;
        r.difference = -10.0;
        assert!(matches!(
            r.validate(),
            Err(InvariantViolation::BadMagnitude { field: "profit", .. })
        ));

        let mut r = base.clone();
        r.roi = Some(-1.0);
        assert!(matches!(r.validate(), Err(InvariantViolation::RoiSign { .. })));

        let mut r = base;
        r.roi = Some(f64::NAN);
        assert!(matches!(r.validate(), Err(InvariantViolation::NonFiniteRoi { .. })));
    }

    #[test]
    fn validate_tolerates_float_noise() {
        let mut r = TradeRecord::new(day(2024, 1, 1), "B", Outcome::Profit, 0.3, None).unwrap();
        r.difference = 0.1 + 0.2;
        assert!(r.validate().is_ok());
    }

    #[test]
    fn parse_amount_accepts_comma_decimal() {
        assert_eq!(parse_amount("123,45").unwrap(), 123.45);
        assert_eq!(parse_amount(" 7.5 ").unwrap(), 7.5);
        assert_eq!(parse_amount("0").unwrap(), 0.0);
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("inf").is_err());
        assert!(parse_amount("NaN").is_err());
    }

    #[test]
    fn parse_roi_handles_sign_and_percent() {
        assert_eq!(parse_roi("-3,5").unwrap(), -3.5);
        assert_eq!(parse_roi("12%").unwrap(), 12.0);
        assert_eq!(parse_roi(" 4.25 % ").unwrap(), 4.25);
        assert!(parse_roi("%").is_err());
        assert!(parse_roi("ten").is_err());
    }

    #[test]
    fn serde_omits_absent_optionals() {
        let r = TradeRecord::new(day(2024, 2, 1), "B", Outcome::Profit, 50.0, None).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("\"roi\""));

        let with_id = r.with_id(7);
        let json = serde_json::to_string(&with_id).unwrap();
        assert!(json.contains("\"id\":7"));
    }
}
