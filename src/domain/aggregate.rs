//! Filters, totals and per-(month, broker) summaries over trade records.
//!
//! Everything here is pure: inputs are borrowed, never mutated, and each
//! call recomputes its result from scratch.

use super::month::YearMonth;
use super::record::TradeRecord;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub count: usize,
    pub profit: f64,
    pub loss: f64,
    /// `profit - loss`, not the sum of per-record differences.
    pub difference: f64,
    /// Mean of the per-record `roi` values that are present; 0 when none are.
    pub average_roi: f64,
}

impl Totals {
    /// `difference / (profit + loss) * 100`; a different statistic from
    /// `average_roi`.
    pub fn derived_roi_percent(&self) -> Option<f64> {
        derived_roi(self.profit, self.loss, self.difference)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub broker: String,
    pub records: usize,
    pub profit: f64,
    pub loss: f64,
    pub difference: f64,
}

/// Optional month and broker restriction for the transaction list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub month: Option<YearMonth>,
    pub broker: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &TradeRecord) -> bool {
        if let Some(month) = self.month {
            if record.month() != Some(month) {
                return false;
            }
        }
        match &self.broker {
            Some(broker) => &record.broker == broker,
            None => true,
        }
    }

    pub fn apply<'a>(&self, records: &'a [TradeRecord]) -> Vec<&'a TradeRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Records dated within `month`, in input order. Malformed dates never match.
pub fn filter_by_month(records: &[TradeRecord], month: YearMonth) -> Vec<&TradeRecord> {
    records
        .iter()
        .filter(|r| r.parsed_date().is_some_and(|d| month.contains(d)))
        .collect()
}

/// Exact, case-sensitive broker match.
pub fn filter_by_broker<'a>(records: &'a [TradeRecord], broker: &str) -> Vec<&'a TradeRecord> {
    records.iter().filter(|r| r.broker == broker).collect()
}

pub fn totals<'a, I>(records: I) -> Totals
where
    I: IntoIterator<Item = &'a TradeRecord>,
{
    let mut count = 0usize;
    let mut profit = 0.0_f64;
    let mut loss = 0.0_f64;
    let mut roi_sum = 0.0_f64;
    let mut roi_count = 0usize;

    for record in records {
        count += 1;
        profit += record.profit;
        loss += record.loss;
        if let Some(roi) = record.roi {
            roi_sum += roi;
            roi_count += 1;
        }
    }

    let average_roi = if roi_count > 0 {
        roi_sum / roi_count as f64
    } else {
        0.0
    };

    Totals {
        count,
        profit,
        loss,
        difference: profit - loss,
        average_roi,
    }
}

/// Group by `(month, broker)`, ordered by month then broker.
/// Records whose date does not parse are left out.
pub fn monthly_summaries<'a, I>(records: I) -> Vec<MonthlySummary>
where
    I: IntoIterator<Item = &'a TradeRecord>,
{
    let mut grouped: BTreeMap<(YearMonth, &'a str), MonthlySummary> = BTreeMap::new();

    for record in records {
        let Some(month) = record.month() else {
            continue;
        };
        let entry = grouped
            .entry((month, record.broker.as_str()))
            .or_insert_with(|| MonthlySummary {
                month,
                broker: record.broker.clone(),
                records: 0,
                profit: 0.0,
                loss: 0.0,
                difference: 0.0,
            });
        entry.records += 1;
        entry.profit += record.profit;
        entry.loss += record.loss;
        entry.difference += record.difference;
    }

    grouped.into_values().collect()
}

/// ROI of a summary row; `None` when nothing was traded.
pub fn roi_percent(summary: &MonthlySummary) -> Option<f64> {
    derived_roi(summary.profit, summary.loss, summary.difference)
}

/// Cumulative difference after each record, for a running-total column.
pub fn running_differences<'a, I>(records: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a TradeRecord>,
{
    records
        .into_iter()
        .scan(0.0_f64, |acc, r| {
            *acc += r.difference;
            Some(*acc)
        })
        .collect()
}

fn derived_roi(profit: f64, loss: f64, difference: f64) -> Option<f64> {
    let turnover = profit + loss;
    if turnover == 0.0 {
        None
    } else {
        Some(difference / turnover * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rec(date: &str, broker: &str, profit: f64, loss: f64, roi: Option<f64>) -> TradeRecord {
        TradeRecord {
            id: None,
            date: date.into(),
            broker: broker.into(),
            profit,
            loss,
            difference: profit - loss,
            roi,
        }
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn sample() -> Vec<TradeRecord> {
        vec![
            rec("2024-01-05", "A", 100.0, 0.0, None),
            rec("2024-01-20", "A", 0.0, 40.0, None),
            rec("2024-02-01", "B", 50.0, 0.0, None),
        ]
    }

    #[test]
    fn monthly_summaries_groups_by_month_and_broker() {
        let summaries = monthly_summaries(&sample());
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].month, ym("2024-01"));
        assert_eq!(summaries[0].broker, "A");
        assert_eq!(summaries[0].profit, 100.0);
        assert_eq!(summaries[0].loss, 40.0);
        assert_eq!(summaries[0].difference, 60.0);
        assert_eq!(summaries[0].records, 2);

        assert_eq!(summaries[1].month, ym("2024-02"));
        assert_eq!(summaries[1].broker, "B");
        assert_eq!(summaries[1].profit, 50.0);
        assert_eq!(summaries[1].loss, 0.0);
        assert_eq!(summaries[1].difference, 50.0);
    }

    #[test]
    fn monthly_summaries_orders_months_chronologically() {
        let records = vec![
            rec("2024-03-01", "A", 1.0, 0.0, None),
            rec("2023-12-31", "A", 1.0, 0.0, None),
            rec("2024-01-15", "B", 1.0, 0.0, None),
            rec("2024-01-16", "A", 1.0, 0.0, None),
        ];
        let months: Vec<(String, String)> = monthly_summaries(&records)
            .into_iter()
            .map(|s| (s.month.to_string(), s.broker))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2023-12".to_string(), "A".to_string()),
                ("2024-01".to_string(), "A".to_string()),
                ("2024-01".to_string(), "B".to_string()),
                ("2024-03".to_string(), "A".to_string()),
            ]
        );
    }

    #[test]
    fn monthly_summaries_is_idempotent() {
        let records = sample();
        assert_eq!(monthly_summaries(&records), monthly_summaries(&records));
    }

    #[test]
    fn monthly_summaries_skips_malformed_dates() {
        let mut records = sample();
        records.push(rec("not-a-date", "A", 999.0, 0.0, None));
        let summaries = monthly_summaries(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].profit, 100.0);
    }

    #[test]
    fn broker_keys_are_case_sensitive() {
        let records = vec![
            rec("2024-01-01", "Broker 1", 1.0, 0.0, None),
            rec("2024-01-02", "broker 1", 2.0, 0.0, None),
        ];
        assert_eq!(monthly_summaries(&records).len(), 2);
        assert_eq!(filter_by_broker(&records, "Broker 1").len(), 1);
    }

    #[test]
    fn totals_of_empty_is_all_zero() {
        let empty: Vec<TradeRecord> = Vec::new();
        let t = totals(&empty);
        assert_eq!(t.count, 0);
        assert_eq!(t.profit, 0.0);
        assert_eq!(t.loss, 0.0);
        assert_eq!(t.difference, 0.0);
        assert_eq!(t.average_roi, 0.0);
        assert!(!t.average_roi.is_nan());
        assert_eq!(t.derived_roi_percent(), None);
    }

    #[test]
    fn totals_sums_and_averages_present_roi() {
        let records = vec![
            rec("2024-01-01", "A", 100.0, 0.0, Some(10.0)),
            rec("2024-01-02", "A", 0.0, 30.0, Some(-4.0)),
            rec("2024-01-03", "B", 20.0, 0.0, None),
        ];
        let t = totals(&records);
        assert_eq!(t.count, 3);
        assert_relative_eq!(t.profit, 120.0);
        assert_relative_eq!(t.loss, 30.0);
        assert_relative_eq!(t.difference, 90.0);
        assert_relative_eq!(t.average_roi, 3.0);
        assert_relative_eq!(t.derived_roi_percent().unwrap(), 60.0);
    }

    #[test]
    fn totals_without_any_roi_reports_zero_average() {
        let t = totals(&sample());
        assert_eq!(t.average_roi, 0.0);
        assert_relative_eq!(t.difference, 110.0);
    }

    #[test]
    fn filter_by_month_preserves_order() {
        let records = sample();
        let january = filter_by_month(&records, ym("2024-01"));
        assert_eq!(january.len(), 2);
        assert_eq!(january[0].date, "2024-01-05");
        assert_eq!(january[1].date, "2024-01-20");
        assert!(filter_by_month(&records, ym("2023-01")).is_empty());
    }

    #[test]
    fn filter_by_month_excludes_malformed_dates() {
        let records = vec![rec("2024-01-xx", "A", 1.0, 0.0, None)];
        assert!(filter_by_month(&records, ym("2024-01")).is_empty());
    }

    #[test]
    fn record_filter_combines_month_and_broker() {
        let records = sample();
        let filter = RecordFilter {
            month: Some(ym("2024-01")),
            broker: Some("A".into()),
        };
        assert_eq!(filter.apply(&records).len(), 2);

        let filter = RecordFilter {
            month: Some(ym("2024-01")),
            broker: Some("B".into()),
        };
        assert!(filter.apply(&records).is_empty());

        assert_eq!(RecordFilter::default().apply(&records).len(), 3);
    }

    #[test]
    fn roi_percent_uses_turnover() {
        let summaries = monthly_summaries(&sample());
        // 60 / 140 * 100
        assert_relative_eq!(roi_percent(&summaries[0]).unwrap(), 60.0 / 140.0 * 100.0);
        assert_relative_eq!(roi_percent(&summaries[1]).unwrap(), 100.0);
    }

    #[test]
    fn roi_percent_is_none_without_turnover() {
        let summaries = monthly_summaries(&[rec("2024-01-01", "A", 0.0, 0.0, None)]);
        assert_eq!(roi_percent(&summaries[0]), None);
    }

    #[test]
    fn running_differences_accumulate() {
        let running = running_differences(&sample());
        assert_eq!(running, vec![100.0, 60.0, 110.0]);
        let empty: Vec<TradeRecord> = Vec::new();
        assert!(running_differences(&empty).is_empty());
    }
}
