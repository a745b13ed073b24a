//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_file_store::JsonFileStore;
use crate::domain::aggregate::{self, RecordFilter};
use crate::domain::brokers::{default_brokers, parse_brokers};
use crate::domain::config_validation::validate_ledger_config;
use crate::domain::display::{
    NO_DATA, format_amount, format_date, format_magnitude, format_month, format_roi,
};
use crate::domain::error::LedgerError;
use crate::domain::interchange::{ExportFormat, export_file_name};
use crate::domain::ledger::Ledger;
use crate::domain::month::YearMonth;
use crate::domain::record::{Outcome, TradeRecord, parse_amount, parse_roi};
use crate::ports::config_port::ConfigPort;
use crate::ports::record_store_port::RecordStore;

#[derive(Parser, Debug)]
#[command(name = "tradeledger", about = "Ledger of trading-signal outcomes")]
pub struct Cli {
    /// INI configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a profit or loss
    Add {
        outcome: OutcomeArg,
        /// Magnitude, comma or dot as decimal separator
        amount: String,
        #[arg(short, long)]
        broker: String,
        /// YYYY-MM-DD, today when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Signed percentage, e.g. 12,5 or -3%
        #[arg(long, allow_hyphen_values = true)]
        roi: Option<String>,
    },
    /// List records of a month (current month by default)
    List {
        #[arg(short, long)]
        month: Option<YearMonth>,
        #[arg(short, long)]
        broker: Option<String>,
        #[arg(long, conflicts_with = "month")]
        all: bool,
    },
    /// Per-month, per-broker summary
    Summary {
        #[arg(short, long)]
        month: Option<YearMonth>,
        #[arg(short, long)]
        broker: Option<String>,
    },
    /// Totals of a month (current month by default)
    Totals {
        #[arg(short, long)]
        month: Option<YearMonth>,
        #[arg(short, long)]
        broker: Option<String>,
        #[arg(long, conflicts_with = "month")]
        all: bool,
    },
    /// Delete the record shown at INDEX by `list`
    Delete { index: usize },
    /// Remove every record
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Replace all records with an exported JSON file
    Import { file: PathBuf },
    /// Write all records to the export directory
    Export {
        #[arg(short, long, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Directory to write into, overrides [export] directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show recognized brokers
    Brokers,
    /// Show storage backend and usage
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutcomeArg {
    Profit,
    Loss,
}

impl From<OutcomeArg> for Outcome {
    fn from(value: OutcomeArg) -> Self {
        match value {
            OutcomeArg::Profit => Outcome::Profit,
            OutcomeArg::Loss => Outcome::Loss,
        }
    }
}

/// Settings that shape command behaviour, read from `[ledger]` and `[export]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    pub brokers: Vec<String>,
    /// Reject `add` for brokers outside `brokers`; otherwise only warn.
    pub strict_brokers: bool,
    pub export_dir: PathBuf,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            strict_brokers: true,
            export_dir: PathBuf::from("."),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let config = match cli.config.as_ref() {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(code) => return code,
        },
        None => FileConfigAdapter::empty(),
    };

    if let Err(e) = validate_ledger_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let settings = match build_settings(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let store = match build_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut ledger = Ledger::open(store);
    let today = Local::now().date_naive();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match execute(cli.command, &mut ledger, &settings, today, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tradeledger={default_level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = LedgerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<LedgerSettings, LedgerError> {
    let brokers = match config.get_string("ledger", "brokers") {
        Some(raw) => parse_brokers(&raw).map_err(|e| LedgerError::ConfigInvalid {
            section: "ledger".into(),
            key: "brokers".into(),
            reason: e.to_string(),
        })?,
        None => default_brokers(),
    };

    Ok(LedgerSettings {
        brokers,
        strict_brokers: config.get_bool("ledger", "strict_brokers", true),
        export_dir: PathBuf::from(config.get_string_or("export", "directory", ".")),
    })
}

pub fn build_store(config: &dyn ConfigPort) -> Result<Box<dyn RecordStore>, LedgerError> {
    let backend = config
        .get_string_or("storage", "backend", "json")
        .to_lowercase();

    let store: Box<dyn RecordStore> = match backend.as_str() {
        "json" => Box::new(JsonFileStore::from_config(config)),
        #[cfg(feature = "sqlite")]
        "sqlite" => Box::new(crate::adapters::sqlite_store::SqliteStore::from_config(config)?),
        other => {
            return Err(LedgerError::ConfigInvalid {
                section: "storage".into(),
                key: "backend".into(),
                reason: format!("unsupported backend '{other}'"),
            });
        }
    };

    debug!(store = %store.describe(), "opened store");
    Ok(store)
}

/// Run one command against an open ledger, writing its report to `out`.
pub fn execute(
    command: Command,
    ledger: &mut Ledger,
    settings: &LedgerSettings,
    today: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), LedgerError> {
    match command {
        Command::Add {
            outcome,
            amount,
            broker,
            date,
            roi,
        } => run_add(
            ledger,
            settings,
            outcome.into(),
            &amount,
            &broker,
            date.unwrap_or(today),
            roi.as_deref(),
            out,
        ),
        Command::List { month, broker, all } => {
            let filter = resolve_filter(month, broker, all, today);
            run_list(ledger, &filter, out)
        }
        Command::Summary { month, broker } => {
            let filter = RecordFilter { month, broker };
            run_summary(ledger, &filter, out)
        }
        Command::Totals { month, broker, all } => {
            let filter = resolve_filter(month, broker, all, today);
            run_totals(ledger, &filter, out)
        }
        Command::Delete { index } => {
            let removed = ledger.delete_at(index)?;
            writeln!(
                out,
                "deleted #{index}: {} {} {}",
                format_date(&removed.date),
                removed.broker,
                format_amount(removed.difference)
            )?;
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(LedgerError::invalid_input(
                    "confirmation",
                    format!("refusing to remove {} records without --yes", ledger.len()),
                ));
            }
            let removed = ledger.len();
            ledger.clear()?;
            writeln!(out, "removed {removed} records")?;
            Ok(())
        }
        Command::Import { file } => {
            let payload = fs::read_to_string(&file)?;
            let count = ledger.import_json(&payload)?;
            writeln!(out, "imported {count} records from {}", file.display())?;
            Ok(())
        }
        Command::Export { format, output } => {
            let dir = output.unwrap_or_else(|| settings.export_dir.clone());
            let path = run_export(ledger, format, &dir, today)?;
            writeln!(out, "exported {} records to {}", ledger.len(), path.display())?;
            Ok(())
        }
        Command::Brokers => run_brokers(ledger, settings, out),
        Command::Usage => {
            let usage = ledger.usage()?;
            writeln!(out, "store:   {}", ledger.store_description())?;
            writeln!(out, "records: {}", usage.records)?;
            match usage.bytes {
                Some(bytes) => writeln!(out, "bytes:   {bytes}")?,
                None => writeln!(out, "bytes:   {NO_DATA}")?,
            }
            Ok(())
        }
    }
}

/// Without `--all` or `--month`, views are limited to the month of `today`.
pub fn resolve_filter(
    month: Option<YearMonth>,
    broker: Option<String>,
    all: bool,
    today: NaiveDate,
) -> RecordFilter {
    let month = if all {
        None
    } else {
        Some(month.unwrap_or_else(|| YearMonth::of(today)))
    };
    RecordFilter { month, broker }
}

#[allow(clippy::too_many_arguments)]
fn run_add(
    ledger: &mut Ledger,
    settings: &LedgerSettings,
    outcome: Outcome,
    amount: &str,
    broker: &str,
    date: NaiveDate,
    roi: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), LedgerError> {
    let broker = broker.trim();
    if !settings.brokers.iter().any(|b| b == broker) {
        if settings.strict_brokers {
            return Err(LedgerError::invalid_input(
                "broker",
                format!(
                    "unknown broker '{broker}', expected one of: {}",
                    settings.brokers.join(", ")
                ),
            ));
        }
        warn!(broker, "broker is not in the configured list");
    }

    let amount = parse_amount(amount)?;
    let roi = roi.map(parse_roi).transpose()?;
    let record = TradeRecord::new(date, broker, outcome, amount, roi)?;

    let index = ledger.len();
    let added = ledger.add(record)?;
    writeln!(
        out,
        "added #{index}: {} {} {}",
        format_date(&added.date),
        added.broker,
        format_amount(added.difference)
    )?;
    Ok(())
}

fn run_list(ledger: &Ledger, filter: &RecordFilter, out: &mut dyn Write) -> Result<(), LedgerError> {
    let rows: Vec<(usize, &TradeRecord)> = ledger
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .collect();

    if rows.is_empty() {
        writeln!(out, "{NO_DATA}")?;
        return Ok(());
    }

    let running = aggregate::running_differences(rows.iter().map(|(_, r)| *r));
    writeln!(
        out,
        "{:>4}  {:<10}  {:<12}  {:>10}  {:>10}  {:>10}  {:>9}  {:>10}",
        "#", "Date", "Broker", "Profit", "Loss", "Diff", "ROI", "Running"
    )?;
    for ((index, record), running) in rows.iter().zip(running) {
        writeln!(
            out,
            "{:>4}  {:<10}  {:<12}  {:>10}  {:>10}  {:>10}  {:>9}  {:>10}",
            index,
            format_date(&record.date),
            record.broker,
            format_magnitude(record.profit),
            format_magnitude(record.loss),
            format_amount(record.difference),
            format_roi(record.roi),
            format_amount(running)
        )?;
    }

    let totals = aggregate::totals(rows.iter().map(|(_, r)| *r));
    writeln!(
        out,
        "{:>4}  {:<10}  {:<12}  {:>10}  {:>10}  {:>10}",
        "",
        "Total",
        "",
        format_amount(totals.profit),
        format_amount(totals.loss),
        format_amount(totals.difference)
    )?;
    Ok(())
}

fn run_summary(
    ledger: &Ledger,
    filter: &RecordFilter,
    out: &mut dyn Write,
) -> Result<(), LedgerError> {
    let summaries = aggregate::monthly_summaries(filter.apply(ledger.records()));
    if summaries.is_empty() {
        writeln!(out, "{NO_DATA}")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<7}  {:<12}  {:>5}  {:>10}  {:>10}  {:>10}  {:>9}",
        "Month", "Broker", "Count", "Profit", "Loss", "Diff", "ROI"
    )?;
    for summary in &summaries {
        writeln!(
            out,
            "{:<7}  {:<12}  {:>5}  {:>10}  {:>10}  {:>10}  {:>9}",
            format_month(summary.month),
            summary.broker,
            summary.records,
            format_amount(summary.profit),
            format_amount(summary.loss),
            format_amount(summary.difference),
            format_roi(aggregate::roi_percent(summary))
        )?;
    }
    Ok(())
}

fn run_totals(
    ledger: &Ledger,
    filter: &RecordFilter,
    out: &mut dyn Write,
) -> Result<(), LedgerError> {
    let totals = aggregate::totals(filter.apply(ledger.records()));
    let scope = match filter.month {
        Some(month) => format_month(month),
        None => "all months".to_string(),
    };
    writeln!(out, "period:      {scope}")?;
    writeln!(out, "records:     {}", totals.count)?;
    writeln!(out, "profit:      {}", format_amount(totals.profit))?;
    writeln!(out, "loss:        {}", format_amount(totals.loss))?;
    writeln!(out, "difference:  {}", format_amount(totals.difference))?;
    writeln!(out, "average roi: {}", format_roi(Some(totals.average_roi)))?;
    writeln!(
        out,
        "net roi:     {}",
        format_roi(totals.derived_roi_percent())
    )?;
    Ok(())
}

/// Render the whole ledger into `dir`, returning the written path.
pub fn run_export(
    ledger: &Ledger,
    format: ExportFormat,
    dir: &Path,
    today: NaiveDate,
) -> Result<PathBuf, LedgerError> {
    let content = ledger.export(format)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(today, format));
    fs::write(&path, content)?;
    debug!(path = %path.display(), records = ledger.len(), "wrote export");
    Ok(path)
}

fn run_brokers(
    ledger: &Ledger,
    settings: &LedgerSettings,
    out: &mut dyn Write,
) -> Result<(), LedgerError> {
    for broker in &settings.brokers {
        let count = aggregate::filter_by_broker(ledger.records(), broker).len();
        writeln!(out, "{broker}\t{count}")?;
    }

    let mut unknown: Vec<&str> = ledger
        .records()
        .iter()
        .map(|r| r.broker.as_str())
        .filter(|b| !settings.brokers.iter().any(|known| known == b))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();
    for broker in unknown {
        let count = aggregate::filter_by_broker(ledger.records(), broker).len();
        writeln!(out, "{broker}\t{count}\t(not configured)")?;
    }
    Ok(())
}
