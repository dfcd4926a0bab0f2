//! Render reconciliation for the spread table
//!
//! Every successful snapshot rebuilds the full row set from scratch. Failures
//! only replace the status line; the rows of the last good snapshot stay.

use std::fmt;

use chrono::{DateTime, Utc};

use super::fetcher::FetchError;
use super::sort::{sorted_view, SortPreference};
use super::types::{MetricRecord, Snapshot};

/// Table header, in cell order
pub const COLUMNS: [&str; 12] = [
    "Symbol",
    "Ex A",
    "Ex B",
    "Mid A",
    "Mid B",
    "Spread %",
    "Avg Spread %",
    "Z",
    "Funding A",
    "Funding B",
    "Funding Avg",
    "Samples",
];

const PRICE_DECIMALS: usize = 8;
const SPREAD_DECIMALS: usize = 4;
const ZSCORE_DECIMALS: usize = 3;
const FUNDING_DECIMALS: usize = 6;

/// Format `value` with fixed precision; absent or non-finite values are blank
pub fn format_metric(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => String::new(),
    }
}

/// One rendered table row
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub cells: [String; 12],
    /// Raw values kept for styling
    pub spread_pct: f64,
    pub zscore: Option<f64>,
}

impl RenderedRow {
    pub fn from_record(record: &MetricRecord) -> Self {
        Self {
            cells: [
                record.symbol.clone(),
                record.ex_a.clone(),
                record.ex_b.clone(),
                format_metric(record.mid_a, PRICE_DECIMALS),
                format_metric(record.mid_b, PRICE_DECIMALS),
                format_metric(Some(record.spread_pct), SPREAD_DECIMALS),
                format_metric(record.avg_spread_pct, SPREAD_DECIMALS),
                format_metric(record.zscore, ZSCORE_DECIMALS),
                format_metric(record.funding_a, FUNDING_DECIMALS),
                format_metric(record.funding_b, FUNDING_DECIMALS),
                format_metric(record.funding_avg, FUNDING_DECIMALS),
                record.samples.to_string(),
            ],
            spread_pct: record.spread_pct,
            zscore: record.zscore,
        }
    }

    pub fn cell(&self, column: &str) -> Option<&str> {
        COLUMNS
            .iter()
            .position(|name| *name == column)
            .map(|index| self.cells[index].as_str())
    }
}

/// Status line content
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Nothing received yet
    Waiting,
    Updated { updated_at: String, rows: usize },
    Failed(FetchError),
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Failed(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => write!(f, "waiting for first snapshot"),
            Status::Updated { updated_at, rows } => {
                let noun = if *rows == 1 { "row" } else { "rows" };
                write!(f, "updated {}, {} {}", updated_at, rows, noun)
            }
            Status::Failed(error) => write!(f, "{}", error),
        }
    }
}

/// Owns the displayed snapshot, its rendered rows and the status line
#[derive(Debug, Clone)]
pub struct Reconciler {
    snapshot: Option<Snapshot>,
    rows: Vec<RenderedRow>,
    status: Status,
    last_success: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            rows: Vec::new(),
            status: Status::Waiting,
            last_success: None,
        }
    }

    /// Apply one fetch result under `pref`
    pub fn apply(&mut self, result: Result<Snapshot, FetchError>, pref: &SortPreference) {
        match result {
            Ok(snapshot) => {
                self.status = Status::Updated {
                    updated_at: snapshot.updated_at.clone(),
                    rows: snapshot.len(),
                };
                self.rows = build_rows(&snapshot, pref);
                self.snapshot = Some(snapshot);
                self.last_success = Some(Utc::now());
            }
            Err(error) => {
                self.status = Status::Failed(error);
            }
        }
    }

    /// Rebuild the rows of the held snapshot under a new preference
    pub fn resort(&mut self, pref: &SortPreference) {
        if let Some(snapshot) = &self.snapshot {
            self.rows = build_rows(snapshot, pref);
        }
    }

    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Local time the displayed snapshot was applied
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

fn build_rows(snapshot: &Snapshot, pref: &SortPreference) -> Vec<RenderedRow> {
    sorted_view(&snapshot.records, pref)
        .into_iter()
        .map(RenderedRow::from_record)
        .collect()
}
