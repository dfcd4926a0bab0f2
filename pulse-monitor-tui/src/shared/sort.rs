//! Client-side ordering of snapshot records
//!
//! Ordering is a pure function of two records and a [`SortPreference`].
//! Missing optional metrics are replaced by [`MISSING_VALUE`], which sorts
//! below every real value.

use std::cmp::Ordering;
use std::fmt;

use super::types::MetricRecord;

/// Stand-in for an absent metric when sorting
pub const MISSING_VALUE: f64 = -1e18;

/// Metric a snapshot is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Absolute value of the current spread
    #[default]
    SpreadAbs,
    /// Signed current spread
    Spread,
    /// Rolling average spread
    Avg,
    /// Z-score of the current spread
    Z,
    /// Average funding rate across the pair
    Funding,
    /// Any other key name; every pair of records compares equal
    Unrecognized,
}

impl SortKey {
    /// Recognised keys in selector order
    pub const ALL: [SortKey; 5] = [
        SortKey::SpreadAbs,
        SortKey::Spread,
        SortKey::Avg,
        SortKey::Z,
        SortKey::Funding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::SpreadAbs => "spread_abs",
            SortKey::Spread => "spread",
            SortKey::Avg => "avg",
            SortKey::Z => "z",
            SortKey::Funding => "funding",
            SortKey::Unrecognized => "unrecognized",
        }
    }

    /// Next recognised key, wrapping around
    pub fn next(self) -> Self {
        self.step(1)
    }

    /// Previous recognised key, wrapping around
    pub fn prev(self) -> Self {
        self.step(Self::ALL.len() - 1)
    }

    fn step(self, offset: usize) -> Self {
        match Self::ALL.iter().position(|key| *key == self) {
            Some(index) => Self::ALL[(index + offset) % Self::ALL.len()],
            None => Self::ALL[0],
        }
    }

    /// Sort value of `record` under this key, `None` for [`SortKey::Unrecognized`]
    pub fn value(&self, record: &MetricRecord) -> Option<f64> {
        match self {
            SortKey::SpreadAbs => Some(record.spread_pct.abs()),
            SortKey::Spread => Some(record.spread_pct),
            SortKey::Avg => Some(record.avg_spread_pct.unwrap_or(MISSING_VALUE)),
            SortKey::Z => Some(record.zscore.unwrap_or(MISSING_VALUE)),
            SortKey::Funding => Some(record.funding_avg.unwrap_or(MISSING_VALUE)),
            SortKey::Unrecognized => None,
        }
    }
}

impl From<&str> for SortKey {
    fn from(name: &str) -> Self {
        match name.trim() {
            "spread_abs" => SortKey::SpreadAbs,
            "spread" => SortKey::Spread,
            "avg" => SortKey::Avg,
            "z" => SortKey::Z,
            "funding" => SortKey::Funding,
            _ => SortKey::Unrecognized,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Only `"asc"` selects ascending; anything else is descending.
impl From<&str> for SortDirection {
    fn from(name: &str) -> Self {
        if name.trim() == "asc" {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortPreference {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortPreference {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

impl fmt::Display for SortPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.direction)
    }
}

/// Order two records under `pref`
///
/// `Less` places `a` before `b`. Ties return `Equal` with no secondary key.
pub fn compare(a: &MetricRecord, b: &MetricRecord, pref: &SortPreference) -> Ordering {
    let ascending = match (pref.key.value(a), pref.key.value(b)) {
        (Some(va), Some(vb)) => va.partial_cmp(&vb).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    };

    match pref.direction {
        SortDirection::Asc => ascending,
        SortDirection::Desc => ascending.reverse(),
    }
}

/// Borrow `records` in display order
///
/// Stable: ties keep arrival order.
pub fn sorted_view<'a>(records: &'a [MetricRecord], pref: &SortPreference) -> Vec<&'a MetricRecord> {
    let mut view: Vec<&MetricRecord> = records.iter().collect();
    view.sort_by(|a, b| compare(a, b, pref));
    view
}
