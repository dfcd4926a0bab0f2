/// Core data types for monitoring snapshots
///
/// These types match the JSON body served by the aggregation backend
/// at `GET /api/data?window=<seconds>`

use serde::{Deserialize, Serialize};

/// One row of monitoring data for a symbol quoted on two exchanges
///
/// Optional fields are unknown when absent, never zero.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricRecord {
    /// Trading pair identifier (e.g., "BTC-USDT")
    pub symbol: String,
    /// First exchange of the pair
    #[serde(rename = "exA")]
    pub ex_a: String,
    /// Second exchange of the pair
    #[serde(rename = "exB")]
    pub ex_b: String,
    /// Mid price on `ex_a`
    #[serde(rename = "midA", default)]
    pub mid_a: Option<f64>,
    /// Mid price on `ex_b`
    #[serde(rename = "midB", default)]
    pub mid_b: Option<f64>,
    /// Signed percentage difference between the two mids
    pub spread_pct: f64,
    /// Rolling average of `spread_pct` over the requested window
    #[serde(default)]
    pub avg_spread_pct: Option<f64>,
    /// Deviation of the current spread from its rolling average, in std units
    #[serde(default)]
    pub zscore: Option<f64>,
    #[serde(rename = "fundingA", default)]
    pub funding_a: Option<f64>,
    #[serde(rename = "fundingB", default)]
    pub funding_b: Option<f64>,
    #[serde(default)]
    pub funding_avg: Option<f64>,
    /// Window the backend used for this row, when it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_sec: Option<u64>,
    /// Observations backing the rolling statistics
    #[serde(default)]
    pub samples: u64,
}

/// One complete fetch result
///
/// Immutable once received. Records keep server arrival order; sorting happens
/// on a borrowed view at render time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub records: Vec<MetricRecord>,
    /// Server-reported timestamp, displayed verbatim
    pub updated_at: String,
}

impl Snapshot {
    pub fn new(records: Vec<MetricRecord>, updated_at: impl Into<String>) -> Self {
        Self {
            records,
            updated_at: updated_at.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Response envelope from the aggregation backend
///
/// A missing `ok` flag counts as a reported failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<MetricRecord>>,
}
