/// Pulse Spread Monitor - Shared Library
///
/// Terminal dashboard for cross-exchange spread and funding-rate signals
/// served by the Pulse aggregation backend.
///
/// The library includes:
/// - Snapshot data types matching the backend's JSON contract
/// - Client-side sort engine with missing-value policy
/// - HTTP snapshot fetcher and the refresh scheduler that drives it
/// - Render reconciler and the ratatui view
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::types::{ApiResponse, MetricRecord, Snapshot};

pub use shared::sort::{compare, sorted_view, SortDirection, SortKey, SortPreference, MISSING_VALUE};

pub use shared::fetcher::{parse_snapshot, FetchError, HttpSnapshotFetcher, SnapshotFetcher};

pub use shared::scheduler::{Completion, RefreshEvent, RefreshScheduler, RefreshState, RequestToken};

pub use shared::reconciler::{Reconciler, RenderedRow, Status, COLUMNS};

pub use shared::config::{parse_window, ConfigError, DashboardSettings, MonitorConfig};

pub use shared::dashboard::{Action, Dashboard};
