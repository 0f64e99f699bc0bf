//! Latency bucketing, the moving histogram window, and outcome aggregation.
mod bucketer;
mod histogram;
mod logging;
mod numeric;
mod outcome;
mod stats;
mod window;

#[cfg(test)]
mod tests;

use std::time::Duration;

pub use bucketer::{LatencyBucketer, MIN_BUCKETS};
pub use histogram::{LatencyHistogram, LatencySummary};
pub use logging::{LogRecord, LogReport, LogSink, setup_request_logger};
pub use numeric::{count_to_f64, duration_ms, f64_to_count, f64_to_usize, usize_to_f64};
pub use outcome::{AttackResult, FailureClass};
pub use stats::{ErrorSnapshot, STATUS_TABLE_SIZE, StatsAggregator, StatsSnapshot};
pub use window::{MovingWindow, OkBadCounter, WindowSnapshot};

/// Length of the trailing histogram window.
pub const WINDOW: Duration = Duration::from_secs(10);
/// Histogram refresh period (5 Hz); also the slot width of the moving window.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(200);
