use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::SinkError;

use super::numeric::{duration_ms, f64_to_count};

/// Whole-run latency distribution kept by the log writer, in microseconds.
#[derive(Debug)]
pub struct LatencyHistogram {
    hist: Histogram<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
}

impl LatencyHistogram {
    /// Create a new latency histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> Result<Self, SinkError> {
        let hist = Histogram::<u64>::new(3).map_err(|source| SinkError::Histogram { source })?;
        Ok(Self { hist })
    }

    pub fn record(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.hist.saturating_record(micros.max(1));
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }

    #[must_use]
    pub fn summary(&self) -> LatencySummary {
        if self.count() == 0 {
            return LatencySummary::default();
        }
        LatencySummary {
            count: self.count(),
            min_ms: micros_to_ms(self.hist.min()),
            max_ms: micros_to_ms(self.hist.max()),
            mean_ms: micros_to_ms(f64_to_count(self.hist.mean().round())),
            p50_ms: micros_to_ms(self.hist.value_at_quantile(0.5)),
            p90_ms: micros_to_ms(self.hist.value_at_quantile(0.9)),
            p99_ms: micros_to_ms(self.hist.value_at_quantile(0.99)),
        }
    }
}

const fn micros_to_ms(value: u64) -> f64 {
    duration_ms(Duration::from_micros(value))
}
