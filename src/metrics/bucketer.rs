use std::time::Duration;

use crate::error::ValidationError;

use super::numeric::{duration_ms, f64_to_usize, usize_to_f64};

pub const MIN_BUCKETS: usize = 3;

/// Maps request latencies onto a fixed number of log-scale histogram rows.
///
/// Offsets are measured from `start = min + log_base^0`. Row 0 collects
/// everything less than one millisecond past `start`, the last row
/// everything at or above `max`, and the rows in between cover geometric
/// spans of `log_base`.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyBucketer {
    min_ms: f64,
    max_ms: f64,
    buckets: usize,
    log_base: f64,
}

impl LatencyBucketer {
    /// Build a bucketer for the `[min, max)` latency range.
    ///
    /// # Errors
    ///
    /// Returns an error when fewer than three buckets are requested, when
    /// `max <= min`, or when the span is too narrow to form a log base.
    #[expect(clippy::float_arithmetic, reason = "The log base is derived from the span")]
    pub fn new(min: Duration, max: Duration, buckets: usize) -> Result<Self, ValidationError> {
        if buckets < MIN_BUCKETS {
            return Err(ValidationError::TooFewBuckets {
                min: MIN_BUCKETS,
                actual: buckets,
            });
        }
        let min_ms = duration_ms(min);
        let max_ms = duration_ms(max);
        if max_ms <= min_ms {
            return Err(ValidationError::LatencyBoundsInverted { min_ms, max_ms });
        }
        let span = max_ms - min_ms;
        if span <= 1.0 {
            return Err(ValidationError::LatencySpanTooSmall { min_ms, max_ms });
        }
        let exponent = 1.0 / usize_to_f64(buckets.saturating_sub(2));
        let log_base = span.powf(exponent);
        Ok(Self {
            min_ms,
            max_ms,
            buckets,
            log_base,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.buckets
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buckets == 0
    }

    #[must_use]
    pub const fn log_base(&self) -> f64 {
        self.log_base
    }

    /// Origin of the log scale: `min + log_base^0`.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "Offset of the log scale")]
    pub fn start_ms(&self) -> f64 {
        self.min_ms + self.log_base.powi(0)
    }

    #[must_use]
    pub fn bucket_for(&self, elapsed: Duration) -> usize {
        self.bucket(duration_ms(elapsed))
    }

    /// Row index for a latency given in milliseconds.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "Row index is a logarithm of the offset")]
    pub fn bucket(&self, elapsed_ms: f64) -> usize {
        let last = self.buckets.saturating_sub(1);
        if elapsed_ms.is_nan() {
            return 0;
        }
        if elapsed_ms >= self.max_ms {
            return last;
        }
        let corrected = elapsed_ms - self.start_ms();
        if corrected <= 0.0 {
            return 0;
        }
        let raw = (corrected.ln() / self.log_base.ln()).floor();
        if !raw.is_finite() || raw < 0.0 {
            return 0;
        }
        // Float rounding can push values just below max into the top span.
        let ceiling = usize_to_f64(last.saturating_sub(1));
        if raw >= ceiling {
            return last;
        }
        f64_to_usize(raw).saturating_add(1).min(last)
    }

    /// Human readable millisecond range covered by a row.
    #[must_use]
    pub fn label(&self, bucket: usize) -> String {
        let last = self.buckets.saturating_sub(1);
        if bucket == 0 {
            let start = self.start_ms();
            return if start >= 10.0 {
                format!("<{start:.0}")
            } else {
                format!("<{start:.1}")
            };
        }
        if bucket >= last {
            return if self.max_ms >= 10.0 {
                format!("{:3.0}+", self.max_ms)
            } else {
                format!("{:.1}+", self.max_ms)
            };
        }
        let (begin, end) = self.bounds(bucket);
        if end >= 10.0 {
            format!("{begin:3.0}-{end:3.0}")
        } else {
            format!("{begin:.1}-{end:.1}")
        }
    }

    /// Lower and upper millisecond bound of an interior row.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "Row edges are powers of the log base")]
    pub fn bounds(&self, bucket: usize) -> (f64, f64) {
        let index = i32::try_from(bucket).unwrap_or(i32::MAX);
        let begin = self.min_ms + self.log_base.powi(index.saturating_sub(1));
        let end = self.min_ms + self.log_base.powi(index);
        (begin, end)
    }
}
