use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use super::bucketer::LatencyBucketer;
use super::numeric::count_to_f64;
use super::outcome::{AttackResult, FailureClass};
use super::window::{MovingWindow, WindowSnapshot};

/// Status codes at or above this value go to the out-of-range counter.
pub const STATUS_TABLE_SIZE: usize = 1024;

#[derive(Debug, Default)]
struct ErrorCounters {
    timeout: AtomicU64,
    connection_refused: AtomicU64,
    eof: AtomicU64,
    dns_failure: AtomicU64,
    other: AtomicU64,
}

impl ErrorCounters {
    const fn counter(&self, class: FailureClass) -> &AtomicU64 {
        match class {
            FailureClass::Timeout => &self.timeout,
            FailureClass::ConnectionRefused => &self.connection_refused,
            FailureClass::Eof => &self.eof,
            FailureClass::DnsFailure => &self.dns_failure,
            FailureClass::Other => &self.other,
        }
    }

    fn snapshot(&self) -> ErrorSnapshot {
        ErrorSnapshot {
            timeout: self.timeout.load(Ordering::Relaxed),
            connection_refused: self.connection_refused.load(Ordering::Relaxed),
            eof: self.eof.load(Ordering::Relaxed),
            dns_failure: self.dns_failure.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for class in FailureClass::ALL {
            self.counter(class).store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorSnapshot {
    pub timeout: u64,
    pub connection_refused: u64,
    pub eof: u64,
    pub dns_failure: u64,
    pub other: u64,
}

impl ErrorSnapshot {
    #[must_use]
    pub const fn get(&self, class: FailureClass) -> u64 {
        match class {
            FailureClass::Timeout => self.timeout,
            FailureClass::ConnectionRefused => self.connection_refused,
            FailureClass::Eof => self.eof,
            FailureClass::DnsFailure => self.dns_failure,
            FailureClass::Other => self.other,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        FailureClass::ALL
            .iter()
            .fold(0u64, |acc, class| acc.saturating_add(self.get(*class)))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub received: u64,
    pub in_flight: u64,
    pub observed_rate: f64,
    /// Non-zero `(status, count)` pairs in ascending status order.
    pub statuses: Vec<(u16, u64)>,
    pub status_out_of_range: u64,
    pub errors: ErrorSnapshot,
    pub histogram: WindowSnapshot,
}

impl StatsSnapshot {
    /// Completed requests that produced an HTTP status.
    #[must_use]
    pub fn http_responses(&self) -> u64 {
        self.statuses
            .iter()
            .filter(|(status, _)| *status != 0)
            .fold(self.status_out_of_range, |acc, (_, count)| {
                acc.saturating_add(*count)
            })
    }
}

/// Lock-free aggregation of request outcomes shared by every worker.
#[derive(Debug)]
pub struct StatsAggregator {
    bucketer: LatencyBucketer,
    window: MovingWindow,
    requests_sent: AtomicU64,
    responses_received: AtomicU64,
    sent_base: AtomicU64,
    received_base: AtomicU64,
    statuses: Box<[AtomicU64]>,
    status_out_of_range: AtomicU64,
    errors: ErrorCounters,
    observed_rate: AtomicU64,
    last_rate_sample: AtomicU64,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(bucketer: LatencyBucketer, window: MovingWindow) -> Self {
        Self {
            bucketer,
            window,
            requests_sent: AtomicU64::new(0),
            responses_received: AtomicU64::new(0),
            sent_base: AtomicU64::new(0),
            received_base: AtomicU64::new(0),
            statuses: (0..STATUS_TABLE_SIZE).map(|_| AtomicU64::new(0)).collect(),
            status_out_of_range: AtomicU64::new(0),
            errors: ErrorCounters::default(),
            observed_rate: AtomicU64::new(0f64.to_bits()),
            last_rate_sample: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn bucketer(&self) -> &LatencyBucketer {
        &self.bucketer
    }

    pub fn record_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one completed request into the counters and the moving window.
    /// Returns the histogram row the sample landed in.
    pub fn record_result(&self, result: &AttackResult) -> usize {
        match result.failure {
            Some(class) => {
                self.errors.counter(class).fetch_add(1, Ordering::Relaxed);
                self.count_status(0);
            }
            None => self.count_status(result.status),
        }
        let bucket = self.bucketer.bucket_for(result.elapsed());
        self.window.record(result.finished, bucket, result.is_ok());
        self.responses_received.fetch_add(1, Ordering::Relaxed);
        bucket
    }

    fn count_status(&self, status: u16) {
        match self.statuses.get(usize::from(status)) {
            Some(counter) => counter.fetch_add(1, Ordering::Relaxed),
            None => self.status_out_of_range.fetch_add(1, Ordering::Relaxed),
        };
    }

    #[must_use]
    pub fn sent(&self) -> u64 {
        self.requests_sent
            .load(Ordering::Relaxed)
            .saturating_sub(self.sent_base.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn received(&self) -> u64 {
        self.responses_received
            .load(Ordering::Relaxed)
            .saturating_sub(self.received_base.load(Ordering::Relaxed))
    }

    /// Requests issued but not yet completed. Unaffected by `reset`.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        let received = self.responses_received.load(Ordering::Acquire);
        self.requests_sent
            .load(Ordering::Acquire)
            .saturating_sub(received)
    }

    /// Update the observed rate from the number of requests sent since the
    /// previous sample.
    #[expect(clippy::float_arithmetic, reason = "Observed rate is requests per second")]
    pub fn sample_rate(&self, interval: Duration) -> f64 {
        let total = self.requests_sent.load(Ordering::Relaxed);
        let previous = self.last_rate_sample.swap(total, Ordering::Relaxed);
        let seconds = interval.as_secs_f64();
        let rate = if seconds > 0.0 {
            count_to_f64(total.saturating_sub(previous)) / seconds
        } else {
            0.0
        };
        self.observed_rate.store(rate.to_bits(), Ordering::Relaxed);
        rate
    }

    #[must_use]
    pub fn observed_rate(&self) -> f64 {
        f64::from_bits(self.observed_rate.load(Ordering::Relaxed))
    }

    /// Clear status, error and histogram data and rebase the sent/received
    /// totals. Requests still in flight are carried over as sent, so
    /// `sent - received == in_flight` holds across a reset.
    pub fn reset(&self) {
        let received = self.responses_received.load(Ordering::Acquire);
        self.sent_base.store(received, Ordering::Relaxed);
        self.received_base.store(received, Ordering::Relaxed);
        for counter in self.statuses.iter() {
            counter.store(0, Ordering::Relaxed);
        }
        self.status_out_of_range.store(0, Ordering::Relaxed);
        self.errors.reset();
        self.window.reset();
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Instant::now())
    }

    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> StatsSnapshot {
        let statuses = self
            .statuses
            .iter()
            .enumerate()
            .filter_map(|(status, counter)| {
                let count = counter.load(Ordering::Relaxed);
                let status = u16::try_from(status).ok()?;
                (count > 0).then_some((status, count))
            })
            .collect();
        StatsSnapshot {
            sent: self.sent(),
            received: self.received(),
            in_flight: self.in_flight(),
            observed_rate: self.observed_rate(),
            statuses,
            status_out_of_range: self.status_out_of_range.load(Ordering::Relaxed),
            errors: self.errors.snapshot(),
            histogram: self.window.snapshot_at(now),
        }
    }
}
