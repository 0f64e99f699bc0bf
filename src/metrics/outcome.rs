use std::fmt;

use tokio::time::Instant;

/// Transport-level failure causes tracked as separate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Timeout,
    ConnectionRefused,
    Eof,
    DnsFailure,
    Other,
}

impl FailureClass {
    pub const ALL: [Self; 5] = [
        Self::Timeout,
        Self::ConnectionRefused,
        Self::Eof,
        Self::DnsFailure,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "conn refused",
            Self::Eof => "eof",
            Self::DnsFailure => "no such host",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatched request.
#[derive(Debug, Clone, Copy)]
pub struct AttackResult {
    /// HTTP status, or 0 when no response was received.
    pub status: u16,
    pub failure: Option<FailureClass>,
    pub started: Instant,
    pub finished: Instant,
}

impl AttackResult {
    #[must_use]
    pub const fn response(status: u16, started: Instant, finished: Instant) -> Self {
        Self {
            status,
            failure: None,
            started,
            finished,
        }
    }

    #[must_use]
    pub const fn failed(class: FailureClass, started: Instant, finished: Instant) -> Self {
        Self {
            status: 0,
            failure: Some(class),
            started,
            finished,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.finished.saturating_duration_since(self.started)
    }

    /// Only 2xx responses count as "ok" in the histogram.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.failure.is_none() && self.status >= 200 && self.status < 300
    }
}
