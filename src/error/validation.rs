use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid rate '{value}': {source}")]
    InvalidRate {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("Rate must be a finite number >= 0 (got {value}).")]
    RateOutOfRange { value: f64 },
    #[error("Missing request file (set --targets or provide 'targets' in config).")]
    MissingTargets,
    #[error("max-y ({max_ms}ms) must be greater than min-y ({min_ms}ms).")]
    LatencyBoundsInverted { min_ms: f64, max_ms: f64 },
    #[error("Latency span {min_ms}ms..{max_ms}ms is too narrow for a log-scale histogram.")]
    LatencySpanTooSmall { min_ms: f64, max_ms: f64 },
    #[error("Histogram needs at least {min} buckets (got {actual}).")]
    TooFewBuckets { min: usize, actual: usize },
    #[error("Failed to build runtime: {source}")]
    RuntimeBuildFailed {
        #[source]
        source: std::io::Error,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
