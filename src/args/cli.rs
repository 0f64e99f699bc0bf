use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult, ValidationError};
use crate::metrics::duration_ms;

use super::defaults::{
    DEFAULT_MAX_Y, DEFAULT_MIN_Y, DEFAULT_RAMPUP, DEFAULT_RATE, DEFAULT_TIMEOUT, DEFAULT_WORKERS,
};
use super::parsers::{
    check_rate, parse_duration_arg, parse_duration_or_zero, parse_positive_usize, parse_rate,
};
use super::types::{ClientKind, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Interactive HTTP load generator - steer the request rate live and watch a log-scale latency histogram."
)]
pub struct SlapperArgs {
    /// Request file in .http format (requests separated by ###)
    #[arg(long, short = 'f')]
    pub targets: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long, short = 'w', default_value = DEFAULT_WORKERS, value_parser = parse_positive_usize)]
    pub workers: PositiveUsize,

    /// Per-request timeout, including reading the body (supports ms/s/m/h)
    #[arg(long, default_value = DEFAULT_TIMEOUT, value_parser = parse_duration_arg)]
    pub timeout: Duration,

    /// Target requests per second
    #[arg(long, short = 'r', default_value = DEFAULT_RATE, value_parser = parse_rate)]
    pub rate: f64,

    /// Ramp-up time to reach the target rate, 0 disables (supports ms/s/m/h)
    #[arg(long, default_value = DEFAULT_RAMPUP, value_parser = parse_duration_or_zero)]
    pub rampup: Duration,

    /// Lower latency bound of the histogram
    #[arg(long = "min-y", default_value = DEFAULT_MIN_Y, value_parser = parse_duration_or_zero)]
    pub min_y: Duration,

    /// Upper latency bound of the histogram
    #[arg(long = "max-y", default_value = DEFAULT_MAX_Y, value_parser = parse_duration_arg)]
    pub max_y: Duration,

    /// Write one CSV line per completed request to this file
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Enable debug logging and echo every request
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable the interactive dashboard and log a status line every second
    #[arg(long = "no-ui")]
    pub no_ui: bool,

    /// HTTP client backend
    #[arg(long, value_enum, default_value_t = ClientKind::Tracing)]
    pub client: ClientKind,

    /// Stop after this long (supports ms/s/m/h)
    #[arg(long, value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Do not send Connection: keep-alive and do not reuse connections
    #[arg(long = "no-keepalive")]
    pub no_keepalive: bool,

    /// Path to config file (TOML or JSON)
    #[arg(long)]
    pub config: Option<String>,
}

impl SlapperArgs {
    /// Cross-field checks that clap cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error when the request file is missing, the latency bounds
    /// are inverted, or the rate is negative or not finite.
    pub fn validate(&self) -> AppResult<()> {
        if self.targets.is_none() {
            return Err(AppError::validation(ValidationError::MissingTargets));
        }
        if self.max_y <= self.min_y {
            return Err(AppError::validation(
                ValidationError::LatencyBoundsInverted {
                    min_ms: duration_ms(self.min_y),
                    max_ms: duration_ms(self.max_y),
                },
            ));
        }
        check_rate(self.rate).map_err(AppError::validation)?;
        Ok(())
    }
}
