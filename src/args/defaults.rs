pub(super) const DEFAULT_WORKERS: &str = "8";
pub(super) const DEFAULT_TIMEOUT: &str = "30s";
pub(super) const DEFAULT_RATE: &str = "50";
pub(super) const DEFAULT_RAMPUP: &str = "10s";
pub(super) const DEFAULT_MIN_Y: &str = "0ms";
pub(super) const DEFAULT_MAX_Y: &str = "100ms";
