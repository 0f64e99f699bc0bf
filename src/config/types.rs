use std::time::Duration;

use serde::Deserialize;

use crate::args::ClientKind;
use crate::args::parsers::parse_duration_value;
use crate::error::ValidationError;

/// Settings accepted from `slapper.toml` / `slapper.json`. Every field is
/// optional and only fills in options not given on the command line.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub targets: Option<String>,
    pub workers: Option<usize>,
    pub timeout: Option<DurationValue>,
    pub rate: Option<f64>,
    pub rampup: Option<DurationValue>,
    pub min_y: Option<DurationValue>,
    pub max_y: Option<DurationValue>,
    pub log: Option<String>,
    pub verbose: Option<bool>,
    pub no_ui: Option<bool>,
    pub client: Option<ClientKind>,
    pub duration: Option<DurationValue>,
    pub no_keepalive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self, allow_zero: bool) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 && !allow_zero {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_value(text, allow_zero),
        }
    }
}
