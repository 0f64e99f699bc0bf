use std::time::Duration;

use super::types::PositiveUsize;
use crate::error::{AppError, AppResult, ValidationError};

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

/// Requests per second: finite and not negative. Zero parks the ticker.
pub(crate) fn parse_rate(s: &str) -> AppResult<f64> {
    let value: f64 = s.trim().parse().map_err(|err| {
        AppError::validation(ValidationError::InvalidRate {
            value: s.to_owned(),
            source: err,
        })
    })?;
    check_rate(value)?;
    Ok(value)
}

pub(crate) fn check_rate(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::RateOutOfRange { value })
    }
}

/// Duration with an `ms`/`s`/`m`/`h` suffix; a bare number means seconds.
pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s, false).map_err(AppError::validation)
}

/// Like [`parse_duration_arg`] but accepts zero, for settings where zero
/// switches something off.
pub(crate) fn parse_duration_or_zero(s: &str) -> AppResult<Duration> {
    parse_duration_value(s, true).map_err(AppError::validation)
}

pub(crate) fn parse_duration_value(s: &str, allow_zero: bool) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    if !allow_zero && duration.is_zero() {
        return Err(ValidationError::DurationZero);
    }

    Ok(duration)
}
