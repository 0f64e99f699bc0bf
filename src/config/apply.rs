use std::path::PathBuf;
use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::parsers::check_rate;
use crate::args::{PositiveUsize, SlapperArgs};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue};

/// Fill in every option the command line left at its default.
///
/// # Errors
///
/// Returns an error when a config value is out of range.
pub fn apply_config(
    args: &mut SlapperArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "targets")
        && let Some(targets) = config.targets.as_ref()
    {
        args.targets = Some(PathBuf::from(targets));
    }

    if !is_cli(matches, "workers")
        && let Some(workers) = config.workers
    {
        args.workers = PositiveUsize::try_from(workers).map_err(|err| {
            AppError::config(ConfigError::FieldMustBePositive {
                field: "workers".to_owned(),
                source: err,
            })
        })?;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = config_duration(timeout, "timeout", false)?;
    }

    if !is_cli(matches, "rate")
        && let Some(rate) = config.rate
    {
        check_rate(rate).map_err(AppError::validation)?;
        args.rate = rate;
    }

    if !is_cli(matches, "rampup")
        && let Some(rampup) = config.rampup.as_ref()
    {
        args.rampup = config_duration(rampup, "rampup", true)?;
    }

    if !is_cli(matches, "min_y")
        && let Some(min_y) = config.min_y.as_ref()
    {
        args.min_y = config_duration(min_y, "min_y", true)?;
    }

    if !is_cli(matches, "max_y")
        && let Some(max_y) = config.max_y.as_ref()
    {
        args.max_y = config_duration(max_y, "max_y", false)?;
    }

    if !is_cli(matches, "log")
        && let Some(log) = config.log.as_ref()
    {
        args.log = Some(PathBuf::from(log));
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_ui")
        && let Some(no_ui) = config.no_ui
    {
        args.no_ui = no_ui;
    }

    if !is_cli(matches, "client")
        && let Some(client) = config.client
    {
        args.client = client;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = Some(config_duration(duration, "duration", false)?);
    }

    if !is_cli(matches, "no_keepalive")
        && let Some(no_keepalive) = config.no_keepalive
    {
        args.no_keepalive = no_keepalive;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn config_duration(value: &DurationValue, field: &str, allow_zero: bool) -> AppResult<Duration> {
    value.to_duration(allow_zero).map_err(|err| {
        AppError::config(ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
    })
}
