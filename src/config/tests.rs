use super::{
    apply_config, load_config_file,
    types::{ConfigFile, DurationValue},
};
use clap::{CommandFactory, FromArgMatches};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

use crate::args::{ClientKind, SlapperArgs};
use crate::error::{AppError, ConfigError};
use crate::test_support::close_to;

fn parse_with_matches(argv: &[&str]) -> Result<(SlapperArgs, clap::ArgMatches), String> {
    let matches = SlapperArgs::command()
        .try_get_matches_from(argv)
        .map_err(|err| format!("parse failed: {}", err))?;
    let args = SlapperArgs::from_arg_matches(&matches).map_err(|err| format!("{}", err))?;
    Ok((args, matches))
}

#[test]
fn parse_toml_config() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("slapper.toml");
    let content = r#"
targets = "api.http"
workers = 32
timeout = "2s"
rate = 400.5
rampup = 0
min_y = "1ms"
max_y = "250ms"
client = "reqwest"
no_keepalive = true
"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    if config.targets.as_deref() != Some("api.http") || config.workers != Some(32) {
        return Err(format!("Unexpected config {:?}", config));
    }
    if config.client != Some(ClientKind::Reqwest) || config.no_keepalive != Some(true) {
        return Err(format!("Unexpected client settings {:?}", config));
    }
    match config.rampup {
        Some(DurationValue::Seconds(0)) => {}
        other => return Err(format!("Unexpected rampup {:?}", other)),
    }
    Ok(())
}

#[test]
fn parse_json_config() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("slapper.json");
    let content = r#"{ "targets": "b.http", "rate": 10, "duration": "30s", "no_ui": true }"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    if config.rate != Some(10.0) || config.no_ui != Some(true) {
        return Err(format!("Unexpected config {:?}", config));
    }
    let duration = config
        .duration
        .as_ref()
        .map(|value| value.to_duration(false))
        .transpose()
        .map_err(|err| err.to_string())?;
    if duration != Some(Duration::from_secs(30)) {
        return Err(format!("Unexpected duration {:?}", duration));
    }
    Ok(())
}

#[test]
fn rejects_unknown_extension() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("slapper.yaml");
    std::fs::write(&path, "rate: 5").map_err(|err| format!("write failed: {}", err))?;
    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::UnsupportedExtension { ext })) if ext == "yaml" => Ok(()),
        other => Err(format!("Expected UnsupportedExtension, got {:?}", other.is_ok())),
    }
}

#[test]
fn cli_values_win_over_config() -> Result<(), String> {
    let (mut args, matches) = parse_with_matches(&["slapper", "-r", "75", "--max-y", "1s"])?;
    let config = ConfigFile {
        targets: Some("from-config.http".to_owned()),
        rate: Some(500.0),
        max_y: Some(DurationValue::Text("300ms".to_owned())),
        min_y: Some(DurationValue::Text("0ms".to_owned())),
        workers: Some(4),
        verbose: Some(true),
        ..ConfigFile::default()
    };
    apply_config(&mut args, &matches, &config).map_err(|err| err.to_string())?;

    if !close_to(args.rate, 75.0, f64::EPSILON) || args.max_y != Duration::from_secs(1) {
        return Err(format!("CLI values were overridden: {:?}", args));
    }
    if args.targets.as_deref() != Some(Path::new("from-config.http"))
        || args.workers.get() != 4
        || !args.verbose
        || args.min_y != Duration::ZERO
    {
        return Err(format!("Config values not applied: {:?}", args));
    }
    Ok(())
}

#[test]
fn config_values_are_validated() -> Result<(), String> {
    let (mut args, matches) = parse_with_matches(&["slapper"])?;
    let zero_workers = ConfigFile {
        workers: Some(0),
        ..ConfigFile::default()
    };
    match apply_config(&mut args, &matches, &zero_workers) {
        Err(AppError::Config(ConfigError::FieldMustBePositive { field, .. })) if field == "workers" => {}
        other => return Err(format!("Expected FieldMustBePositive, got {:?}", other)),
    }

    let zero_timeout = ConfigFile {
        timeout: Some(DurationValue::Seconds(0)),
        ..ConfigFile::default()
    };
    match apply_config(&mut args, &matches, &zero_timeout) {
        Err(AppError::Config(ConfigError::InvalidDuration { field, .. })) if field == "timeout" => {}
        other => return Err(format!("Expected InvalidDuration, got {:?}", other)),
    }

    let negative_rate = ConfigFile {
        rate: Some(-1.0),
        ..ConfigFile::default()
    };
    if apply_config(&mut args, &matches, &negative_rate).is_ok() {
        return Err("Negative rate should be rejected".to_owned());
    }
    Ok(())
}
