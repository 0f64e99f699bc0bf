use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::info;

use crate::args::SlapperArgs;
use crate::config::{DEFAULT_CONFIG_FILES, apply_config, load_config};
use crate::engine::{Engine, EngineConfig, EngineSnapshot};
use crate::error::{AppError, AppResult, TemplateError, ValidationError};
use crate::http::{ParseOptions, RequestPool, TransportConfig, build_transport, load_templates};
use crate::metrics::{
    FailureClass, LatencyBucketer, LogReport, MovingWindow, REFRESH_INTERVAL, StatsAggregator,
    WINDOW, setup_request_logger,
};
use crate::shutdown::ShutdownSender;
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};
use crate::ui::{PlotArea, run_dashboard};

/// Histogram rows kept when no terminal sizes the plot.
const HEADLESS_BUCKETS: usize = 20;
/// Cadence of the status line in no-UI mode.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Parse arguments and config, then run a load test to completion.
///
/// # Errors
///
/// Returns an error for invalid configuration, unreadable request files,
/// a terminal that is too small, or a log file that cannot be created.
pub fn run() -> AppResult<()> {
    let (mut args, matches) = match parse_args()? {
        Some(parsed) => parsed,
        None => return Ok(()),
    };

    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, &matches, &config)?;
    }
    args.validate()?;

    crate::logger::init_logging(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppError::validation(ValidationError::RuntimeBuildFailed { source }))?;

    runtime.block_on(run_async(args))
}

fn parse_args() -> AppResult<Option<(SlapperArgs, ArgMatches)>> {
    let mut cmd = SlapperArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = SlapperArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

async fn run_async(args: SlapperArgs) -> AppResult<()> {
    let Some(targets) = args.targets.as_deref() else {
        return Err(AppError::validation(ValidationError::MissingTargets));
    };
    let keep_alive = !args.no_keepalive;
    let templates = load_templates(targets, ParseOptions { keep_alive })?;
    let pool = RequestPool::new(templates).ok_or_else(|| {
        AppError::template(TemplateError::NoRequests {
            path: targets.to_path_buf(),
        })
    })?;
    info!("Loaded {} request(s) from {}", pool.len(), targets.display());

    let plot = if args.no_ui {
        None
    } else {
        Some(PlotArea::detect()?)
    };
    let buckets = plot.map_or(HEADLESS_BUCKETS, |plot| plot.buckets);
    let bucketer = LatencyBucketer::new(args.min_y, args.max_y, buckets)?;
    let labels: Vec<String> = (0..bucketer.len()).map(|idx| bucketer.label(idx)).collect();
    let window = MovingWindow::new(WINDOW, REFRESH_INTERVAL, bucketer.len(), Instant::now());
    let stats = Arc::new(StatsAggregator::new(bucketer, window));

    let transport = build_transport(TransportConfig {
        kind: args.client.into(),
        timeout: args.timeout,
        keep_alive,
    })?;

    let (log_sink, log_writer) = match args.log.as_deref() {
        Some(path) => {
            let (sink, writer) = setup_request_logger(path, Utc::now()).await?;
            (Some(sink), Some(writer))
        }
        None => (None, None),
    };

    let (shutdown_tx, _) = shutdown_channel();
    let signals = setup_signal_shutdown_handler(&shutdown_tx);

    let engine = Engine::start(
        EngineConfig {
            workers: args.workers.get(),
            rate: args.rate,
            ramp_up: args.rampup,
            echo: args.verbose || args.no_ui,
        },
        pool,
        transport,
        stats,
        log_sink,
        &shutdown_tx,
    );

    let outcome = match plot {
        Some(plot) => run_dashboard(&engine, &labels, plot, &shutdown_tx, args.duration).await,
        None => {
            run_headless(&engine, &shutdown_tx, args.duration).await;
            Ok(())
        }
    };

    info!("Shutting down, waiting for in-flight requests");
    let last = engine.shutdown().await?;
    info!("Drain complete");
    let report = match log_writer {
        Some(writer) => Some(writer.await??),
        None => None,
    };
    signals.await?;

    for line in summary_lines(&last, report.as_ref()) {
        println!("{}", line);
    }
    outcome
}

async fn run_headless(engine: &Engine, shutdown_tx: &ShutdownSender, run_for: Option<Duration>) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut status = interval(STATUS_INTERVAL);
    // Skip the immediate first tick.
    status.reset();
    status.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            () = &mut deadline => {
                drop(shutdown_tx.send(()));
                break;
            }
            _ = status.tick() => {
                let snapshot = engine.snapshot();
                info!(
                    "sent: {} in-flight: {} rate: {:.0}/{:.0} RPS responses: {} errors: {}",
                    snapshot.stats.sent,
                    snapshot.stats.in_flight,
                    snapshot.stats.observed_rate,
                    snapshot.target_rate,
                    snapshot.stats.http_responses(),
                    snapshot.stats.errors.total()
                );
            }
        }
    }
}

pub(crate) fn summary_lines(snapshot: &EngineSnapshot, report: Option<&LogReport>) -> Vec<String> {
    let stats = &snapshot.stats;
    let mut lines = vec![format!(
        "sent: {}  received: {}  in-flight: {}  last rate: {:.0}/{:.0} RPS",
        stats.sent, stats.received, stats.in_flight, stats.observed_rate, snapshot.target_rate
    )];

    let mut responses: Vec<String> = stats
        .statuses
        .iter()
        .filter(|(status, _)| *status != 0)
        .map(|(status, count)| format!("[{}]: {}", status, count))
        .collect();
    if stats.status_out_of_range > 0 {
        responses.push(format!("[other]: {}", stats.status_out_of_range));
    }
    if !responses.is_empty() {
        lines.push(format!("responses: {}", responses.join("  ")));
    }

    let errors: Vec<String> = FailureClass::ALL
        .iter()
        .filter_map(|class| {
            let count = stats.errors.get(*class);
            (count > 0).then(|| format!("{}: {}", class, count))
        })
        .collect();
    if !errors.is_empty() {
        lines.push(format!("errors: {}", errors.join("  ")));
    }

    lines.push(format!(
        "connections: {} opened, {} closed",
        snapshot.connections.opened, snapshot.connections.closed
    ));

    if let Some(report) = report {
        let latency = &report.latency;
        lines.push(format!(
            "log: {} line(s)  latency ms min {:.2} mean {:.2} p50 {:.2} p90 {:.2} p99 {:.2} max {:.2}",
            report.lines,
            latency.min_ms,
            latency.mean_ms,
            latency.p50_ms,
            latency.p90_ms,
            latency.p99_ms,
            latency.max_ms
        ));
    }
    lines
}
