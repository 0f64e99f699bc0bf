use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::info;

use crate::error::{AppError, AppResult, SinkError};

use super::histogram::{LatencyHistogram, LatencySummary};
use super::numeric::duration_ms;

const LOG_BUFFER_SIZE: usize = 64 * 1024;

/// One CSV line in the request log.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord {
    /// Request start relative to the engine start.
    pub offset: Duration,
    pub elapsed: Duration,
    pub status: u16,
    pub in_flight: u64,
    pub rate: f64,
}

/// Non-blocking handle the workers use to emit log records.
#[derive(Debug, Clone)]
pub struct LogSink {
    sender: mpsc::UnboundedSender<LogRecord>,
}

impl LogSink {
    #[must_use]
    pub const fn new(sender: mpsc::UnboundedSender<LogRecord>) -> Self {
        Self { sender }
    }

    pub fn send(&self, record: LogRecord) -> bool {
        self.sender.send(record).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogReport {
    pub lines: u64,
    pub latency: LatencySummary,
}

/// Create the log file and spawn its writer task.
///
/// The writer drains records until every `LogSink` clone is dropped, then
/// flushes and reports how many lines were written.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub async fn setup_request_logger(
    path: &Path,
    wall_start: DateTime<Utc>,
) -> AppResult<(LogSink, JoinHandle<AppResult<LogReport>>)> {
    let file = File::create(path).await.map_err(|source| {
        AppError::sink(SinkError::CreateLog {
            path: path.to_path_buf(),
            source,
        })
    })?;
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = tokio::spawn(write_request_log(file, wall_start, receiver));
    Ok((LogSink::new(sender), handle))
}

async fn write_request_log(
    file: File,
    wall_start: DateTime<Utc>,
    mut log_rx: mpsc::UnboundedReceiver<LogRecord>,
) -> AppResult<LogReport> {
    let mut writer = BufWriter::with_capacity(LOG_BUFFER_SIZE, file);
    let mut buffer = String::with_capacity(LOG_BUFFER_SIZE);
    let mut histogram = LatencyHistogram::new()?;
    let mut lines: u64 = 0;

    while let Some(record) = log_rx.recv().await {
        format_record(&mut buffer, wall_start, &record)?;
        histogram.record(record.elapsed);
        lines = lines.saturating_add(1);

        if buffer.len() >= LOG_BUFFER_SIZE {
            writer
                .write_all(buffer.as_bytes())
                .await
                .map_err(|source| AppError::sink(SinkError::WriteLog { source }))?;
            buffer.clear();
        }
    }

    if !buffer.is_empty() {
        writer
            .write_all(buffer.as_bytes())
            .await
            .map_err(|source| AppError::sink(SinkError::WriteLog { source }))?;
    }
    writer
        .flush()
        .await
        .map_err(|source| AppError::sink(SinkError::FlushLog { source }))?;
    info!(lines, "Request log flushed");

    Ok(LogReport {
        lines,
        latency: histogram.summary(),
    })
}

/// `timestamp,offsetMs,elapsedMs,status,inFlight,rate`
pub(crate) fn format_record(
    buffer: &mut String,
    wall_start: DateTime<Utc>,
    record: &LogRecord,
) -> Result<(), SinkError> {
    let timestamp = chrono::Duration::from_std(record.offset)
        .ok()
        .and_then(|offset| wall_start.checked_add_signed(offset))
        .unwrap_or(wall_start);
    writeln!(
        buffer,
        "{},{},{:.3},{},{},{:.1}",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        record.offset.as_millis(),
        duration_ms(record.elapsed),
        record.status,
        record.in_flight,
        record.rate
    )
    .map_err(|source| SinkError::WriteLine { source })
}
