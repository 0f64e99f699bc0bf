use super::logging::format_record;
use super::*;
use crate::error::{AppError, AppResult, ValidationError};
use crate::test_support::close_to;
use chrono::{TimeZone, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn default_bucketer() -> AppResult<LatencyBucketer> {
    Ok(LatencyBucketer::new(
        Duration::ZERO,
        Duration::from_millis(100),
        10,
    )?)
}

fn after(epoch: Instant, offset: Duration) -> Instant {
    epoch.checked_add(offset).unwrap_or(epoch)
}

fn aggregator(bucketer: LatencyBucketer, epoch: Instant) -> StatsAggregator {
    let window = MovingWindow::new(WINDOW, REFRESH_INTERVAL, bucketer.len(), epoch);
    StatsAggregator::new(bucketer, window)
}

#[test]
fn bucket_clamps_to_first_and_last_rows() -> AppResult<()> {
    let bucketer = LatencyBucketer::new(
        Duration::from_millis(20),
        Duration::from_millis(500),
        12,
    )?;
    for elapsed in [-50.0, -0.5, 0.0, 5.0, 19.9, 20.0, 20.5] {
        let bucket = bucketer.bucket(elapsed);
        if bucket != 0 {
            return Err(AppError::validation(format!(
                "Expected bucket 0 for {}ms, got {}",
                elapsed, bucket
            )));
        }
    }
    for elapsed in [500.0, 500.1, 10_000.0, f64::MAX, f64::INFINITY] {
        let bucket = bucketer.bucket(elapsed);
        if bucket != 11 {
            return Err(AppError::validation(format!(
                "Expected last bucket for {}ms, got {}",
                elapsed, bucket
            )));
        }
    }
    if bucketer.bucket(f64::NAN) != 0 {
        return Err(AppError::validation("NaN should map to bucket 0"));
    }
    Ok(())
}

#[test]
#[expect(
    clippy::float_arithmetic,
    reason = "Sweeps latencies in quarter-millisecond steps"
)]
fn bucket_is_monotonic_and_in_range() -> AppResult<()> {
    let bucketer = default_bucketer()?;
    let mut previous = 0usize;
    let mut elapsed = -10.0f64;
    while elapsed < 250.0 {
        let bucket = bucketer.bucket(elapsed);
        if bucket >= bucketer.len() {
            return Err(AppError::validation(format!(
                "Bucket {} out of range for {}ms",
                bucket, elapsed
            )));
        }
        if bucket < previous {
            return Err(AppError::validation(format!(
                "Bucket decreased from {} to {} at {}ms",
                previous, bucket, elapsed
            )));
        }
        previous = bucket;
        elapsed += 0.25;
    }
    Ok(())
}

#[test]
fn bucket_index_is_measured_from_log_origin() -> AppResult<()> {
    let bucketer = default_bucketer()?;
    if !close_to(bucketer.start_ms(), 1.0, f64::EPSILON) {
        return Err(AppError::validation(format!(
            "Unexpected log origin {}",
            bucketer.start_ms()
        )));
    }
    let cases = [
        (0.5, 0),
        (1.5, 0),
        (2.0, 1),
        (2.5, 1),
        (3.0, 2),
        (5.0, 3),
        (50.0, 7),
        (99.0, 8),
        (100.0, 9),
        (150.0, 9),
    ];
    for (elapsed, expected) in cases {
        let actual = bucketer.bucket(elapsed);
        if actual != expected {
            return Err(AppError::validation(format!(
                "{}ms landed in row {}, expected {}",
                elapsed, actual, expected
            )));
        }
    }
    Ok(())
}

#[test]
fn labels_use_range_notation() -> AppResult<()> {
    let bucketer = default_bucketer()?;
    let first = bucketer.label(0);
    let last = bucketer.label(9);
    let second = bucketer.label(1);
    let middle = bucketer.label(8);
    if first != "<1.0" {
        return Err(AppError::validation(format!("Unexpected first label {first}")));
    }
    if last != "100+" {
        return Err(AppError::validation(format!("Unexpected last label {last}")));
    }
    if second != "1.0-1.8" {
        return Err(AppError::validation(format!("Unexpected second label {second}")));
    }
    if middle != " 56-100" {
        return Err(AppError::validation(format!("Unexpected middle label {middle}")));
    }
    Ok(())
}

#[test]
fn bucketer_rejects_bad_parameters() -> AppResult<()> {
    match LatencyBucketer::new(Duration::ZERO, Duration::from_millis(100), 2) {
        Err(ValidationError::TooFewBuckets { min: 3, actual: 2 }) => {}
        other => {
            return Err(AppError::validation(format!(
                "Expected TooFewBuckets, got {:?}",
                other
            )));
        }
    }
    match LatencyBucketer::new(Duration::from_millis(100), Duration::from_millis(100), 10) {
        Err(ValidationError::LatencyBoundsInverted { .. }) => {}
        other => {
            return Err(AppError::validation(format!(
                "Expected LatencyBoundsInverted, got {:?}",
                other
            )));
        }
    }
    match LatencyBucketer::new(Duration::from_millis(10), Duration::from_micros(10_500), 10) {
        Err(ValidationError::LatencySpanTooSmall { .. }) => {}
        other => {
            return Err(AppError::validation(format!(
                "Expected LatencySpanTooSmall, got {:?}",
                other
            )));
        }
    }
    Ok(())
}

#[test]
fn round_trip_samples_land_in_expected_rows() -> AppResult<()> {
    let epoch = Instant::now();
    let stats = aggregator(default_bucketer()?, epoch);
    let mut buckets = Vec::new();
    for millis in [5, 50, 150] {
        stats.record_sent();
        let started = epoch;
        let finished = after(epoch, Duration::from_millis(millis));
        buckets.push(stats.record_result(&AttackResult::response(200, started, finished)));
    }

    let first = buckets.first().copied().unwrap_or(usize::MAX);
    let middle = buckets.get(1).copied().unwrap_or(usize::MAX);
    let last = buckets.get(2).copied().unwrap_or(usize::MAX);
    if first >= middle || middle == 0 || middle >= 9 || last != 9 {
        return Err(AppError::validation(format!(
            "Unexpected rows {:?}",
            buckets
        )));
    }

    let snapshot = stats.snapshot_at(after(epoch, Duration::from_millis(200)));
    if snapshot.histogram.bad.iter().sum::<u64>() != 0 {
        return Err(AppError::validation("Expected no bad samples"));
    }
    if snapshot.histogram.ok.iter().sum::<u64>() != 3 {
        return Err(AppError::validation(format!(
            "Expected 3 ok samples, got {:?}",
            snapshot.histogram.ok
        )));
    }
    Ok(())
}

#[test]
fn window_forgets_samples_after_window_elapses() -> AppResult<()> {
    let epoch = Instant::now();
    let window = MovingWindow::new(WINDOW, REFRESH_INTERVAL, 4, epoch);
    if window.slot_count() != 50 {
        return Err(AppError::validation(format!(
            "Expected 50 slots, got {}",
            window.slot_count()
        )));
    }

    let t0 = after(epoch, Duration::from_millis(50));
    window.record(t0, 1, true);
    window.record(t0, 1, false);
    window.record(after(t0, Duration::from_secs(3)), 2, true);

    let snapshot = window.snapshot_at(after(t0, Duration::from_secs(5)));
    if snapshot.total() != 3 || snapshot.max_combined != 2 {
        return Err(AppError::validation(format!(
            "Unexpected snapshot {:?}",
            snapshot
        )));
    }

    let later = window.snapshot_at(after(t0, WINDOW.saturating_add(Duration::from_millis(200))));
    if later.total() != 1 {
        return Err(AppError::validation(format!(
            "Expected only the 3s sample to remain, got {:?}",
            later
        )));
    }

    let gone = window.snapshot_at(after(t0, Duration::from_secs(30)));
    if gone.total() != 0 || gone.max_combined != 1 {
        return Err(AppError::validation(format!(
            "Expected empty window, got {:?}",
            gone
        )));
    }
    Ok(())
}

#[test]
fn window_clears_reused_slot_once() -> AppResult<()> {
    let epoch = Instant::now();
    let window = MovingWindow::new(Duration::from_secs(1), REFRESH_INTERVAL, 2, epoch);
    window.record(epoch, 0, true);
    window.record(epoch, 0, true);

    // Same physical slot, one full lap later.
    let lap = after(epoch, Duration::from_secs(1));
    window.record(lap, 1, false);
    window.record(lap, 1, false);

    let snapshot = window.snapshot_at(lap);
    if snapshot.ok != vec![0, 0] || snapshot.bad != vec![0, 2] {
        return Err(AppError::validation(format!(
            "Stale counts survived the lap: {:?}",
            snapshot
        )));
    }
    Ok(())
}

#[test]
fn window_concurrent_writers_lose_nothing() -> AppResult<()> {
    let epoch = Instant::now();
    let window = std::sync::Arc::new(MovingWindow::new(WINDOW, REFRESH_INTERVAL, 3, epoch));
    let now = after(epoch, Duration::from_millis(700));
    let mut handles = Vec::new();
    for worker in 0..8usize {
        let window = window.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..1000usize {
                window.record(now, worker.wrapping_add(i) % 3, i % 2 == 0);
            }
        }));
    }
    for handle in handles {
        if handle.join().is_err() {
            return Err(AppError::validation("Writer thread panicked"));
        }
    }
    let total = window.snapshot_at(now).total();
    if total != 8000 {
        return Err(AppError::validation(format!(
            "Expected 8000 samples, got {}",
            total
        )));
    }
    Ok(())
}

#[test]
fn stats_identity_holds_for_mixed_outcomes() -> AppResult<()> {
    let epoch = Instant::now();
    let stats = aggregator(default_bucketer()?, epoch);
    let finished = after(epoch, Duration::from_millis(12));
    let outcomes = [
        AttackResult::response(200, epoch, finished),
        AttackResult::response(503, epoch, finished),
        AttackResult::response(404, epoch, finished),
        AttackResult::failed(FailureClass::Timeout, epoch, finished),
        AttackResult::failed(FailureClass::DnsFailure, epoch, finished),
        AttackResult::failed(FailureClass::Other, epoch, finished),
    ];
    for outcome in &outcomes {
        stats.record_sent();
        stats.record_result(outcome);
    }
    stats.record_sent();

    let snapshot = stats.snapshot_at(finished);
    if snapshot.sent != 7 || snapshot.received != 6 || snapshot.in_flight != 1 {
        return Err(AppError::validation(format!(
            "Unexpected totals {:?}",
            snapshot
        )));
    }
    let accounted = snapshot
        .http_responses()
        .saturating_add(snapshot.errors.total());
    if accounted != snapshot.received {
        return Err(AppError::validation(format!(
            "received {} != responses + errors {}",
            snapshot.received, accounted
        )));
    }
    if snapshot.statuses.first() != Some(&(0, 3)) {
        return Err(AppError::validation(format!(
            "Expected 3 no-response entries, got {:?}",
            snapshot.statuses
        )));
    }
    let ok: u64 = snapshot.histogram.ok.iter().sum();
    let bad: u64 = snapshot.histogram.bad.iter().sum();
    if ok != 1 || bad != 5 {
        return Err(AppError::validation(format!(
            "Expected 1 ok and 5 bad, got {} and {}",
            ok, bad
        )));
    }
    Ok(())
}

#[test]
fn stats_clamp_unknown_status_codes() -> AppResult<()> {
    let epoch = Instant::now();
    let stats = aggregator(default_bucketer()?, epoch);
    stats.record_sent();
    stats.record_result(&AttackResult::response(u16::MAX, epoch, epoch));
    let snapshot = stats.snapshot_at(epoch);
    if snapshot.status_out_of_range != 1 || !snapshot.statuses.is_empty() {
        return Err(AppError::validation(format!(
            "Expected out-of-range status, got {:?}",
            snapshot
        )));
    }
    Ok(())
}

#[test]
fn stats_reset_carries_in_flight_as_sent() -> AppResult<()> {
    let epoch = Instant::now();
    let stats = aggregator(default_bucketer()?, epoch);
    for _ in 0..5 {
        stats.record_sent();
    }
    stats.record_result(&AttackResult::response(200, epoch, epoch));
    stats.reset();

    let snapshot = stats.snapshot_at(epoch);
    if snapshot.sent != 4 || snapshot.received != 0 || snapshot.in_flight != 4 {
        return Err(AppError::validation(format!(
            "Unexpected snapshot after reset {:?}",
            snapshot
        )));
    }
    if snapshot.histogram.total() != 0 || !snapshot.statuses.is_empty() {
        return Err(AppError::validation("Reset left histogram data behind"));
    }

    stats.record_sent();
    for _ in 0..5 {
        stats.record_result(&AttackResult::response(200, epoch, epoch));
    }
    let drained = stats.snapshot_at(epoch);
    if drained.sent != 5 || drained.received != 5 || drained.in_flight != 0 {
        return Err(AppError::validation(format!(
            "Counters disagree after drain: sent {} received {} in-flight {}",
            drained.sent, drained.received, drained.in_flight
        )));
    }
    if drained.statuses != [(200, 5)] {
        return Err(AppError::validation(format!(
            "Unexpected statuses after drain {:?}",
            drained.statuses
        )));
    }
    Ok(())
}

#[test]
fn stats_sample_rate_uses_delta() -> AppResult<()> {
    let stats = aggregator(default_bucketer()?, Instant::now());
    for _ in 0..40 {
        stats.record_sent();
    }
    let first = stats.sample_rate(Duration::from_secs(2));
    for _ in 0..10 {
        stats.record_sent();
    }
    let second = stats.sample_rate(Duration::from_secs(1));
    if !close_to(first, 20.0, f64::EPSILON) || !close_to(second, 10.0, f64::EPSILON) {
        return Err(AppError::validation(format!(
            "Unexpected rates {} and {}",
            first, second
        )));
    }
    if !close_to(stats.observed_rate(), 10.0, f64::EPSILON) {
        return Err(AppError::validation("observed_rate not updated"));
    }
    Ok(())
}

#[test]
fn log_line_has_six_columns() -> AppResult<()> {
    let wall_start = Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .ok_or_else(|| AppError::validation("invalid timestamp"))?;
    let record = LogRecord {
        offset: Duration::from_millis(1500),
        elapsed: Duration::from_micros(12_345),
        status: 201,
        in_flight: 7,
        rate: 49.5,
    };
    let mut line = String::new();
    format_record(&mut line, wall_start, &record)?;
    if line != "2024-05-01T12:00:01.500Z,1500,12.345,201,7,49.5\n" {
        return Err(AppError::validation(format!("Unexpected line {line:?}")));
    }
    Ok(())
}

#[test]
fn request_logger_flushes_all_lines() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("requests.csv");
        let (sink, handle) = setup_request_logger(&path, Utc::now()).await?;
        for i in 0..250u64 {
            let sent = sink.send(LogRecord {
                offset: Duration::from_millis(i),
                elapsed: Duration::from_millis((i % 40).saturating_add(1)),
                status: 200,
                in_flight: 1,
                rate: 50.0,
            });
            if !sent {
                return Err(AppError::validation("Log sink closed early"));
            }
        }
        drop(sink);

        let report = handle.await??;
        if report.lines != 250 || report.latency.count != 250 {
            return Err(AppError::validation(format!(
                "Unexpected report {:?}",
                report
            )));
        }
        if report.latency.max_ms < report.latency.p50_ms {
            return Err(AppError::validation("max below median"));
        }
        let contents = tokio::fs::read_to_string(&path).await?;
        if contents.lines().count() != 250 {
            return Err(AppError::validation(format!(
                "Expected 250 lines, got {}",
                contents.lines().count()
            )));
        }
        Ok(())
    })
}

#[test]
fn request_logger_fails_on_missing_directory() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing").join("requests.csv");
        match setup_request_logger(&path, Utc::now()).await {
            Err(AppError::Sink(crate::error::SinkError::CreateLog { .. })) => Ok(()),
            Err(other) => Err(AppError::validation(format!(
                "Expected CreateLog, got {}",
                other
            ))),
            Ok(_) => Err(AppError::validation("Expected CreateLog error")),
        }
    })
}
