//! Load generation: ticker, ramp controller, and the worker pool.
mod dispatcher;
mod ramp;
mod ticker;


use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::http::{ConnectionStats, RequestPool, Transport};
use crate::metrics::{LogSink, StatsAggregator, StatsSnapshot};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};

pub use dispatcher::Dispatcher;
pub use ramp::{RAMP_UPDATE_INTERVAL, RATE_STEP, RampCommand, RampHandle, ramp_rate, spawn_ramp};
pub use ticker::{MAX_TIMER_RATE, RateHandle, RatePlan, spawn_ticker};

/// How often the observed send rate is sampled.
pub const RATE_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Rate the ticker is currently producing, shared with the UI and the log.
#[derive(Debug)]
pub struct TargetRate(AtomicU64);

impl TargetRate {
    #[must_use]
    pub fn new(rate: f64) -> Self {
        Self(AtomicU64::new(rate.to_bits()))
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, rate: f64) {
        self.0.store(rate.to_bits(), Ordering::Relaxed);
    }
}

impl Default for TargetRate {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// State shared by every worker.
pub struct EngineContext {
    pub pool: RequestPool,
    pub transport: Arc<dyn Transport>,
    pub stats: Arc<StatsAggregator>,
    pub target: Arc<TargetRate>,
    pub log: Option<LogSink>,
    pub echo: bool,
    pub started: Instant,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("templates", &self.pool.len())
            .field("target", &self.target.get())
            .field("log", &self.log.is_some())
            .field("echo", &self.echo)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub workers: usize,
    pub rate: f64,
    pub ramp_up: Duration,
    pub echo: bool,
}

/// Point-in-time view of the engine for the UI and the final summary.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub stats: StatsSnapshot,
    pub target_rate: f64,
    pub connections: ConnectionStats,
}

/// A running load test.
#[derive(Debug)]
pub struct Engine {
    context: Arc<EngineContext>,
    controls: RampHandle,
    shutdown_tx: ShutdownSender,
    ticker: JoinHandle<()>,
    ramp: JoinHandle<()>,
    sampler: JoinHandle<()>,
    dispatcher: Dispatcher,
}

impl Engine {
    /// Spawn the ticker, ramp controller, rate sampler and workers.
    ///
    /// Must be called from within a Tokio runtime. The engine owns `log`;
    /// the request log closes once the engine is shut down.
    #[must_use]
    pub fn start(
        config: EngineConfig,
        pool: RequestPool,
        transport: Arc<dyn Transport>,
        stats: Arc<StatsAggregator>,
        log: Option<LogSink>,
        shutdown_tx: &ShutdownSender,
    ) -> Self {
        let target = Arc::new(TargetRate::default());
        let (tick_tx, tick_rx) = async_channel::bounded(1);

        let context = Arc::new(EngineContext {
            pool,
            transport,
            stats,
            target: target.clone(),
            log,
            echo: config.echo,
            started: Instant::now(),
        });

        let (rates, ticker) = spawn_ticker(0.0, target, tick_tx, shutdown_tx.subscribe());
        let (controls, ramp) = spawn_ramp(
            config.rate.max(0.0),
            config.ramp_up,
            rates,
            shutdown_tx.subscribe(),
        );
        let sampler = tokio::spawn(run_sampler(context.stats.clone(), shutdown_tx.subscribe()));
        let dispatcher = Dispatcher::start(config.workers, &tick_rx, &context);
        drop(tick_rx);

        info!(
            "Started {} worker(s), target {:.1}/s, ramp-up {:?}",
            dispatcher.len(),
            config.rate,
            config.ramp_up
        );

        Self {
            context,
            controls,
            shutdown_tx: shutdown_tx.clone(),
            ticker,
            ramp,
            sampler,
            dispatcher,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            stats: self.context.stats.snapshot(),
            target_rate: self.context.target.get(),
            connections: self.context.transport.connections(),
        }
    }

    #[must_use]
    pub fn controls(&self) -> RampHandle {
        self.controls.clone()
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.context.stats
    }

    pub fn reset_stats(&self) {
        self.context.stats.reset();
        debug!("Statistics reset");
    }

    /// Stop ticking, let every in-flight request complete, and return the
    /// final counters. The request log sink is released on return.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the engine tasks panicked.
    pub async fn shutdown(self) -> AppResult<EngineSnapshot> {
        drop(self.shutdown_tx.send(()));
        self.ticker.await?;
        self.dispatcher.wait().await?;
        self.ramp.await?;
        self.sampler.await?;

        let snapshot = EngineSnapshot {
            stats: self.context.stats.snapshot(),
            target_rate: self.context.target.get(),
            connections: self.context.transport.connections(),
        };
        drop(self.controls);
        drop(self.context);
        Ok(snapshot)
    }
}

async fn run_sampler(stats: Arc<StatsAggregator>, mut shutdown_rx: ShutdownReceiver) {
    let mut timer = interval(RATE_SAMPLE_INTERVAL);
    // Skip the immediate first tick.
    timer.reset();
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = timer.tick() => {
                stats.sample_rate(RATE_SAMPLE_INTERVAL);
            }
        }
    }
}
