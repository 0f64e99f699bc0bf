use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::debug;

use crate::metrics::f64_to_count;
use crate::shutdown::ShutdownReceiver;

use super::TargetRate;

/// Highest rate a single timer is asked to deliver; faster rates are split
/// into batches of `multiplier` ticks per fire.
pub const MAX_TIMER_RATE: f64 = 100.0;
const MAX_TICK_INTERVAL: Duration = Duration::from_secs(3600);

/// Timer period and batch size for a requested rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePlan {
    pub interval: Duration,
    pub multiplier: u32,
}

impl RatePlan {
    /// `None` parks the ticker: zero, negative and non-finite rates.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "Rates are fractional ticks per second"
    )]
    pub fn for_rate(rate: f64) -> Option<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let batches = (rate / MAX_TIMER_RATE).ceil();
        let multiplier = u32::try_from(f64_to_count(batches))
            .unwrap_or(u32::MAX)
            .max(1);
        let per_timer = rate / f64::from(multiplier);
        let nanos = f64_to_count((1e9 / per_timer).round());
        let interval = Duration::from_nanos(nanos).clamp(Duration::from_nanos(1), MAX_TICK_INTERVAL);
        Some(Self {
            interval,
            multiplier,
        })
    }

    fn start(self, first_fire: Instant) -> Interval {
        let mut timer = interval_at(first_fire, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }
}

/// Sends new target rates to the ticker task.
#[derive(Debug, Clone)]
pub struct RateHandle {
    tx: mpsc::UnboundedSender<f64>,
}

impl RateHandle {
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<f64>) -> Self {
        Self { tx }
    }

    #[must_use]
    pub fn set_rate(&self, rate: f64) -> bool {
        self.tx.send(rate).is_ok()
    }
}

struct Active {
    plan: RatePlan,
    timer: Interval,
    /// Last scheduled fire, or the moment the ticker left idle.
    last_fire: Instant,
}

/// Single owner of the timer. Emits `multiplier` ticks per timer fire into
/// `ticks` and closes it when shut down.
pub fn spawn_ticker(
    initial_rate: f64,
    target: Arc<TargetRate>,
    ticks: async_channel::Sender<Instant>,
    shutdown_rx: ShutdownReceiver,
) -> (RateHandle, JoinHandle<()>) {
    let (rate_tx, rate_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_ticker(initial_rate, target, ticks, rate_rx, shutdown_rx));
    (RateHandle::new(rate_tx), handle)
}

async fn run_ticker(
    initial_rate: f64,
    target: Arc<TargetRate>,
    ticks: async_channel::Sender<Instant>,
    mut rate_rx: mpsc::UnboundedReceiver<f64>,
    mut shutdown_rx: ShutdownReceiver,
) {
    let mut active = apply_rate(None, initial_rate, &target);
    let mut rates_open = true;

    'outer: loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            fired = next_fire(&mut active) => {
                let batch = active.as_mut().map_or(0, |active| {
                    active.last_fire = fired;
                    active.plan.multiplier
                });
                for _ in 0..batch {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => break 'outer,
                        sent = ticks.send(fired) => {
                            if sent.is_err() {
                                break 'outer;
                            }
                        }
                    }
                }
            }
            rate = rate_rx.recv(), if rates_open => match rate {
                Some(rate) => active = apply_rate(active, rate, &target),
                None => rates_open = false,
            },
        }
    }

    ticks.close();
    debug!("Ticker stopped");
}

fn apply_rate(current: Option<Active>, rate: f64, target: &TargetRate) -> Option<Active> {
    let Some(plan) = RatePlan::for_rate(rate) else {
        target.set(0.0);
        debug!("Ticker idle (requested rate {})", rate);
        return None;
    };
    target.set(rate);
    if current.as_ref().is_some_and(|active| active.plan == plan) {
        return current;
    }
    debug!(
        "Ticker rate {:.2}/s: {} tick(s) every {:?}",
        rate, plan.multiplier, plan.interval
    );
    // A running timer keeps its phase across replans.
    let now = Instant::now();
    let last_fire = current.map_or(now, |active| active.last_fire);
    let first_fire = last_fire
        .checked_add(plan.interval)
        .map_or(now, |next| next.max(now));
    Some(Active {
        plan,
        timer: plan.start(first_fire),
        last_fire,
    })
}

async fn next_fire(active: &mut Option<Active>) -> Instant {
    match active {
        Some(active) => active.timer.tick().await,
        None => std::future::pending().await,
    }
}
