use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::shutdown::ShutdownReceiver;

use super::ticker::RateHandle;

/// How often the ramp recomputes the interpolated rate.
pub const RAMP_UPDATE_INTERVAL: Duration = Duration::from_millis(500);
/// Keyboard increment/decrement.
pub const RATE_STEP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampCommand {
    Increase,
    Decrease,
    Set(f64),
}

/// Cloneable control surface for the ramp task.
#[derive(Debug, Clone)]
pub struct RampHandle {
    tx: mpsc::UnboundedSender<RampCommand>,
}

impl RampHandle {
    #[must_use]
    pub fn increase(&self) -> bool {
        self.tx.send(RampCommand::Increase).is_ok()
    }

    #[must_use]
    pub fn decrease(&self) -> bool {
        self.tx.send(RampCommand::Decrease).is_ok()
    }

    #[must_use]
    pub fn set(&self, rate: f64) -> bool {
        self.tx.send(RampCommand::Set(rate)).is_ok()
    }
}

/// Rate to request `elapsed` into a ramp of length `ramp`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "Linear interpolation of the rate")]
pub fn ramp_rate(target: f64, elapsed: Duration, ramp: Duration) -> f64 {
    if ramp.is_zero() || elapsed >= ramp {
        return target;
    }
    target * elapsed.div_duration_f64(ramp)
}

#[expect(clippy::float_arithmetic, reason = "Keyboard steps shift a float rate")]
fn apply_command(target: f64, command: RampCommand) -> f64 {
    let next = match command {
        RampCommand::Increase => target + RATE_STEP,
        RampCommand::Decrease => target - RATE_STEP,
        RampCommand::Set(rate) => rate,
    };
    if next.is_finite() { next.max(0.0) } else { target }
}

pub fn spawn_ramp(
    target: f64,
    ramp: Duration,
    rates: RateHandle,
    shutdown_rx: ShutdownReceiver,
) -> (RampHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_ramp(target, ramp, rates, rx, shutdown_rx));
    (RampHandle { tx }, handle)
}

async fn run_ramp(
    mut target: f64,
    ramp: Duration,
    rates: RateHandle,
    mut commands: mpsc::UnboundedReceiver<RampCommand>,
    mut shutdown_rx: ShutdownReceiver,
) {
    let start = Instant::now();
    let mut update = tokio::time::interval(RAMP_UPDATE_INTERVAL);
    update.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_sent: Option<f64> = None;
    let mut commands_open = true;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            command = commands.recv(), if commands_open => {
                let Some(command) = command else {
                    commands_open = false;
                    continue;
                };
                target = apply_command(target, command);
                debug!("Target rate now {:.1}/s", target);
                if start.elapsed() >= ramp && last_sent != Some(target) {
                    if !rates.set_rate(target) {
                        break;
                    }
                    last_sent = Some(target);
                }
            }
            _ = update.tick() => {
                let elapsed = start.elapsed();
                let ramping = elapsed < ramp;
                let rate = ramp_rate(target, elapsed, ramp);
                if ramping || last_sent != Some(rate) {
                    if !rates.set_rate(rate) {
                        break;
                    }
                    last_sent = Some(rate);
                }
            }
        }
    }
    debug!("Ramp controller stopped");
}
