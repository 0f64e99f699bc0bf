use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::engine::Engine;
use crate::error::AppResult;
use crate::metrics::REFRESH_INTERVAL;
use crate::shutdown::ShutdownSender;
use crate::shutdown_handlers::{KeyCommand, setup_keyboard_handler};
use crate::ui::model::{PlotArea, UiRenderData};

use super::dashboard::{Ui, UiActions};

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        Ui::cleanup();
    }
}

/// Apply one interactive command to the running engine.
pub fn apply_command(engine: &Engine, command: KeyCommand) {
    match command {
        KeyCommand::IncreaseRate => {
            if !engine.controls().increase() {
                debug!("Ramp stopped, rate increase ignored");
            }
        }
        KeyCommand::DecreaseRate => {
            if !engine.controls().decrease() {
                debug!("Ramp stopped, rate decrease ignored");
            }
        }
        KeyCommand::ResetStats => engine.reset_stats(),
        KeyCommand::Quit => {}
    }
}

/// Run the live dashboard until quit, a shutdown signal, or `run_for`
/// elapses. The terminal is restored on every exit path.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn to.
pub async fn run_dashboard(
    engine: &Engine,
    labels: &[String],
    plot: PlotArea,
    shutdown_tx: &ShutdownSender,
    run_for: Option<Duration>,
) -> AppResult<()> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut terminal = Ui::setup_terminal()?;
    let guard = TerminalGuard;

    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
    let keyboard = setup_keyboard_handler(shutdown_tx, commands_tx);

    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break Ok(()),
            () = &mut deadline => {
                debug!("Run duration reached");
                drop(shutdown_tx.send(()));
                break Ok(());
            }
            Some(command) = commands_rx.recv() => apply_command(engine, command),
            _ = refresh.tick() => {
                let data = UiRenderData::from_snapshot(&engine.snapshot(), labels);
                if let Err(err) = Ui::render(&mut terminal, &data, plot) {
                    drop(shutdown_tx.send(()));
                    break Err(err);
                }
            }
        }
    };

    drop(guard);
    keyboard.await?;
    result
}
