use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, poll, read};
use tokio::sync::{broadcast, mpsc};

use crate::shutdown::{ShutdownReceiver, ShutdownSender};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Broadcast channel size for shutdown notifications (single signal fan-out).
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;
/// Keyboard polling interval; bounds how long the reader lingers after shutdown.
const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Interactive controls forwarded from the terminal to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    IncreaseRate,
    DecreaseRate,
    ResetStats,
    Quit,
}

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY)
}

#[must_use]
pub fn map_key_event(key: &KeyEvent) -> Option<KeyCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyCommand::Quit)
        }
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(KeyCommand::Quit),
        KeyCode::Char('k') | KeyCode::Up => Some(KeyCommand::IncreaseRate),
        KeyCode::Char('j') | KeyCode::Down => Some(KeyCommand::DecreaseRate),
        KeyCode::Char('r') => Some(KeyCommand::ResetStats),
        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "Keys without a binding are ignored."
        )]
        _ => None,
    }
}

/// Read key presses on a blocking thread until shutdown. `Quit` is turned
/// into a shutdown broadcast; every other command goes to `commands`.
pub fn setup_keyboard_handler(
    shutdown_tx: &ShutdownSender,
    commands: mpsc::UnboundedSender<KeyCommand>,
) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::task::spawn_blocking(move || {
        loop {
            match shutdown_rx.try_recv() {
                Ok(()) => break,
                Err(broadcast::error::TryRecvError::Closed) => break,
                Err(broadcast::error::TryRecvError::Lagged(_)) => break,
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            let has_event = poll(KEYBOARD_POLL_INTERVAL).unwrap_or_default();
            if !has_event {
                continue;
            }
            let Ok(Event::Key(key)) = read() else {
                continue;
            };
            match map_key_event(&key) {
                Some(KeyCommand::Quit) => {
                    drop(shutdown_tx.send(()));
                    break;
                }
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => {}
            }
        }
    })
}

pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    // Subscribe before spawning so a shutdown sent right away is not missed.
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                eprintln!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                _ = tokio::signal::ctrl_c() => {
                    drop(shutdown_tx.send(()));
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    drop(shutdown_tx.send(()));
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                _ = tokio::signal::ctrl_c() => {
                    drop(shutdown_tx.send(()));
                }
            }
        }
    })
}
