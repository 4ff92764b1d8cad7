//! services/api/src/web/controls.rs
//!
//! The single entry point for every timer control, whether it arrives over
//! REST, a WebSocket message or a keyboard shortcut. Applies the command,
//! publishes what changed, and starts a tick chain when the timer asks for one.

use crate::web::{protocol::ServerMessage, state::AppState, tick_task::tick_process};
use flower_timer_core::{
    Phase, Settings, SettingsUpdate, SkipOutcome, TickHandle, TimerSnapshot,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Skip,
    Reset,
    /// Start when idle or paused, pause when running.
    ToggleStartPause,
}

impl TimerCommand {
    /// Maps a key press to a command. Keys typed into a text field never
    /// control the timer.
    pub fn from_key_event(code: &str, in_text_input: bool) -> Option<Self> {
        if in_text_input {
            return None;
        }
        match code {
            "Space" => Some(TimerCommand::ToggleStartPause),
            "KeyR" => Some(TimerCommand::Reset),
            _ => None,
        }
    }

    fn resolve(self, phase: Phase) -> Option<Self> {
        match (self, phase) {
            (TimerCommand::ToggleStartPause, Phase::Idle | Phase::Paused) => {
                Some(TimerCommand::Start)
            }
            (TimerCommand::ToggleStartPause, Phase::Running) => Some(TimerCommand::Pause),
            (TimerCommand::ToggleStartPause, Phase::Break) => None,
            (command, _) => Some(command),
        }
    }
}

/// Applies `command` to the shared timer and returns the resulting state.
pub async fn dispatch(app_state: &Arc<AppState>, command: TimerCommand) -> TimerSnapshot {
    let mut timer = app_state.timer.lock().await;
    let before = timer.phase();

    match command.resolve(before) {
        Some(TimerCommand::Start) => {
            if let Some(chain) = timer.start() {
                spawn_tick_chain(app_state, chain);
            }
        }
        Some(TimerCommand::Pause) => {
            timer.pause();
        }
        Some(TimerCommand::Skip) => {
            if let SkipOutcome::WorkCompleted { completed, chain } = timer.skip().await {
                app_state.publish(ServerMessage::SessionCompleted {
                    stats: completed.stats,
                    flower: completed.flower,
                });
                if let Some(chain) = chain {
                    spawn_tick_chain(app_state, chain);
                }
            }
        }
        Some(TimerCommand::Reset) => timer.reset(),
        Some(TimerCommand::ToggleStartPause) | None => {
            debug!("{:?} has no effect while {}", command, before.as_str());
        }
    }

    let snapshot = timer.snapshot();
    if snapshot.phase != before {
        info!("Timer {} -> {}", before.as_str(), snapshot.phase.as_str());
        app_state.publish(ServerMessage::PhaseChanged {
            from: before,
            timer: snapshot.clone(),
        });
    } else {
        app_state.publish(ServerMessage::Snapshot {
            timer: snapshot.clone(),
        });
    }
    snapshot
}

/// Coerces and stores new durations, then hands them to the timer.
pub async fn save_settings(app_state: &Arc<AppState>, update: &SettingsUpdate) -> Settings {
    let settings = app_state.store.save_settings(update).await;
    app_state.timer.lock().await.apply_settings(settings);
    info!(
        "Settings saved: {} min work, {} min break",
        settings.work_duration_minutes, settings.break_duration_minutes
    );
    app_state.publish(ServerMessage::SettingsSaved { settings });
    settings
}

pub fn spawn_tick_chain(app_state: &Arc<AppState>, chain: TickHandle) -> JoinHandle<()> {
    tokio::spawn(tick_process(app_state.clone(), chain))
}
