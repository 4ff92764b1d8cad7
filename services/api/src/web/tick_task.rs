//! services/api/src/web/tick_task.rs
//!
//! This module contains the asynchronous "worker" function that drives one
//! tick chain of the timer.

use crate::web::{protocol::ServerMessage, state::AppState};
use flower_timer_core::{domain::format_clock, TickHandle, TickOutcome};
use std::sync::Arc;
use tracing::{debug, info};

/// The tick loop for one chain.
///
/// Wakes every `tick_interval`, asks the timer to recompute its countdown and
/// forwards the result to connected pages. It ends when its token is
/// cancelled (pause, reset, or a newer chain), when the timer reports the
/// chain stale, or when a break finishes.
pub async fn tick_process(app_state: Arc<AppState>, chain: TickHandle) {
    let interval = app_state.config.tick_interval;
    let mut last_remaining = None;
    info!("Tick chain {} started.", chain.id());

    loop {
        tokio::select! {
            _ = chain.token().cancelled() => {
                info!("Tick chain {} cancelled.", chain.id());
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let mut timer = app_state.timer.lock().await;
        let before = timer.phase();
        match timer.tick(&chain).await {
            TickOutcome::Stopped => {
                debug!("Tick chain {} is stale; stopping.", chain.id());
                return;
            }
            TickOutcome::Continue { remaining_secs } => {
                if last_remaining != Some(remaining_secs) {
                    last_remaining = Some(remaining_secs);
                    app_state.publish(ServerMessage::Tick {
                        phase: before,
                        remaining_secs,
                        display: format_clock(remaining_secs),
                    });
                }
            }
            TickOutcome::WorkCompleted(completed) => {
                last_remaining = None;
                app_state.publish(ServerMessage::SessionCompleted {
                    stats: completed.stats,
                    flower: completed.flower,
                });
                app_state.publish(ServerMessage::PhaseChanged {
                    from: before,
                    timer: timer.snapshot(),
                });
            }
            TickOutcome::BreakCompleted => {
                app_state.publish(ServerMessage::PhaseChanged {
                    from: before,
                    timer: timer.snapshot(),
                });
                info!("Tick chain {} finished with the break.", chain.id());
                return;
            }
        }
    }
}
