//! crates/flower_timer_core/src/timer.rs
//!
//! The timer state machine: idle -> running <-> paused, running -> break -> idle.
//!
//! The timer never counts ticks. Each tick recomputes remaining time from the
//! session's start epoch, so a late or dropped tick only delays the display.
//! Ticking itself is driven by the host: transitions that begin counting hand
//! back a `TickHandle`, and the host calls `tick` with it until told to stop.
//! Only the most recently issued handle is honored.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{
    format_clock, CompletedSession, GrowthStage, Phase, Session, Settings, Species,
};
use crate::ports::{Clock, GrowthRenderer};
use crate::store::PersistenceStore;

/// The handle of one scheduled tick chain.
#[derive(Debug, Clone)]
pub struct TickHandle {
    id: u64,
    token: CancellationToken,
}

impl TickHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancelled as soon as the timer leaves the chain behind.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl PartialEq for TickHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TickHandle {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The handle is stale or nothing is counting down. The chain should end.
    Stopped,
    Continue { remaining_secs: u64 },
    /// Work finished; the break is now counting on the same chain.
    WorkCompleted(CompletedSession),
    /// Break finished; the timer is idle and the chain has ended.
    BreakCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    Ignored,
    /// Work was cut short and credited in full. `chain` is set when the break
    /// needs a new tick chain (skipping from pause).
    WorkCompleted {
        completed: CompletedSession,
        chain: Option<TickHandle>,
    },
    BreakSkipped,
}

/// A point-in-time view of the timer for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub display: String,
    pub progress_percent: f64,
    pub species: Species,
    pub stage: GrowthStage,
    pub settings: Settings,
}

pub struct Timer {
    store: Arc<PersistenceStore>,
    renderer: Arc<dyn GrowthRenderer>,
    clock: Arc<dyn Clock>,
    settings: Settings,
    session: Session,
    species: Species,
    scheduled: Option<TickHandle>,
    next_chain_id: u64,
}

impl Timer {
    /// Builds an idle timer using the stored settings.
    pub async fn new(store: Arc<PersistenceStore>, renderer: Arc<dyn GrowthRenderer>) -> Self {
        let settings = store.get_settings().await;
        let clock = store.clock();
        let species = Species::random();
        renderer.init(species);
        Self {
            store,
            renderer,
            clock,
            settings,
            session: Session::idle(settings.work_duration_minutes),
            species,
            scheduled: None,
            next_chain_id: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn current_chain(&self) -> Option<&TickHandle> {
        self.scheduled.as_ref()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.session.remaining_at(self.clock.now_millis())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let mut session = self.session.clone();
        session.remaining_secs = self.remaining_secs();
        let progress = session.progress_percent();
        let stage = match session.phase {
            Phase::Idle => GrowthStage::Seed,
            Phase::Running | Phase::Paused => GrowthStage::from_progress(progress),
            Phase::Break => GrowthStage::Blooming,
        };
        TimerSnapshot {
            phase: session.phase,
            remaining_secs: session.remaining_secs,
            total_secs: session.total_duration_secs,
            display: format_clock(session.remaining_secs),
            progress_percent: progress,
            species: self.species,
            stage,
            settings: self.settings,
        }
    }

    /// Starts a fresh work session from idle, or resumes from pause.
    /// Returns the new tick chain, or `None` if the timer was already counting.
    pub fn start(&mut self) -> Option<TickHandle> {
        let now = self.clock.now_millis();
        match self.session.phase {
            Phase::Idle => {
                self.species = Species::random();
                self.renderer.init(self.species);
                self.session =
                    Session::counting(Phase::Running, self.settings.work_duration_minutes, now);
                info!(
                    "Work session started: {} minutes, growing a {}",
                    self.settings.work_duration_minutes, self.species
                );
            }
            Phase::Paused => {
                self.session.started_at_millis = Some(now - self.session.paused_elapsed_millis);
                self.session.phase = Phase::Running;
                info!("Work session resumed with {}s left", self.session.remaining_secs);
            }
            Phase::Running | Phase::Break => return None,
        }
        Some(self.schedule())
    }

    /// Freezes a running work session. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        if self.session.phase != Phase::Running {
            return false;
        }
        let now = self.clock.now_millis();
        self.cancel_scheduled();
        self.session.remaining_secs = self.session.remaining_at(now);
        self.session.paused_elapsed_millis = self.session.elapsed_millis(now);
        self.session.phase = Phase::Paused;
        info!("Work session paused with {}s left", self.session.remaining_secs);
        true
    }

    /// Ends the current phase early. Skipping work (running or paused) credits
    /// the full session exactly like a natural finish.
    pub async fn skip(&mut self) -> SkipOutcome {
        match self.session.phase {
            Phase::Running | Phase::Paused => {
                let had_chain = self.has_live_chain();
                let completed = self.complete_work().await;
                let chain = if had_chain { None } else { Some(self.schedule()) };
                SkipOutcome::WorkCompleted { completed, chain }
            }
            Phase::Break => {
                info!("Break skipped");
                self.reset();
                SkipOutcome::BreakSkipped
            }
            Phase::Idle => SkipOutcome::Ignored,
        }
    }

    /// Returns to idle from any phase with a full work duration on the clock.
    pub fn reset(&mut self) {
        self.cancel_scheduled();
        self.session = Session::idle(self.settings.work_duration_minutes);
        self.renderer.reset();
    }

    /// Adopts new settings. An idle timer shows the new work duration at once;
    /// a session in progress keeps the duration it started with.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        if self.session.phase == Phase::Idle {
            self.session = Session::idle(settings.work_duration_minutes);
        }
    }

    /// One step of the chain identified by `handle`.
    pub async fn tick(&mut self, handle: &TickHandle) -> TickOutcome {
        let is_current = self
            .scheduled
            .as_ref()
            .is_some_and(|current| current.id == handle.id);
        if !is_current || handle.is_cancelled() || !self.session.phase.is_counting() {
            return TickOutcome::Stopped;
        }

        let now = self.clock.now_millis();
        self.session.remaining_secs = self.session.remaining_at(now);
        if self.session.phase == Phase::Running {
            self.renderer.update_growth(self.session.progress_percent());
        }
        debug!(
            "tick {}: {:?} {}s left",
            handle.id, self.session.phase, self.session.remaining_secs
        );

        if self.session.remaining_secs > 0 {
            return TickOutcome::Continue {
                remaining_secs: self.session.remaining_secs,
            };
        }

        match self.session.phase {
            Phase::Running => TickOutcome::WorkCompleted(self.complete_work().await),
            _ => {
                info!("Break finished");
                self.reset();
                TickOutcome::BreakCompleted
            }
        }
    }

    async fn complete_work(&mut self) -> CompletedSession {
        let minutes = self.settings.work_duration_minutes;
        let completed = self
            .store
            .record_completed_session(minutes, self.species)
            .await;
        self.renderer.update_growth(100.0);
        self.session = Session::counting(
            Phase::Break,
            self.settings.break_duration_minutes,
            self.clock.now_millis(),
        );
        info!(
            "Work session complete: {} planted, {} sessions today",
            self.species, completed.stats.today_sessions
        );
        completed
    }

    fn has_live_chain(&self) -> bool {
        self.scheduled.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    fn schedule(&mut self) -> TickHandle {
        self.cancel_scheduled();
        self.next_chain_id += 1;
        let handle = TickHandle {
            id: self.next_chain_id,
            token: CancellationToken::new(),
        };
        self.scheduled = Some(handle.clone());
        handle
    }

    fn cancel_scheduled(&mut self) {
        if let Some(handle) = self.scheduled.take() {
            handle.token.cancel();
        }
    }
}
