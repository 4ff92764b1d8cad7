//! services/api/src/adapters/broadcast_renderer.rs
//!
//! Implements the `GrowthRenderer` port by pushing `Growth` messages to every
//! connected page. The SVG for a stage is only sent when the stage changes;
//! in between, pages just get the new percentage.

use flower_timer_core::{render_svg, GrowthRenderer, GrowthStage, Species};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::web::protocol::ServerMessage;

#[derive(Debug)]
struct RenderState {
    species: Species,
    stage: Option<GrowthStage>,
    whole_percent: Option<u32>,
}

pub struct BroadcastRenderer {
    events: broadcast::Sender<ServerMessage>,
    state: Mutex<RenderState>,
}

impl BroadcastRenderer {
    pub fn new(events: broadcast::Sender<ServerMessage>) -> Self {
        Self {
            events,
            state: Mutex::new(RenderState {
                species: Species::Rose,
                stage: None,
                whole_percent: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RenderState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn draw(&self, state: &mut RenderState, progress_percent: f64) {
        let progress = if progress_percent.is_nan() {
            0.0
        } else {
            progress_percent.clamp(0.0, 100.0)
        };
        let stage = GrowthStage::from_progress(progress);
        let whole_percent = progress.floor() as u32;
        let stage_changed = state.stage != Some(stage);
        if !stage_changed && state.whole_percent == Some(whole_percent) {
            return;
        }
        state.stage = Some(stage);
        state.whole_percent = Some(whole_percent);

        let message = ServerMessage::Growth {
            species: state.species,
            progress_percent: progress,
            stage,
            stage_name: stage.name(),
            svg: stage_changed.then(|| render_svg(state.species, stage)),
        };
        // No connected page is not an error.
        let _ = self.events.send(message);
    }
}

impl GrowthRenderer for BroadcastRenderer {
    fn init(&self, species: Species) {
        let mut state = self.state();
        state.species = species;
        state.stage = None;
        state.whole_percent = None;
        self.draw(&mut state, 0.0);
    }

    fn update_growth(&self, progress_percent: f64) {
        let mut state = self.state();
        self.draw(&mut state, progress_percent);
    }

    fn reset(&self) {
        let mut state = self.state();
        state.stage = None;
        state.whole_percent = None;
        self.draw(&mut state, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn growth(msg: ServerMessage) -> (Species, f64, GrowthStage, bool) {
        match msg {
            ServerMessage::Growth {
                species,
                progress_percent,
                stage,
                svg,
                ..
            } => (species, progress_percent, stage, svg.is_some()),
            other => panic!("expected growth, got {:?}", other),
        }
    }

    #[test]
    fn svg_is_sent_only_on_stage_changes() {
        let (tx, mut rx) = broadcast::channel(16);
        let renderer = BroadcastRenderer::new(tx);

        renderer.init(Species::Lotus);
        assert_eq!(
            growth(rx.try_recv().unwrap()),
            (Species::Lotus, 0.0, GrowthStage::Seed, true)
        );

        renderer.update_growth(0.4);
        assert!(rx.try_recv().is_err());

        renderer.update_growth(10.0);
        assert_eq!(
            growth(rx.try_recv().unwrap()),
            (Species::Lotus, 10.0, GrowthStage::Seed, false)
        );

        renderer.update_growth(15.0);
        assert_eq!(
            growth(rx.try_recv().unwrap()),
            (Species::Lotus, 15.0, GrowthStage::Sprout, true)
        );

        renderer.reset();
        assert_eq!(
            growth(rx.try_recv().unwrap()),
            (Species::Lotus, 0.0, GrowthStage::Seed, true)
        );
    }

    #[test]
    fn works_without_subscribers() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let renderer = BroadcastRenderer::new(tx);
        renderer.init(Species::Poppy);
        renderer.update_growth(100.0);
    }
}
