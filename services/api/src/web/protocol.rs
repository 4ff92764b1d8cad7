//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser page and the
//! timer service.

use flower_timer_core::{FlowerRecord, GrowthStage, Phase, Settings, Species, Stats, TimerSnapshot};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start,
    Pause,
    Skip,
    Reset,

    /// A raw key press from the page. `code` is a DOM `KeyboardEvent.code`.
    Key {
        code: String,
        #[serde(default)]
        in_text_input: bool,
    },

    /// Values straight from the settings form; they are coerced server-side.
    SaveSettings {
        #[serde(default)]
        work_duration: Option<serde_json::Value>,
        #[serde(default)]
        break_duration: Option<serde_json::Value>,
    },

    /// Asks for a fresh `Snapshot` on this connection only.
    RequestSnapshot,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full timer state. Sent on connect and on request.
    Snapshot { timer: TimerSnapshot },

    /// The countdown moved to a new second.
    Tick {
        phase: Phase,
        remaining_secs: u64,
        display: String,
    },

    /// The flower grew. `svg` is only present when the growth stage changed.
    Growth {
        species: Species,
        progress_percent: f64,
        stage: GrowthStage,
        stage_name: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        svg: Option<String>,
    },

    PhaseChanged { from: Phase, timer: TimerSnapshot },

    /// A work session was credited and its flower planted.
    SessionCompleted { stats: Stats, flower: FlowerRecord },

    SettingsSaved { settings: Settings },

    /// Reports a problem with the last client message.
    Error { message: String },
}
