pub mod controls;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod tick_task;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that builds the web server router.
pub use ws_handler::ws_handler;

use axum::{
    routing::{delete, get, post},
    Router,
};
use rest::{
    clear_garden_handler, delete_flower_handler, flower_svg_handler, get_settings_handler,
    get_stats_handler, get_timer_handler, list_garden_handler, pause_timer_handler,
    preview_svg_handler, put_settings_handler, reset_timer_handler, skip_timer_handler,
    start_timer_handler,
};
use state::AppState;
use std::sync::Arc;

/// All REST and WebSocket routes, bound to the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", get(get_timer_handler))
        .route("/timer/start", post(start_timer_handler))
        .route("/timer/pause", post(pause_timer_handler))
        .route("/timer/skip", post(skip_timer_handler))
        .route("/timer/reset", post(reset_timer_handler))
        .route("/stats", get(get_stats_handler))
        .route("/settings", get(get_settings_handler).put(put_settings_handler))
        .route("/garden", get(list_garden_handler).delete(clear_garden_handler))
        .route("/garden/{id}", delete(delete_flower_handler))
        .route("/garden/{id}/svg", get(flower_svg_handler))
        .route("/flower/svg", get(preview_svg_handler))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
