//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    controls::{self, TimerCommand},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use flower_timer_core::{
    render_card, render_svg, FlowerRecord, GardenOrder, GrowthStage, Settings, SettingsUpdate,
    Species, Stats, TimerSnapshot,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_timer_handler,
        start_timer_handler,
        pause_timer_handler,
        skip_timer_handler,
        reset_timer_handler,
        get_stats_handler,
        get_settings_handler,
        put_settings_handler,
        list_garden_handler,
        clear_garden_handler,
        delete_flower_handler,
        flower_svg_handler,
        preview_svg_handler,
    ),
    components(
        schemas(
            TimerResponse,
            StatsResponse,
            SettingsResponse,
            SettingsRequest,
            FlowerResponse,
            GardenResponse,
            ClearGardenResponse
        )
    ),
    tags(
        (name = "Flower Pomodoro API", description = "Focus timer that grows a flower per work session.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimerResponse {
    pub phase: String,
    pub remaining_secs: u64,
    pub total_secs: u64,
    /// Remaining time as `m:ss`.
    pub display: String,
    pub progress_percent: f64,
    pub species: String,
    pub stage: usize,
    pub stage_name: String,
    pub work_duration_minutes: u32,
    pub break_duration_minutes: u32,
}

impl From<TimerSnapshot> for TimerResponse {
    fn from(snapshot: TimerSnapshot) -> Self {
        Self {
            phase: snapshot.phase.as_str().to_string(),
            remaining_secs: snapshot.remaining_secs,
            total_secs: snapshot.total_secs,
            display: snapshot.display,
            progress_percent: snapshot.progress_percent,
            species: snapshot.species.to_string(),
            stage: snapshot.stage.index(),
            stage_name: snapshot.stage.name().to_string(),
            work_duration_minutes: snapshot.settings.work_duration_minutes,
            break_duration_minutes: snapshot.settings.break_duration_minutes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub today_sessions: u64,
    pub today_minutes: u64,
    /// `YYYY-MM-DD`
    pub last_session_date: String,
}

impl From<Stats> for StatsResponse {
    fn from(stats: Stats) -> Self {
        Self {
            total_sessions: stats.total_sessions,
            total_minutes: stats.total_minutes,
            today_sessions: stats.today_sessions,
            today_minutes: stats.today_minutes,
            last_session_date: stats.last_session_date.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsResponse {
    pub work_duration_minutes: u32,
    pub break_duration_minutes: u32,
}

impl From<Settings> for SettingsResponse {
    fn from(settings: Settings) -> Self {
        Self {
            work_duration_minutes: settings.work_duration_minutes,
            break_duration_minutes: settings.break_duration_minutes,
        }
    }
}

/// Raw form values. Numbers or numeric strings; anything else keeps the
/// current value.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub work_duration: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub break_duration: Option<serde_json::Value>,
}

impl From<SettingsRequest> for SettingsUpdate {
    fn from(req: SettingsRequest) -> Self {
        Self {
            work_duration: req.work_duration,
            break_duration: req.break_duration,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlowerResponse {
    pub id: String,
    pub species: String,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl From<FlowerRecord> for FlowerResponse {
    fn from(flower: FlowerRecord) -> Self {
        Self {
            id: flower.id,
            species: flower.species.to_string(),
            completed_at: flower.completed_at,
            duration_minutes: flower.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GardenResponse {
    pub count: usize,
    pub flowers: Vec<FlowerResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearGardenResponse {
    pub removed: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GardenQuery {
    /// `newest` (default) or `oldest`.
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// One of the eight species; anything else draws a rose.
    pub species: Option<String>,
    /// 0 to 100.
    pub progress: Option<f64>,
}

fn parse_order(raw: Option<&str>) -> Result<GardenOrder, (StatusCode, String)> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("newest") | Some("desc") => Ok(GardenOrder::Newest),
        Some("oldest") | Some("asc") => Ok(GardenOrder::Oldest),
        Some(other) => Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown garden order '{}'", other),
        )),
    }
}

fn svg_response(svg: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}

//=========================================================================================
// Timer Handlers
//=========================================================================================

/// Current timer state.
#[utoipa::path(
    get,
    path = "/timer",
    responses((status = 200, description = "Timer state", body = TimerResponse))
)]
pub async fn get_timer_handler(State(app_state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let snapshot = app_state.timer.lock().await.snapshot();
    Json(snapshot.into())
}

/// Start a work session, or resume a paused one.
#[utoipa::path(
    post,
    path = "/timer/start",
    responses((status = 200, description = "Timer state after the command", body = TimerResponse))
)]
pub async fn start_timer_handler(State(app_state): State<Arc<AppState>>) -> Json<TimerResponse> {
    Json(controls::dispatch(&app_state, TimerCommand::Start).await.into())
}

/// Pause a running work session.
#[utoipa::path(
    post,
    path = "/timer/pause",
    responses((status = 200, description = "Timer state after the command", body = TimerResponse))
)]
pub async fn pause_timer_handler(State(app_state): State<Arc<AppState>>) -> Json<TimerResponse> {
    Json(controls::dispatch(&app_state, TimerCommand::Pause).await.into())
}

/// Finish work early (credited in full), or cut a break short.
#[utoipa::path(
    post,
    path = "/timer/skip",
    responses((status = 200, description = "Timer state after the command", body = TimerResponse))
)]
pub async fn skip_timer_handler(State(app_state): State<Arc<AppState>>) -> Json<TimerResponse> {
    Json(controls::dispatch(&app_state, TimerCommand::Skip).await.into())
}

/// Back to idle with a full work duration.
#[utoipa::path(
    post,
    path = "/timer/reset",
    responses((status = 200, description = "Timer state after the command", body = TimerResponse))
)]
pub async fn reset_timer_handler(State(app_state): State<Arc<AppState>>) -> Json<TimerResponse> {
    Json(controls::dispatch(&app_state, TimerCommand::Reset).await.into())
}

//=========================================================================================
// Stats and Settings Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Session statistics", body = StatsResponse))
)]
pub async fn get_stats_handler(State(app_state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(app_state.store.get_stats().await.into())
}

#[utoipa::path(
    get,
    path = "/settings",
    responses((status = 200, description = "Current durations", body = SettingsResponse))
)]
pub async fn get_settings_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<SettingsResponse> {
    Json(app_state.store.get_settings().await.into())
}

/// Save new durations. Invalid values are silently replaced by the current ones.
#[utoipa::path(
    put,
    path = "/settings",
    request_body = SettingsRequest,
    responses((status = 200, description = "Durations as saved", body = SettingsResponse))
)]
pub async fn put_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SettingsRequest>,
) -> Json<SettingsResponse> {
    let update = SettingsUpdate::from(req);
    Json(controls::save_settings(&app_state, &update).await.into())
}

//=========================================================================================
// Garden Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/garden",
    params(GardenQuery),
    responses(
        (status = 200, description = "Every completed flower", body = GardenResponse),
        (status = 400, description = "Unknown order")
    )
)]
pub async fn list_garden_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<GardenQuery>,
) -> Result<Json<GardenResponse>, (StatusCode, String)> {
    let order = parse_order(query.order.as_deref())?;
    let flowers: Vec<FlowerResponse> = app_state
        .store
        .garden_sorted(order)
        .await
        .into_iter()
        .map(FlowerResponse::from)
        .collect();
    Ok(Json(GardenResponse {
        count: flowers.len(),
        flowers,
    }))
}

/// Remove every flower. Statistics are kept.
#[utoipa::path(
    delete,
    path = "/garden",
    responses((status = 200, description = "Garden cleared", body = ClearGardenResponse))
)]
pub async fn clear_garden_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<ClearGardenResponse> {
    let removed = app_state.store.clear_garden().await;
    info!("Garden cleared: {} flowers removed", removed);
    Json(ClearGardenResponse { removed })
}

#[utoipa::path(
    delete,
    path = "/garden/{id}",
    params(("id" = String, Path, description = "Flower id")),
    responses(
        (status = 204, description = "Flower removed"),
        (status = 404, description = "No flower with that id")
    )
)]
pub async fn delete_flower_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if app_state.store.delete_flower(&id).await {
        info!("Flower {} removed from the garden", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// A garden card: the flower in full bloom.
#[utoipa::path(
    get,
    path = "/garden/{id}/svg",
    params(("id" = String, Path, description = "Flower id")),
    responses(
        (status = 200, description = "SVG image", content_type = "image/svg+xml", body = String),
        (status = 404, description = "No flower with that id")
    )
)]
pub async fn flower_svg_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.store.find_flower(&id).await {
        Some(flower) => Ok(svg_response(render_card(&flower))),
        None => Err((StatusCode::NOT_FOUND, format!("Flower {} not found", id))),
    }
}

/// Draw any species at any progress.
#[utoipa::path(
    get,
    path = "/flower/svg",
    params(PreviewQuery),
    responses((status = 200, description = "SVG image", content_type = "image/svg+xml", body = String))
)]
pub async fn preview_svg_handler(Query(query): Query<PreviewQuery>) -> impl IntoResponse {
    let species = match query.species.as_deref() {
        Some(id) => Species::parse_or_default(id),
        None => Species::Rose,
    };
    let progress = query.progress.unwrap_or(100.0);
    if !(0.0..=100.0).contains(&progress) {
        warn!("Preview progress {} outside 0..=100; clamping", progress);
    }
    svg_response(render_svg(species, GrowthStage::from_progress(progress)))
}
