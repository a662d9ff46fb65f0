//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use chrono::Local;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::FeatureId;
use crate::metadata::MetadataError;
use crate::watch::WatchState;

use super::dto::*;
use super::state::AppState;

/// Latitude limit of the Mercator projection, in degrees.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stops", get(search_stops))
        .route("/stops/:id/schedule", get(stop_schedule))
        .route("/watch", get(current_watch).post(start_watch).delete(stop_watch))
        .route("/notifications", get(notifications))
        .route("/cache", delete(clear_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Bus stops near a point.
async fn search_stops(
    State(state): State<AppState>,
    Query(req): Query<StopSearchRequest>,
) -> Result<Json<StopSearchResponse>, AppError> {
    if !(req.lat.is_finite() && req.lat.abs() <= MAX_LATITUDE) {
        return Err(AppError::BadRequest {
            message: format!("Invalid latitude: {}", req.lat),
        });
    }
    if !(req.lng.is_finite() && req.lng.abs() <= 180.0) {
        return Err(AppError::BadRequest {
            message: format!("Invalid longitude: {}", req.lng),
        });
    }
    let radius = req.radius.unwrap_or(state.config().radius_m);
    if !(radius.is_finite() && radius > 0.0) {
        return Err(AppError::BadRequest {
            message: format!("Invalid radius: {radius}"),
        });
    }
    let max_radius = state.config().max_radius_m;
    if radius > max_radius {
        return Err(AppError::BadRequest {
            message: format!("Radius {radius} exceeds maximum {max_radius}"),
        });
    }

    let zoom = state.config().zoom;
    let stops = state
        .proximity
        .find_nearby_stops(req.lat, req.lng, radius, zoom)
        .await?;

    Ok(Json(StopSearchResponse {
        stops: stops.iter().map(StopResult::from).collect(),
    }))
}

/// Lines and departures at a stop.
async fn stop_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let schedule = state.proximity.stop_schedule(&parse_stop_id(&id)?).await?;
    Ok(Json(ScheduleResponse::from(schedule.as_ref())))
}

/// Start watching one line of a stop, replacing the current one.
async fn start_watch(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Result<Json<WatchResponse>, AppError> {
    let stop_id = parse_stop_id(&req.stop_id)?;
    let schedule = state.proximity.stop_schedule(&stop_id).await?;

    let line = schedule
        .lines
        .get(req.line)
        .ok_or_else(|| AppError::NotFound {
            message: format!(
                "Stop {} has no line {} ({} lines)",
                stop_id,
                req.line,
                schedule.lines.len()
            ),
        })?;

    let watch = WatchState::new(req.stop_name, line, Local::now().date_naive());
    let response = WatchResponse::from(&watch);
    state.watcher.select(watch);

    Ok(Json(response))
}

/// The line currently watched.
async fn current_watch(State(state): State<AppState>) -> Result<Json<WatchResponse>, AppError> {
    let watch = state.watcher.current().ok_or_else(|| AppError::NotFound {
        message: "Not watching any line".to_string(),
    })?;
    Ok(Json(WatchResponse::from(watch.as_ref())))
}

/// Stop watching.
async fn stop_watch(State(state): State<AppState>) -> StatusCode {
    state.watcher.clear();
    StatusCode::NO_CONTENT
}

/// Most recent notifications, newest first.
async fn notifications(State(state): State<AppState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        notifications: state.notifications.snapshot(),
    })
}

/// Drop cached searches and schedules.
async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.proximity.invalidate_cache();
    info!("cache cleared");
    StatusCode::NO_CONTENT
}

fn parse_stop_id(id: &str) -> Result<FeatureId, AppError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest {
            message: "Empty stop id".to_string(),
        });
    }
    Ok(FeatureId::new(id))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    BadGateway { message: String },
    Internal { message: String },
}

impl From<MetadataError> for AppError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::NotFound(_) => AppError::NotFound {
                message: e.to_string(),
            },
            MetadataError::BlockTooLarge { .. } => AppError::BadRequest {
                message: e.to_string(),
            },
            MetadataError::Http(_)
            | MetadataError::Api { .. }
            | MetadataError::Malformed(_)
            | MetadataError::Decode { .. } => AppError::BadGateway {
                message: e.to_string(),
            },
            MetadataError::Config(_) | MetadataError::Shutdown => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        warn!(%status, %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
