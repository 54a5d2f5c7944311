//! HTTP endpoints
//!
//! | Method | Path              | Response                                   |
//! |--------|-------------------|--------------------------------------------|
//! | GET    | `/cameras`        | `[{model, port}]`                          |
//! | GET    | `/current-camera` | `{model, port}` or 404                     |
//! | POST   | `/select-camera`  | `{success, message, model}` or 404         |
//! | GET    | `/is-dslr-active` | `{active}`                                 |
//! | GET    | `/capture`        | `image/jpeg` body                          |
//! | GET    | `/stats`          | server counters                            |
//! | GET    | `/live-view`      | WebSocket upgrade (see [`super::ws`])      |

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::state::AppState;
use super::ws::live_view_ws;
use crate::device::{CameraError, Device};
use crate::driver::CameraDriver;
use crate::stats::{ServerStats, SessionStats};

/// Build the router for `state`
pub fn router<D: CameraDriver>(state: AppState<D>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/cameras", get(list_cameras::<D>))
        .route("/current-camera", get(current_camera::<D>))
        .route("/select-camera", post(select_camera::<D>))
        .route("/is-dslr-active", get(is_active::<D>))
        .route("/capture", get(capture::<D>))
        .route("/stats", get(stats::<D>))
        .route("/live-view", get(live_view_ws::<D>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Camera error carried to an HTTP response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: CameraError,
}

impl ApiError {
    /// Override the status derived from the error kind
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl From<CameraError> for ApiError {
    fn from(error: CameraError) -> Self {
        let status = match &error {
            CameraError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            CameraError::DeviceBusy => StatusCode::SERVICE_UNAVAILABLE,
            CameraError::NoActiveDevice
            | CameraError::CaptureFailed(_)
            | CameraError::DeviceVanished(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

async fn list_cameras<D: CameraDriver>(State(state): State<AppState<D>>) -> Json<Vec<Device>> {
    Json(state.devices.list_devices().await)
}

async fn current_camera<D: CameraDriver>(
    State(state): State<AppState<D>>,
) -> Result<Json<Device>, ApiError> {
    state
        .devices
        .active()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::from(CameraError::NoActiveDevice).with_status(StatusCode::NOT_FOUND))
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    port: String,
}

#[derive(Debug, Serialize)]
struct SelectResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

async fn select_camera<D: CameraDriver>(
    State(state): State<AppState<D>>,
    Json(request): Json<SelectRequest>,
) -> Response {
    match state.devices.select_by_port(&request.port).await {
        Ok(device) => Json(SelectResponse {
            success: true,
            message: "camera selected".to_string(),
            model: Some(device.model),
        })
        .into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(SelectResponse {
                success: false,
                message: e.to_string(),
                model: None,
            }),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ActiveResponse {
    active: bool,
}

async fn is_active<D: CameraDriver>(State(state): State<AppState<D>>) -> Json<ActiveResponse> {
    Json(ActiveResponse {
        active: state.devices.is_active().await,
    })
}

async fn capture<D: CameraDriver>(State(state): State<AppState<D>>) -> Result<Response, ApiError> {
    let image = state.gateway.capture_still().await?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.data).into_response())
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    conn_id: u64,
    #[serde(flatten)]
    stats: SessionStats,
    frame_rate: f64,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    server: ServerStats,
    active_device: Option<Device>,
    manual_selection: bool,
    sessions: Vec<SessionSummary>,
}

async fn stats<D: CameraDriver>(State(state): State<AppState<D>>) -> Json<StatsResponse> {
    let sessions = state
        .sessions
        .streaming_stats()
        .await
        .into_iter()
        .map(|(conn, stats)| SessionSummary {
            conn_id: conn.as_u64(),
            frame_rate: stats.frame_rate(),
            stats,
        })
        .collect();

    Json(StatsResponse {
        server: state.stats().await,
        active_device: state.devices.active().await,
        manual_selection: state.devices.is_manual_selection().await,
        sessions,
    })
}
