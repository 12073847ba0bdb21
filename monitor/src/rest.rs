use crate::logger::MonitorHandle;
use crate::model::{
    AlarmThresholds, Event, PlotData, Reading, StatusSnapshot, StoredMeasurement,
};
use crate::store::SqliteStore;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

#[derive(Clone)]
struct AppState {
    monitor: MonitorHandle,
    store: SqliteStore,
    events: broadcast::Sender<Event>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PlotQuery {
    points: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingRequest {
    enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct MeasurementsResponse {
    pub data: Vec<StoredMeasurement>,
    pub total: usize,
    pub limit: u32,
}

pub fn create_router(
    monitor: MonitorHandle,
    store: SqliteStore,
    events: broadcast::Sender<Event>,
) -> Router {
    let state = AppState {
        monitor,
        store,
        events,
    };

    Router::new()
        .route("/api/v1/reading/current", get(get_current_reading))
        .route("/api/v1/measurements", get(get_measurements))
        .route("/api/v1/plot", get(get_plot))
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/logging", post(set_logging))
        .route("/api/v1/thresholds", post(set_thresholds))
        .route("/api/v1/unit", post(toggle_unit))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

async fn get_current_reading(State(state): State<AppState>) -> Result<Json<Reading>, AppError> {
    Ok(Json(state.monitor.read_now().await?))
}

async fn get_measurements(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<MeasurementsResponse>, AppError> {
    let limit = params.limit.unwrap_or(10).min(1000);
    let data = state.store.get_last(limit).await?;

    Ok(Json(MeasurementsResponse {
        total: data.len(),
        data,
        limit,
    }))
}

async fn get_plot(
    State(state): State<AppState>,
    Query(params): Query<PlotQuery>,
) -> Result<Json<PlotData>, AppError> {
    let points = params.points.unwrap_or(10).min(1000);
    let rows = state.store.get_last(points).await?;

    Ok(Json(PlotData::from_measurements(&rows)))
}

async fn get_status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, AppError> {
    Ok(Json(state.monitor.snapshot().await?))
}

async fn set_logging(
    State(state): State<AppState>,
    Json(request): Json<LoggingRequest>,
) -> Result<StatusCode, AppError> {
    if request.enabled {
        state.monitor.enable_logging().await?;
    } else {
        state.monitor.disable_logging().await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn set_thresholds(
    State(state): State<AppState>,
    Json(thresholds): Json<AlarmThresholds>,
) -> Result<StatusCode, AppError> {
    state.monitor.set_thresholds(thresholds).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_unit(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let unit = state.monitor.toggle_unit().await?;
    Ok(Json(serde_json::json!({ "unit": unit })))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

/// Serves one websocket client: answers "CR" (current reading) and "PD"
/// (plot data) text requests and forwards every monitor event.
async fn client_session(mut socket: WebSocket, state: AppState) {
    info!("New websocket connection");
    let mut events = state.events.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(request) = message else { continue };

                match serve_request(&state, request.as_str()).await {
                    Ok(Some(reply)) => {
                        if socket.send(Message::Text(reply)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => debug!("Unsupported websocket request: {}", request),
                    Err(e) => {
                        error!("Websocket request failed: {}", e);
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(payload) = serde_json::to_string(&event) else { continue };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Websocket client lagged, {} events dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Websocket connection closed");
}

async fn serve_request(state: &AppState, request: &str) -> anyhow::Result<Option<String>> {
    let reply = match request {
        "CR" => Some(serde_json::to_string(&state.monitor.read_now().await?)?),
        "PD" => {
            let rows = state.store.get_last(10).await?;
            Some(serde_json::to_string(&PlotData::from_measurements(&rows))?)
        }
        _ => None,
    };

    Ok(reply)
}

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {}", self.0),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
