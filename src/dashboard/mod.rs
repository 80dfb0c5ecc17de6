use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::error::ScanError;
use crate::store::models::{HistoryEntry, Origin};
use crate::tracker::Tracker;

/// Shared dashboard state. The mutex makes every scan the only writer of
/// the vault while it runs.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<Tracker>>,
    pub sport_key: String,
}

/// Build the Axum router for the dashboard API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/events", get(events_handler))
        .route("/api/scan", post(scan_handler))
        .route("/api/snapshots", get(snapshots_handler))
        .route("/api/snapshots/:matchup", get(snapshot_handler))
        .route("/api/history", get(history_handler).delete(clear_history_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub matchup: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub matchup: Option<String>,
}

/// GET /api/events. Fetches both feeds; failures show up in `notices`
async fn events_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    let catalogue = tracker.refresh(&state.sport_key).await.clone();
    Json(catalogue)
}

/// Error body for a scan that found no event.
#[derive(Debug, Serialize)]
pub struct ScanFailure {
    pub error: String,
    pub notices: Vec<String>,
}

impl From<ScanError> for ScanFailure {
    fn from(err: ScanError) -> Self {
        let error = err.to_string();
        match err {
            ScanError::UnknownMatchup { notices, .. } => ScanFailure { error, notices },
        }
    }
}

/// POST /api/scan. Feed failures travel in `notices`, also on a 404.
async fn scan_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ScanFailure>)> {
    let origin = req.completed.then_some(Origin::Completed);
    let mut tracker = state.tracker.lock().await;
    let outcome = tracker.scan(&state.sport_key, &req.matchup, origin).await;
    outcome
        .map(Json)
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ScanFailure::from(e))))
}

/// GET /api/snapshots
async fn snapshots_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    Json(tracker.snapshots().clone())
}

/// GET /api/snapshots/:matchup
async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    Path(matchup): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let tracker = state.tracker.lock().await;
    tracker
        .snapshot(&matchup)
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no snapshot for '{}'", matchup)))
}

/// GET /api/history?matchup=...
async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    let history = tracker.history();
    let entries: Vec<HistoryEntry> = match q.matchup.as_deref() {
        Some(m) => history.for_matchup(m).cloned().collect(),
        None => history.entries().to_vec(),
    };
    Json(entries)
}

/// DELETE /api/history
async fn clear_history_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.tracker.lock().await.clear_history();
    StatusCode::NO_CONTENT
}
