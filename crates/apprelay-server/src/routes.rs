//! HTTP surface: build trigger, incremental log fetch, event streaming

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::get,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;

use apprelay_core::prelude::*;
use apprelay_core::{BuildState, EventAction, ProjectEvent};
use apprelay_cloud::BuildLogPage;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Assemble the router over shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/projects/{project}/builds", post(trigger_build))
        .route("/builds/{build_id}", get(build_status))
        .route("/builds/{build_id}/logs", get(build_logs))
        .route("/device/logs", get(device_logs))
        .route(
            "/projects/{project}/events",
            get(subscribe_events).post(publish_event),
        )
        .route("/time", get(server_time))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────
// Builds
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerResponse {
    build_id: String,
}

/// Trigger one remote build and announce it on the project channel
async fn trigger_build(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Json<TriggerResponse>> {
    let repo = state.project_repo(&project);
    let handle = state.tracker.start(&project, repo.as_ref()).await?;

    let event = ProjectEvent::synthesized(
        &project,
        EventAction::BuildStarted,
        json!(handle.build_id()),
    );
    state.bridge.publish(&event);

    Ok(Json(TriggerResponse {
        build_id: handle.build_id(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: BuildState,
}

async fn build_status(
    State(state): State<AppState>,
    Path(build_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.tracker.status(&build_id).await?;
    Ok(Json(StatusResponse { status }))
}

#[derive(Debug, Deserialize)]
struct SinceQuery {
    #[serde(default)]
    since: i64,
}

async fn build_logs(
    State(state): State<AppState>,
    Path(build_id): Path<String>,
    Query(query): Query<SinceQuery>,
) -> ApiResult<Json<BuildLogPage>> {
    let page = state.build_logs.fetch(&build_id, query.since).await?;
    Ok(Json(page))
}

// ─────────────────────────────────────────────────────────────────
// Device telemetry
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DeviceLogQuery {
    app: String,
    #[serde(default)]
    since: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceLogResponse {
    last_app_log_timestamp: i64,
    app_log: String,
}

/// Device log lines for an app since a wall-clock cursor. An app that is
/// not running yields an empty page with an advanced cursor, not an error.
async fn device_logs(
    State(state): State<AppState>,
    Query(query): Query<DeviceLogQuery>,
) -> ApiResult<Json<DeviceLogResponse>> {
    let chunk = state.session.logs(&query.app, query.since).await?;
    Ok(Json(DeviceLogResponse {
        last_app_log_timestamp: chunk.next_cursor.epoch_millis,
        app_log: chunk.content,
    }))
}

// ─────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────

/// Long-lived server-push stream of a project's events.
///
/// The handler parks on broker receive for the connection's lifetime;
/// events published while nobody is connected are not replayed.
async fn subscribe_events(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!("Subscriber attached to {project}");
    let stream = state
        .bridge
        .subscribe(&project)
        .map(|frame| Ok(Event::default().data(frame)));
    Sse::new(stream)
}

/// Accept one event from a producer, run the install reaction for
/// completion events, and fan the event out to subscribers.
///
/// The reaction runs first and its failure is only logged: install
/// problems must never suppress delivery of the triggering event.
async fn publish_event(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let event = ProjectEvent::from_body(&project, body).map_err(ApiError)?;

    if event.action == EventAction::BuildFinished {
        if let Err(err) = state.reactor.on_build_finished(&event).await {
            error!("Install reaction failed for {project}: {err}");
        }
    }

    state.bridge.publish(&event);
    Ok(Json(event.body))
}

// ─────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────

/// Server wall clock, for clients correlating cursors with server time
async fn server_time() -> Json<Value> {
    Json(json!({ "time": Utc::now().timestamp_millis() }))
}
