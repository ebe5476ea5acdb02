//! End-to-end tests for the HTTP surface with stubbed collaborators

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tower::ServiceExt;

use apprelay_cloud::{
    BuildLogFetcher, BuildService, BuildTracker, LogEvent, ObjectStore, TrackerConfig,
};
use apprelay_core::error::{Error, Result};
use apprelay_core::ClockTranslator;
use apprelay_device::{DeviceBridge, DeviceSession, InstallReactor};
use apprelay_server::bus::{ChannelBroker, EventBusBridge};
use apprelay_server::{routes, AppState};

// ─────────────────────────────────────────────────────────────────
// Stub collaborators
// ─────────────────────────────────────────────────────────────────

struct StubBuildService;

#[async_trait]
impl BuildService for StubBuildService {
    async fn create_project(&self, name: &str, _repo: &str, _buildspec: &str) -> Result<()> {
        // Project was initialized by an earlier trigger
        Err(Error::already_exists(name))
    }

    async fn start_run(&self, _project: &str) -> Result<String> {
        Ok("run-7".to_string())
    }

    async fn run_status(&self, project: &str, run_id: &str) -> Result<String> {
        if run_id == "run-7" {
            Ok("SUCCEEDED".to_string())
        } else {
            Err(Error::not_found(format!("run {project}:{run_id}")))
        }
    }

    async fn log_events(
        &self,
        _group: &str,
        _stream: &str,
        since_millis: i64,
    ) -> Result<Vec<LogEvent>> {
        Ok(vec![LogEvent {
            timestamp: since_millis + 1,
            message: "run started".to_string(),
        }])
    }
}

/// Counts install attempts; optionally fails every download
struct StubStore {
    attempts: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::not_found(format!("object {bucket}/{key}")))
        } else {
            std::fs::write(dest, b"apk-bytes")?;
            Ok(())
        }
    }
}

/// Device with no processes running; install steps succeed
struct StubBridge;

#[async_trait]
impl DeviceBridge for StubBridge {
    async fn list_processes(&self) -> Result<String> {
        Ok("USER PID PPID NAME\n".to_string())
    }

    async fn tail_log(&self, _since_marker: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn uninstall(&self, _package_id: &str) -> Result<()> {
        Ok(())
    }

    async fn install(&self, _artifact: &Path) -> Result<()> {
        Ok(())
    }

    async fn inspect_package_id(&self, _artifact: &Path) -> Result<String> {
        Ok("com.rexz.testapp".to_string())
    }
}

struct TestHarness {
    state: AppState,
    install_attempts: Arc<AtomicUsize>,
    _staging: tempfile::TempDir,
    _projects: tempfile::TempDir,
}

fn harness(store_fails: bool) -> TestHarness {
    let staging = tempfile::TempDir::new().unwrap();
    let projects = tempfile::TempDir::new().unwrap();
    let install_attempts = Arc::new(AtomicUsize::new(0));

    let clock = ClockTranslator::default();
    let service: Arc<dyn BuildService> = Arc::new(StubBuildService);
    let store: Arc<dyn ObjectStore> = Arc::new(StubStore {
        attempts: install_attempts.clone(),
        fail: store_fails,
    });
    let bridge: Arc<dyn DeviceBridge> = Arc::new(StubBridge);

    let state = AppState {
        tracker: BuildTracker::new(service.clone(), TrackerConfig::default()),
        build_logs: BuildLogFetcher::new(service, "/codebuild/", clock),
        session: DeviceSession::new(bridge.clone(), clock),
        reactor: InstallReactor::new(store, bridge, "artifacts", staging.path()),
        bridge: EventBusBridge::new(Arc::new(ChannelBroker::new())),
        projects_dir: projects.path().to_path_buf(),
    };

    TestHarness {
        state,
        install_attempts,
        _staging: staging,
        _projects: projects,
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ─────────────────────────────────────────────────────────────────
// Builds
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trigger_build_returns_composed_build_id() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app
        .oneshot(post_json("/projects/demo/builds", &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["buildId"], "demo:run-7");
}

#[tokio::test]
async fn trigger_build_announces_on_project_channel() {
    let h = harness(false);
    let mut events = Box::pin(h.state.bridge.subscribe("demo"));
    let app = routes::router(h.state);

    app.oneshot(post_json("/projects/demo/builds", &json!({})))
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_millis(200), events.next())
        .await
        .expect("event expected")
        .unwrap();
    let event: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(event["action"], "build-started");
    assert_eq!(event["data"], "demo:run-7");
}

#[tokio::test]
async fn build_status_maps_remote_vocabulary() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app.oneshot(get("/builds/demo:run-7")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "SUCCEEDED");
}

#[tokio::test]
async fn build_status_unknown_run_is_404() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app.oneshot(get("/builds/demo:ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn build_logs_since_zero_returns_run_start() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app
        .oneshot(get("/builds/demo:run-7/logs?since=0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["events"][0]["message"], "run started");
    assert!(body["nextSince"].as_i64().unwrap() > 0);
}

// ─────────────────────────────────────────────────────────────────
// Device telemetry
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn device_logs_for_stopped_app_is_empty_not_an_error() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app
        .oneshot(get("/device/logs?app=com.example.app&since=0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["appLog"], "");
    assert!(body["lastAppLogTimestamp"].as_i64().unwrap() > 0);
}

// ─────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn publish_echoes_body_and_reaches_subscriber() {
    let h = harness(false);
    let mut events = Box::pin(h.state.bridge.subscribe("demo"));
    let app = routes::router(h.state);

    let body = json!({"action": "log-appended", "project": "demo", "data": "a line"});
    let response = app
        .oneshot(post_json("/projects/demo/events", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, body);

    let frame = tokio::time::timeout(Duration::from_millis(200), events.next())
        .await
        .expect("event expected")
        .unwrap();
    assert_eq!(serde_json::from_str::<Value>(&frame).unwrap(), body);
}

#[tokio::test]
async fn build_finished_triggers_exactly_one_install_attempt() {
    let h = harness(false);
    let attempts = h.install_attempts.clone();
    let app = routes::router(h.state);

    let body = json!({"action": "build-finished", "project": "demo", "data": "demo/app-debug.apk"});
    let response = app
        .oneshot(post_json("/projects/demo/events", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn install_failure_does_not_suppress_delivery() {
    let h = harness(true);
    let attempts = h.install_attempts.clone();
    let mut events = Box::pin(h.state.bridge.subscribe("demo"));
    let app = routes::router(h.state);

    let body = json!({"action": "build-finished", "project": "demo", "data": "demo/app-debug.apk"});
    let response = app
        .oneshot(post_json("/projects/demo/events", &body))
        .await
        .unwrap();

    // The event is echoed and fanned out even though the fetch failed
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let frame = tokio::time::timeout(Duration::from_millis(200), events.next())
        .await
        .expect("event expected")
        .unwrap();
    let event: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(event["action"], "build-finished");
}

#[tokio::test]
async fn other_actions_do_not_touch_the_device() {
    let h = harness(false);
    let attempts = h.install_attempts.clone();
    let app = routes::router(h.state);

    let body = json!({"action": "build-started", "project": "demo", "data": "demo:run-7"});
    app.oneshot(post_json("/projects/demo/events", &body))
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn publish_rejects_bodies_without_action() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app
        .oneshot(post_json("/projects/demo/events", &json!({"project": "demo"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn time_returns_epoch_millis() {
    let h = harness(false);
    let app = routes::router(h.state);

    let response = app.oneshot(get("/time")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["time"].as_i64().unwrap() > 1_500_000_000_000);
}
