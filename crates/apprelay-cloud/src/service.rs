//! Narrow client for the remote build service and its log storage.
//!
//! The service owns project definitions, build runs, and run logs; this
//! client only covers the four calls the orchestration layer needs. Every
//! call is a fresh round-trip; nothing is cached locally.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use apprelay_core::prelude::*;

/// Default timeout for remote service calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE_NAME: &str = "build-service";

/// One structured log event from the remote log storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp: i64,
    pub message: String,
}

/// Remote build service operations consumed by the orchestration core.
///
/// `create_project` reports an idempotent-creation collision as
/// [`Error::AlreadyExists`]; callers treat that as already-initialized.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BuildService: Send + Sync {
    /// Register a build project pointing at a source repository
    async fn create_project(
        &self,
        name: &str,
        source_repo_url: &str,
        buildspec: &str,
    ) -> Result<()>;

    /// Start a run for an existing project, returning the remote run id
    async fn start_run(&self, project: &str) -> Result<String>;

    /// Current status string for one run, as the remote service reports it
    async fn run_status(&self, project: &str, run_id: &str) -> Result<String>;

    /// Log events since `since_millis` for one log stream
    async fn log_events(
        &self,
        log_group: &str,
        log_stream: &str,
        since_millis: i64,
    ) -> Result<Vec<LogEvent>>;
}

// ─────────────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectRequest<'a> {
    name: &'a str,
    source_repo_url: &'a str,
    buildspec: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRunResponse {
    run_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunStatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEventsResponse {
    events: Vec<LogEvent>,
}

/// REST-backed [`BuildService`] client
pub struct HttpBuildService {
    client: Client,
    base_url: Url,
}

impl HttpBuildService {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config(format!("invalid endpoint {path}: {e}")))
    }
}

#[async_trait]
impl BuildService for HttpBuildService {
    async fn create_project(
        &self,
        name: &str,
        source_repo_url: &str,
        buildspec: &str,
    ) -> Result<()> {
        let url = self.endpoint("projects")?;
        let response = self
            .client
            .post(url)
            .json(&CreateProjectRequest {
                name,
                source_repo_url,
                buildspec,
            })
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            s if s.is_success() => Ok(()),
            s => Err(status_error(&format!("project {name}"), s)),
        }
    }

    async fn start_run(&self, project: &str) -> Result<String> {
        let url = self.endpoint(&format!("projects/{project}/runs"))?;
        let response = self.client.post(url).send().await.map_err(transport_error)?;

        match response.status() {
            s if s.is_success() => {
                let body: StartRunResponse = response.json().await.map_err(decode_error)?;
                Ok(body.run_id)
            }
            s => Err(status_error(&format!("project {project}"), s)),
        }
    }

    async fn run_status(&self, project: &str, run_id: &str) -> Result<String> {
        let url = self.endpoint(&format!("projects/{project}/runs/{run_id}"))?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;

        match response.status() {
            s if s.is_success() => {
                let body: RunStatusResponse = response.json().await.map_err(decode_error)?;
                Ok(body.status)
            }
            s => Err(status_error(&format!("run {project}:{run_id}"), s)),
        }
    }

    async fn log_events(
        &self,
        log_group: &str,
        log_stream: &str,
        since_millis: i64,
    ) -> Result<Vec<LogEvent>> {
        // Log groups contain slashes, so they travel as query parameters
        let mut url = self.endpoint("logs")?;
        url.query_pairs_mut()
            .append_pair("group", log_group)
            .append_pair("stream", log_stream)
            .append_pair("since", &since_millis.to_string());

        let response = self.client.get(url).send().await.map_err(transport_error)?;

        match response.status() {
            s if s.is_success() => {
                let body: LogEventsResponse = response.json().await.map_err(decode_error)?;
                Ok(body.events)
            }
            s => Err(status_error(&format!("log stream {log_stream}"), s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    // A trailing slash keeps Url::join from swallowing the last path segment
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&normalized).map_err(|e| Error::config(format!("invalid base URL {base_url}: {e}")))
}

pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    if err.is_connect() || err.is_timeout() {
        Error::service_unavailable(SERVICE_NAME, err.to_string())
    } else {
        Error::protocol(err.to_string())
    }
}

pub(crate) fn decode_error(err: reqwest::Error) -> Error {
    Error::protocol(format!("malformed response: {err}"))
}

pub(crate) fn status_error(what: &str, status: StatusCode) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::not_found(what),
        StatusCode::CONFLICT => Error::already_exists(what),
        s if s.is_server_error() => {
            Error::service_unavailable(SERVICE_NAME, format!("{what}: HTTP {s}"))
        }
        s => Error::protocol(format!("{what}: HTTP {s}")),
    }
}
