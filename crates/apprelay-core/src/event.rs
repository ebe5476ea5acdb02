//! Project event model for the publish/subscribe bridge

use serde_json::Value;

use crate::error::{Error, Result};

/// Tagged event action, open for forward compatibility.
///
/// Producers are free to invent new action strings; only the ones this
/// service reacts to get their own variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    BuildStarted,
    BuildFinished,
    LogAppended,
    Other(String),
}

impl EventAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "build-started" => EventAction::BuildStarted,
            "build-finished" => EventAction::BuildFinished,
            "log-appended" => EventAction::LogAppended,
            other => EventAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventAction::BuildStarted => "build-started",
            EventAction::BuildFinished => "build-finished",
            EventAction::LogAppended => "log-appended",
            EventAction::Other(s) => s,
        }
    }
}

/// One event on a project channel.
///
/// The full producer-supplied body is retained and forwarded verbatim;
/// `action` is the validated tag pulled out of it. Lifetime is a single
/// delivery pass; nothing is retained after publish.
#[derive(Debug, Clone)]
pub struct ProjectEvent {
    pub project: String,
    pub action: EventAction,
    pub body: Value,
}

impl ProjectEvent {
    /// Validate a producer-supplied body at the boundary.
    ///
    /// The body must be a JSON object carrying a string `action` field;
    /// everything else in it is opaque payload.
    pub fn from_body(project: impl Into<String>, body: Value) -> Result<Self> {
        let action = body
            .as_object()
            .ok_or_else(|| Error::invalid_event("event body must be a JSON object"))?
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_event("event body missing string 'action' field"))?;

        Ok(Self {
            project: project.into(),
            action: EventAction::parse(action),
            body,
        })
    }

    /// Build an event from this service's own producer paths
    pub fn synthesized(project: impl Into<String>, action: EventAction, data: Value) -> Self {
        let project = project.into();
        let body = serde_json::json!({
            "action": action.as_str(),
            "project": project,
            "data": data,
        });
        Self {
            project,
            action,
            body,
        }
    }

    /// Object-store reference carried by completion events
    pub fn artifact_ref(&self) -> Option<&str> {
        self.body.get("data").and_then(Value::as_str)
    }

    /// Serialized frame handed to the broker
    pub fn to_wire(&self) -> String {
        self.body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_parse_round_trip() {
        for tag in ["build-started", "build-finished", "log-appended"] {
            assert_eq!(EventAction::parse(tag).as_str(), tag);
        }
        let custom = EventAction::parse("emulator-attached");
        assert_eq!(custom, EventAction::Other("emulator-attached".to_string()));
        assert_eq!(custom.as_str(), "emulator-attached");
    }

    #[test]
    fn test_from_body_extracts_action() {
        let body = json!({"action": "build-finished", "project": "demo", "data": "demo/app-debug.apk"});
        let event = ProjectEvent::from_body("demo", body).unwrap();
        assert_eq!(event.action, EventAction::BuildFinished);
        assert_eq!(event.artifact_ref(), Some("demo/app-debug.apk"));
    }

    #[test]
    fn test_from_body_rejects_non_object() {
        let err = ProjectEvent::from_body("demo", json!(42)).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));

        let err = ProjectEvent::from_body("demo", json!("hello")).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));
    }

    #[test]
    fn test_from_body_requires_action_string() {
        let err = ProjectEvent::from_body("demo", json!({"project": "demo"})).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));

        let err = ProjectEvent::from_body("demo", json!({"action": 7})).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));
    }

    #[test]
    fn test_wire_frame_preserves_body() {
        let body = json!({"action": "log-appended", "extra": {"nested": true}});
        let event = ProjectEvent::from_body("demo", body.clone()).unwrap();
        let round: Value = serde_json::from_str(&event.to_wire()).unwrap();
        assert_eq!(round, body);
    }

    #[test]
    fn test_synthesized_event_is_valid_at_the_boundary() {
        let event = ProjectEvent::synthesized("demo", EventAction::BuildStarted, json!("demo:run-1"));
        let reparsed = ProjectEvent::from_body("demo", event.body.clone()).unwrap();
        assert_eq!(reparsed.action, EventAction::BuildStarted);
        assert_eq!(reparsed.artifact_ref(), Some("demo:run-1"));
    }
}
