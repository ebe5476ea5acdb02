//! Application error types with rich context

use std::fmt;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Which step of the install reaction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Fetch,
    Inspect,
    Uninstall,
    Install,
    Cleanup,
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStep::Fetch => "fetch",
            InstallStep::Inspect => "inspect",
            InstallStep::Uninstall => "uninstall",
            InstallStep::Install => "install",
            InstallStep::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Expected, non-fatal outcomes
    // ─────────────────────────────────────────────────────────────
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Already exists: {name}")]
    AlreadyExists { name: String },

    // ─────────────────────────────────────────────────────────────
    // Remote Service Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Service unavailable: {service}: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("Remote protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Device Bridge Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Required tool not found: {tool}. Ensure it is in your PATH.")]
    ToolMissing { tool: String },

    #[error("Device bridge error: {message}")]
    Bridge { message: String },

    #[error("Install step '{step}' failed: {reason}")]
    InstallFailure { step: InstallStep, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Version Control Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Version control error: {message}")]
    Vcs { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid event payload: {message}")]
    InvalidEvent { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    pub fn service_unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn tool_missing(tool: impl Into<String>) -> Self {
        Self::ToolMissing { tool: tool.into() }
    }

    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge {
            message: message.into(),
        }
    }

    pub fn install(step: InstallStep, reason: impl Into<String>) -> Self {
        Self::InstallFailure {
            step,
            reason: reason.into(),
        }
    }

    pub fn vcs(message: impl Into<String>) -> Self {
        Self::Vcs {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Expected steady-state outcome, not a failure of the system itself
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Idempotent-creation collision, swallowed by callers
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
