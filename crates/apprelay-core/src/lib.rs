//! # apprelay-core - Core Domain Types
//!
//! Foundation crate for apprelay. Provides the clock translator, log
//! cursors, build identifiers, the project event model, error handling,
//! and the logging bootstrap.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Clock Translation (`clock`)
//! - [`ClockTranslator`] - converts between wall-clock UTC, device-local,
//!   and build-service time domains; produces next-poll cursors
//!
//! ### Cursors (`cursor`)
//! - [`LogCursor`], [`LogChunk`], [`CursorDomain`] - incremental,
//!   monotone progress markers for log retrieval
//!
//! ### Builds (`build`)
//! - [`BuildHandle`] - opaque `<project>:<run_id>` correlation id
//! - [`BuildState`] - `Requested -> Running -> {Succeeded, Failed}`
//!
//! ### Events (`event`)
//! - [`ProjectEvent`] - boundary-validated event with an open
//!   [`EventAction`] tag and opaque payload
//!
//! ### Error Handling (`error`)
//! - [`Error`] - taxonomy: expected `NotFound`/`AlreadyExists`, surfaced
//!   `ServiceUnavailable`, isolated `InstallFailure`
//! - [`Result`] - type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use apprelay_core::prelude::*;
//! ```

pub mod build;
pub mod clock;
pub mod cursor;
pub mod error;
pub mod event;
pub mod logging;

/// Prelude for common imports used throughout all apprelay crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use build::{BuildHandle, BuildRequest, BuildState};
pub use clock::{ClockTranslator, DEFAULT_DEVICE_LEAD_MS};
pub use cursor::{CursorDomain, LogChunk, LogCursor};
pub use error::{Error, InstallStep, Result, ResultExt};
pub use event::{EventAction, ProjectEvent};
