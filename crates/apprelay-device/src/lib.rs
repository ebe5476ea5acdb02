//! # apprelay-device - Device Bridge and Telemetry
//!
//! Everything that touches the attached device: the `adb`/`aapt` command
//! bridge, process resolution, incremental device-log fetching, and the
//! install reaction for finished builds.
//!
//! - [`DeviceBridge`] / [`AdbBridge`] - capability trait over the platform
//!   debug tools; one shared resource per host, no device-level locking
//! - [`DeviceSession`] - pid resolution (never cached) and log tailing
//!   against a wall-clock cursor
//! - [`InstallReactor`] - fetch -> inspect -> uninstall -> install ->
//!   cleanup chain for completion events

pub mod bridge;
pub mod install;
pub mod session;

pub use bridge::{AdbBridge, DeviceBridge};
pub use install::InstallReactor;
pub use session::{DeviceProcess, DeviceSession, NOT_FOUND_PID};
