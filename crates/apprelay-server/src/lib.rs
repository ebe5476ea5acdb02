//! # apprelay-server - HTTP Surface and Event Fan-out
//!
//! The transport layer over the orchestration components: an axum router
//! exposing build trigger, incremental log fetch, and an SSE event stream,
//! plus the event bus bridge and the settings loader.
//!
//! - [`bus::EventBusBridge`] / [`bus::ChannelBroker`] - publish/subscribe
//!   fan-out over an injected channel-based broker
//! - [`routes::router`] - the HTTP surface
//! - [`config::Settings`] - TOML settings with env-style defaults
//! - [`serve`] - bind and run until the process ends

pub mod bus;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use apprelay_core::prelude::*;

pub use bus::{Broker, ChannelBroker, EventBusBridge};
pub use config::Settings;
pub use state::AppState;

/// Bind the configured listener and serve requests until the process ends
pub async fn serve(settings: Settings) -> Result<()> {
    let state = AppState::from_settings(&settings)?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.listen).await?;
    info!("apprelay serving at http://{}", settings.server.listen);
    axum::serve(listener, app).await?;
    Ok(())
}
