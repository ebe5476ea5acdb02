//! Event bus bridge over a channel-based broker.
//!
//! The broker is an explicit injected interface, not ambient global state.
//! Delivery is fire-and-forget: no buffering, no replay, events published
//! with zero subscribers are dropped by design. Per-channel publish order
//! is preserved; a lagged subscriber skips missed frames instead of
//! blocking the publisher or its peers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use apprelay_core::prelude::*;
use apprelay_core::ProjectEvent;

/// Frames a slow subscriber can fall behind before skipping
const CHANNEL_CAPACITY: usize = 256;

/// Message-passing interface between event producers and streaming
/// subscribers
pub trait Broker: Send + Sync {
    /// Push one frame onto a named channel; dropped if nobody listens
    fn publish(&self, channel: &str, frame: &str);

    /// Attach a receiver to a named channel, observing every frame
    /// published after this call
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<String>;
}

/// In-process [`Broker`] over per-channel broadcast senders.
///
/// Channels are created on first use and kept for the process lifetime, so
/// a subscriber stream never ends because its channel went idle.
#[derive(Default)]
pub struct ChannelBroker {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl ChannelBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        if let Some(tx) = self.channels.read().expect("broker lock poisoned").get(channel) {
            return tx.clone();
        }
        let mut channels = self.channels.write().expect("broker lock poisoned");
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Broker for ChannelBroker {
    fn publish(&self, channel: &str, frame: &str) {
        let tx = self.sender(channel);
        match tx.send(frame.to_string()) {
            Ok(receivers) => debug!("Published to {channel}: {receivers} receiver(s)"),
            // No receivers attached: the event is lost, by design
            Err(_) => debug!("Published to {channel}: no receivers, dropped"),
        }
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.sender(channel).subscribe()
    }
}

/// Fans project events out to streaming subscribers through the injected
/// broker
#[derive(Clone)]
pub struct EventBusBridge {
    broker: Arc<dyn Broker>,
}

impl EventBusBridge {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Publish one event on its project channel
    pub fn publish(&self, event: &ProjectEvent) {
        self.broker.publish(&event.project, &event.to_wire());
    }

    /// Open a subscription stream for a project.
    ///
    /// Only JSON object frames are forwarded; bare integers and other
    /// non-object frames are transport-internal control values and never
    /// reach subscribers.
    pub fn subscribe(&self, project: &str) -> impl Stream<Item = String> + Send + 'static {
        let rx = self.broker.subscribe(project);
        BroadcastStream::new(rx).filter_map(|frame| match frame {
            Ok(frame) if is_forwardable(&frame) => Some(frame),
            Ok(frame) => {
                debug!("Dropping non-object frame: {frame}");
                None
            }
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("Subscriber lagged, skipped {missed} frame(s)");
                None
            }
        })
    }
}

/// A frame subscribers may see: a JSON object, nothing else
fn is_forwardable(frame: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(frame)
        .map(|v| v.is_object())
        .unwrap_or(false)
}
