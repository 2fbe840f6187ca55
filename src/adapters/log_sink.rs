//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (ESP-IDF logger on the device, whatever the host
//! binary installs elsewhere).  A backend-reporting adapter would
//! implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => info!("START | state={}", state),
            AppEvent::StateChanged { from, to } => info!("STATE | {} -> {}", from, to),
            AppEvent::CheckStarted(service) => info!("CHECK | {}", service),
            AppEvent::PushModeFailed => warn!("PUSH  | session not established, retrying"),
            AppEvent::KeepAlive => info!("PUSH  | keep-alive"),
            AppEvent::SoundFetched => info!("SOUND | fetched"),
            AppEvent::SoundFetchFailed => warn!("SOUND | fetch failed"),
        }
    }
}
