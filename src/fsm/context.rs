//! Shared mutable context threaded through every FSM handler.
//!
//! `EngineContext` is the single struct that state handlers read from and
//! write to: the current time, the six service deadlines, configuration,
//! the outcome of the last sound fetch, and the events produced during the
//! current dispatch.  It is owned exclusively by the engine; collaborators
//! never see it.

use log::warn;

use crate::app::events::AppEvent;
use crate::config::SystemConfig;
use crate::timer::{Deadlines, Service};

/// Events one dispatch can produce before the engine drains them.
const PENDING_EVENTS_CAP: usize = 8;

/// The shared context passed to every state handler function.
pub struct EngineContext {
    // -- Timing --
    /// Clock reading taken at the start of the current dispatch.
    pub now_ms: u32,
    /// When each service is next due.
    pub deadlines: Deadlines,

    // -- Configuration --
    pub config: SystemConfig,

    // -- Playback --
    /// Outcome of the fetch run on entry to `PlayingSound`.
    /// `None` outside that state.
    pub last_fetch_ok: Option<bool>,

    // -- Outbound --
    /// Events recorded during the current dispatch, in order.
    pub events: heapless::Vec<AppEvent, PENDING_EVENTS_CAP>,
}

impl EngineContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            now_ms: 0,
            deadlines: Deadlines::starting_at(0, &config.intervals),
            config,
            last_fetch_ok: None,
            events: heapless::Vec::new(),
        }
    }

    /// Take a fresh clock reading and latch whatever has come due.
    pub fn refresh_clock(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
        self.deadlines.observe(now_ms);
    }

    /// Every service due one interval from now.
    pub fn reset_all_deadlines(&mut self) {
        self.deadlines.reset_all(self.now_ms, &self.config.intervals);
    }

    /// One service due one interval from now.
    pub fn reset_deadline(&mut self, service: Service) {
        self.deadlines
            .reset(service, self.now_ms, &self.config.intervals);
    }

    /// Queue an event for the sink.
    pub fn record(&mut self, event: AppEvent) {
        if let Err(dropped) = self.events.push(event) {
            warn!("event buffer full, dropping {:?}", dropped);
        }
    }
}
