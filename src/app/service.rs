//! Behaviour engine: the hexagonal core.
//!
//! [`BehaviorEngine`] owns the FSM and its context.  It exposes a
//! clean, hardware-agnostic API: [`initialize`](BehaviorEngine::initialize)
//! once, then one [`dispatch`](BehaviorEngine::dispatch) per signal.  All
//! I/O flows through the port traits injected at call sites, making the
//! whole engine testable with mock adapters.
//!
//! ```text
//!  DevicePorts ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!  (LED, inbox,    │     BehaviorEngine       │
//!   servo, clock,  │  FSM · deadlines · cfg   │
//!   sound) ◀────── └─────────────────────────┘
//! ```
//!
//! Dispatch is synchronous and must complete before the next call.  A
//! sound fetch triggered on entry to `PlayingSound` therefore finishes
//! before the engine can see another signal.

use log::info;

use crate::config::SystemConfig;
use crate::events::Signal;
use crate::fsm::context::EngineContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::timer::Deadlines;

use super::events::AppEvent;
use super::ports::{DevicePorts, EventSink};

// ───────────────────────────────────────────────────────────────
// BehaviorEngine
// ───────────────────────────────────────────────────────────────

/// The behaviour engine orchestrates all device-level decisions.
pub struct BehaviorEngine {
    fsm: Fsm,
    ctx: EngineContext,
    dispatch_count: u64,
}

impl BehaviorEngine {
    /// Construct the engine from configuration.
    ///
    /// The machine is parked in `WakingUp` without running its ENTRY;
    /// call [`initialize`](Self::initialize) next.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::WakingUp),
            ctx: EngineContext::new(config),
            dispatch_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Reset every deadline to `now + interval` and move to the push-mode
    /// entry state (EXIT of the current state, then ENTRY).
    ///
    /// Safe to call again at any time; nothing from a previous call
    /// survives.
    pub fn initialize(&mut self, dev: &mut impl DevicePorts, sink: &mut impl EventSink) {
        self.ctx.now_ms = dev.now_ms();
        self.ctx.reset_all_deadlines();
        self.ctx.last_fetch_ok = None;
        self.fsm
            .transition(StateId::EnteringPushMode, &mut self.ctx, dev);
        self.ctx.record(AppEvent::Started(self.fsm.current_state()));
        self.flush_events(sink);
        info!("BehaviorEngine initialised in {}", self.fsm.current_state());
    }

    // ── Per-signal orchestration ──────────────────────────────

    /// Deliver one signal.  Returns the state active afterwards.
    pub fn dispatch(
        &mut self,
        signal: Signal,
        dev: &mut impl DevicePorts,
        sink: &mut impl EventSink,
    ) -> StateId {
        self.dispatch_count += 1;
        self.ctx.refresh_clock(dev.now_ms());
        self.fsm.dispatch(signal, &mut self.ctx, dev);
        self.flush_events(sink);
        self.fsm.current_state()
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// The six service deadlines.
    pub fn deadlines(&self) -> &Deadlines {
        &self.ctx.deadlines
    }

    /// Live configuration.
    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    /// Signals dispatched since construction.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count
    }

    /// Transitions executed since construction.
    pub fn transition_count(&self) -> u64 {
        self.fsm.transition_count()
    }

    /// Replace the configuration.  New intervals apply from the next reset
    /// of each deadline; existing deadlines are left alone.
    pub fn update_config(&mut self, config: SystemConfig) {
        self.ctx.config = config;
        info!("Configuration updated at runtime");
    }

    // ── Internal ──────────────────────────────────────────────

    fn flush_events(&mut self, sink: &mut impl EventSink) {
        for event in &self.ctx.events {
            sink.emit(event);
        }
        self.ctx.events.clear();
    }
}
