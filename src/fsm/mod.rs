//! Function-pointer hierarchical state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                          │
//! │  ┌──────────────────┬──────────┬──────────┬────────────────────────┐ │
//! │  │ StateId          │ on_enter │ on_exit  │ on_event               │ │
//! │  ├──────────────────┼──────────┼──────────┼────────────────────────┤ │
//! │  │ Asleep           │ fn(..)   │ fn(..)   │ fn(..) -> Option<Tr>   │ │
//! │  │ WakingUp         │   …      │   …      │   …                    │ │
//! │  │ CheckingServices │          │          │                        │ │
//! │  │  ├ Checking(×6)  │          │          │                        │ │
//! │  │  └ PlayingSound  │          │          │                        │ │
//! │  │ …                │          │          │                        │ │
//! │  └──────────────────┴──────────┴──────────┴────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each dispatched [`Signal`] goes to `on_event` of the **current** state.
//! If it returns `Some(transition)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the target, updates the current
//! pointer, and finally emits the transition's outbound signal (if any).
//! EXIT always precedes ENTRY; several EXIT actions (deadline resets,
//! channel persistence) establish what the next ENTRY relies on.
//!
//! The hierarchy is two levels deep and carried by the state identity
//! itself ([`StateId::parent`]).  Sub-state handlers are self-contained:
//! unhandled signals are dropped, never bubbled to the parent.

pub mod context;
pub mod states;

use core::fmt;

use context::EngineContext;
use log::{debug, info};

use crate::app::events::AppEvent;
use crate::app::ports::DevicePorts;
use crate::events::Signal;
use crate::timer::Service;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state of the behaviour engine.
///
/// `Checking(_)` and `PlayingSound` are sub-states of `CheckingServices`.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Asleep,
    WakingUp,
    EnteringPushMode,
    Awake,
    Action,
    CheckingServices,
    /// Waiting for the action runner to finish one service check.
    Checking(Service),
    /// Fetching and playing the latest sound.
    PlayingSound,
    FallingAsleep,
    RemoteControl,
}

impl StateId {
    /// Number of states; sizes the table array.
    pub const COUNT: usize = 15;

    const CHECKING_BASE: usize = 6;

    /// Dense table index.
    pub const fn index(self) -> usize {
        match self {
            Self::Asleep => 0,
            Self::WakingUp => 1,
            Self::EnteringPushMode => 2,
            Self::Awake => 3,
            Self::Action => 4,
            Self::CheckingServices => 5,
            Self::Checking(service) => Self::CHECKING_BASE + service.index(),
            Self::PlayingSound => 12,
            Self::FallingAsleep => 13,
            Self::RemoteControl => 14,
        }
    }

    /// Convert a table index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `EnteringPushMode` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Asleep,
            1 => Self::WakingUp,
            2 => Self::EnteringPushMode,
            3 => Self::Awake,
            4 => Self::Action,
            5 => Self::CheckingServices,
            6..=11 => Self::Checking(Service::PRIORITY[idx - Self::CHECKING_BASE]),
            12 => Self::PlayingSound,
            13 => Self::FallingAsleep,
            14 => Self::RemoteControl,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::EnteringPushMode
            }
        }
    }

    /// Composite parent, if this is a sub-state.
    pub const fn parent(self) -> Option<StateId> {
        match self {
            Self::Checking(_) | Self::PlayingSound => Some(Self::CheckingServices),
            _ => None,
        }
    }

    /// `true` for `CheckingServices` and all of its sub-states.
    pub fn in_polling_cycle(self) -> bool {
        self == Self::CheckingServices || self.parent() == Some(Self::CheckingServices)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking(service) => write!(f, "Checking({service})"),
            other => write!(f, "{other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// What an event handler asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: StateId,
    /// Outbound signal emitted after the target's ENTRY action.
    pub emit: Option<Signal>,
}

impl Transition {
    pub const fn to(target: StateId) -> Self {
        Self { target, emit: None }
    }

    pub const fn emitting(self, signal: Signal) -> Self {
        Self {
            target: self.target,
            emit: Some(signal),
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut EngineContext, &mut dyn DevicePorts);

/// Signature for the per-signal handler.
/// Returns `Some(transition)` to leave the state, or `None` to stay.
pub type StateEventFn = fn(&mut EngineContext, &mut dyn DevicePorts, Signal) -> Option<Transition>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array (no heap, no boxed closures).
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: StateEventFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The state machine engine.
///
/// Owns the state table and the index of the active state.  The mutable
/// [`EngineContext`] and the device ports are threaded through every
/// handler call by the owner.
pub struct Fsm {
    /// Fixed-size table indexed by [`StateId::index`].
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Transitions executed since construction.
    transitions: u64,
}

impl Fsm {
    /// Construct a new FSM parked in `initial`.  No ENTRY action runs.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial.index(),
            transitions: 0,
        }
    }

    /// Deliver one signal to the current state.
    ///
    /// Returns the target state when a transition happened.
    pub fn dispatch(
        &mut self,
        signal: Signal,
        ctx: &mut EngineContext,
        dev: &mut dyn DevicePorts,
    ) -> Option<StateId> {
        let handler = self.table[self.current].on_event;
        match handler(ctx, dev, signal) {
            Some(tr) => {
                self.transition(tr.target, ctx, dev);
                if let Some(out) = tr.emit {
                    dev.emit(out);
                }
                Some(tr.target)
            }
            None => {
                if signal != Signal::Tick {
                    debug!(
                        "FSM: {:?} not acted on in {}",
                        signal, self.table[self.current].name
                    );
                }
                None
            }
        }
    }

    /// Run EXIT(current) → switch → ENTRY(next).  Runs even when `next`
    /// is the current state (external self-transition).
    pub fn transition(&mut self, next: StateId, ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
        let next_idx = next.index();
        let from = self.current_state();

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx, dev);
        }

        // Update pointer
        self.current = next_idx;
        self.transitions += 1;
        ctx.record(AppEvent::StateChanged { from, to: next });

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx, dev);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    /// Human-readable name of the current state.
    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// Transitions executed since construction.
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }
}
