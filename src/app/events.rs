//! Outbound application events.
//!
//! The [`BehaviorEngine`](super::service::BehaviorEngine) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward to the
//! backend, etc.

use crate::fsm::StateId;
use crate::timer::Service;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The engine has been (re)initialised (carries the operating state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A service check was started.
    CheckStarted(Service),

    /// Push session could not be established; will retry next tick.
    PushModeFailed,

    /// The inbox answered a keep-alive ping.
    KeepAlive,

    /// A sound fetch finished with a complete file.
    SoundFetched,

    /// A sound fetch failed.
    SoundFetchFailed,
}
