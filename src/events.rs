//! Discrete signals exchanged with the behaviour engine.
//!
//! Inbound signals come from the tick timer, the button gesture debouncer
//! and the action runner (which reports `Stop` when it finishes whatever
//! it was asked to do).  Outbound signals are emitted by the engine
//! through [`SignalPort`](crate::app::ports::SignalPort) for the action
//! runner to act upon.
//!
//! ```text
//!  tick timer ─────┐                        ┌──▶ WakeUp / Action / FallAsleep
//!  button gestures ┼──▶  BehaviorEngine  ───┼──▶ SocialFeed … Sound
//!  action runner ──┘        dispatch()      └──▶ Stop / PlaySound
//! ```
//!
//! There is no queue: the driver pumps exactly one signal per call.

use crate::timer::Service;

/// The closed set of engine signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Signal {
    // ── Driver ─────────────────────────────────────────────
    /// Periodic tick.
    Tick = 0,
    /// The action runner finished (or the user asked to stop).
    Stop = 1,

    // ── Gestures ───────────────────────────────────────────
    /// Short click released.
    ShortClickReleased = 10,
    /// Super-long press armed (still held).
    SuperlongClickArmed = 11,

    // ── Lifecycle requests (outbound) ──────────────────────
    WakeUp = 20,
    Action = 21,
    FallAsleep = 22,

    // ── Service checks ─────────────────────────────────────
    SocialFeed = 30,
    Mailbox = 31,
    Microblog = 32,
    Rss = 33,
    CheckIn = 34,
    Sound = 35,

    // ── Playback (outbound) ────────────────────────────────
    /// A freshly fetched sound is ready to be played.
    PlaySound = 40,
}

impl Signal {
    /// The check request signal for a polled service.
    pub const fn for_service(service: Service) -> Self {
        match service {
            Service::SocialFeed => Self::SocialFeed,
            Service::Mailbox => Self::Mailbox,
            Service::Microblog => Self::Microblog,
            Service::Rss => Self::Rss,
            Service::CheckIn => Self::CheckIn,
            Service::Sound => Self::Sound,
        }
    }

    /// Decode a raw signal byte (e.g. from the action runner's channel).
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Tick),
            1 => Some(Self::Stop),
            10 => Some(Self::ShortClickReleased),
            11 => Some(Self::SuperlongClickArmed),
            20 => Some(Self::WakeUp),
            21 => Some(Self::Action),
            22 => Some(Self::FallAsleep),
            30 => Some(Self::SocialFeed),
            31 => Some(Self::Mailbox),
            32 => Some(Self::Microblog),
            33 => Some(Self::Rss),
            34 => Some(Self::CheckIn),
            35 => Some(Self::Sound),
            40 => Some(Self::PlaySound),
            _ => None,
        }
    }
}
