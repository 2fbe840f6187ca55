//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers (no closures, no heap).
//! This is the classic embedded C FSM pattern expressed in safe Rust.
//!
//! ```text
//!   ASLEEP ──[long press]──▶ WAKING_UP ──[stop / click]──▶ ENTERING_PUSH_MODE ◀──┐
//!     ▲                                                     │ [push ok]          │
//!     │                                                     ▼                    │
//!  FALLING_ASLEEP ◀──[long press]── AWAKE ──[click]──▶ ACTION ──[stop]───────────┤
//!     ▲                             │  │                  │ [sound]              │
//!     │                   [due]     │  │ [remote start]   ▼                      │
//!     │                             ▼  ▼            ┌──────────────────────┐     │
//!     └──[long press]── REMOTE_CONTROL │            │ CHECKING_SERVICES    │     │
//!                                      └───────────▶│  ├ Checking(×6)      │─────┘
//!                                                   │  └ PlayingSound      │ [nothing due / stop]
//!                                                   └──────────────────────┘
//! ```

use super::context::EngineContext;
use super::{StateDescriptor, StateId, Transition};
use crate::app::events::AppEvent;
use crate::app::ports::{DevicePorts, InboxMessage, TrajectorySource};
use crate::events::Signal;
use crate::timer::Service;
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Asleep
        StateDescriptor {
            id: StateId::Asleep,
            name: "Asleep",
            on_enter: None,
            on_exit: None,
            on_event: asleep_event,
        },
        // Index 1: WakingUp
        StateDescriptor {
            id: StateId::WakingUp,
            name: "WakingUp",
            on_enter: Some(busy_enter),
            on_exit: Some(waking_up_exit),
            on_event: waking_up_event,
        },
        // Index 2: EnteringPushMode
        StateDescriptor {
            id: StateId::EnteringPushMode,
            name: "EnteringPushMode",
            on_enter: Some(busy_enter),
            on_exit: None,
            on_event: entering_push_mode_event,
        },
        // Index 3: Awake
        StateDescriptor {
            id: StateId::Awake,
            name: "Awake",
            on_enter: Some(awake_enter),
            on_exit: None,
            on_event: awake_event,
        },
        // Index 4: Action
        StateDescriptor {
            id: StateId::Action,
            name: "Action",
            on_enter: Some(busy_offline_enter),
            on_exit: None,
            on_event: action_event,
        },
        // Index 5: CheckingServices
        StateDescriptor {
            id: StateId::CheckingServices,
            name: "CheckingServices",
            on_enter: Some(busy_offline_enter),
            on_exit: None,
            on_event: checking_services_event,
        },
        // Index 6..=11: Checking(service), in priority order
        checking(Service::SocialFeed, "CheckingSocialFeed", checking_social_feed_event),
        checking(Service::Mailbox, "CheckingMailbox", checking_mailbox_event),
        checking(Service::Microblog, "CheckingMicroblog", checking_microblog_event),
        checking(Service::Rss, "CheckingRss", checking_rss_event),
        checking(Service::CheckIn, "CheckingCheckIn", checking_check_in_event),
        checking(Service::Sound, "CheckingSound", checking_sound_event),
        // Index 12: PlayingSound
        StateDescriptor {
            id: StateId::PlayingSound,
            name: "PlayingSound",
            on_enter: Some(playing_sound_enter),
            on_exit: Some(playing_sound_exit),
            on_event: playing_sound_event,
        },
        // Index 13: FallingAsleep
        StateDescriptor {
            id: StateId::FallingAsleep,
            name: "FallingAsleep",
            on_enter: None,
            on_exit: None,
            on_event: falling_asleep_event,
        },
        // Index 14: RemoteControl
        StateDescriptor {
            id: StateId::RemoteControl,
            name: "RemoteControl",
            on_enter: Some(busy_enter),
            on_exit: Some(remote_control_exit),
            on_event: remote_control_event,
        },
    ]
}

fn checking(
    service: Service,
    name: &'static str,
    on_event: super::StateEventFn,
) -> StateDescriptor {
    StateDescriptor {
        id: StateId::Checking(service),
        name,
        on_enter: None,
        on_exit: None,
        on_event,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared ENTRY actions
// ═══════════════════════════════════════════════════════════════════════════

fn busy_enter(_ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    dev.show_busy();
}

/// Busy, and the push session is not needed while we work.
fn busy_offline_enter(_ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    dev.show_busy();
    dev.suspend();
}

/// Every deadline one interval from the moment of leaving.  The clock is
/// re-read because the state may have blocked (fetch, playback).
fn restart_deadlines(ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    ctx.now_ms = dev.now_ms();
    ctx.reset_all_deadlines();
}

// ═══════════════════════════════════════════════════════════════════════════
//  ASLEEP / WAKING_UP / FALLING_ASLEEP
// ═══════════════════════════════════════════════════════════════════════════

fn asleep_event(
    _ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::SuperlongClickArmed => {
            Some(Transition::to(StateId::WakingUp).emitting(Signal::WakeUp))
        }
        _ => None,
    }
}

fn waking_up_event(
    _ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::Stop => Some(Transition::to(StateId::EnteringPushMode)),
        // Cut the wake-up animation short.
        Signal::ShortClickReleased => {
            Some(Transition::to(StateId::EnteringPushMode).emitting(Signal::Stop))
        }
        _ => None,
    }
}

fn waking_up_exit(_ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    dev.persist_channel();
}

fn falling_asleep_event(
    _ctx: &mut EngineContext,
    dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::Stop => {
            dev.show_idle();
            dev.suspend();
            info!("ASLEEP: push session suspended");
            Some(Transition::to(StateId::Asleep))
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENTERING_PUSH_MODE
// ═══════════════════════════════════════════════════════════════════════════

fn entering_push_mode_event(
    ctx: &mut EngineContext,
    dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    if signal != Signal::Tick {
        return None;
    }
    if dev.establish() {
        return Some(Transition::to(StateId::Awake));
    }
    // Internal retry: no EXIT/ENTRY, just the fault indication.
    warn!("push session not established, retrying next tick");
    dev.suspend();
    dev.show_fault();
    ctx.record(AppEvent::PushModeFailed);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAKE
// ═══════════════════════════════════════════════════════════════════════════

fn awake_enter(_ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    dev.show_active();
}

fn awake_event(
    ctx: &mut EngineContext,
    dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::ShortClickReleased => {
            Some(Transition::to(StateId::Action).emitting(Signal::Action))
        }
        Signal::SuperlongClickArmed => {
            Some(Transition::to(StateId::FallingAsleep).emitting(Signal::FallAsleep))
        }
        Signal::Tick => {
            if ctx.deadlines.any_due(ctx.now_ms) {
                return Some(Transition::to(StateId::CheckingServices));
            }
            match dev.poll_message() {
                InboxMessage::StartRemoteControl => {
                    dev.begin(TrajectorySource::Realtime);
                    Some(Transition::to(StateId::RemoteControl))
                }
                InboxMessage::KeepAlivePing => {
                    debug!("AWAKE: keep-alive ping");
                    ctx.record(AppEvent::KeepAlive);
                    None
                }
                InboxMessage::None => None,
            }
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTION
// ═══════════════════════════════════════════════════════════════════════════

fn action_event(
    _ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::Stop => Some(Transition::to(StateId::EnteringPushMode)),
        Signal::Sound => Some(Transition::to(StateId::PlayingSound)),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CHECKING_SERVICES and its per-service sub-states
// ═══════════════════════════════════════════════════════════════════════════

fn checking_services_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    if signal != Signal::Tick {
        return None;
    }
    match ctx.deadlines.first_due(ctx.now_ms) {
        Some(service) => {
            info!("CHECKING: {} is due", service);
            ctx.record(AppEvent::CheckStarted(service));
            Some(Transition::to(StateId::Checking(service)).emitting(Signal::for_service(service)))
        }
        None => Some(Transition::to(StateId::EnteringPushMode)),
    }
}

/// Common sub-state behaviour: on `Stop` return to the cycle and re-arm
/// this service's deadline from the time of the stop.
fn checking_event(ctx: &mut EngineContext, service: Service, signal: Signal) -> Option<Transition> {
    match signal {
        Signal::Stop => {
            ctx.reset_deadline(service);
            Some(Transition::to(StateId::CheckingServices))
        }
        _ => None,
    }
}

fn checking_social_feed_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    checking_event(ctx, Service::SocialFeed, signal)
}

fn checking_mailbox_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    checking_event(ctx, Service::Mailbox, signal)
}

fn checking_microblog_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    checking_event(ctx, Service::Microblog, signal)
}

fn checking_rss_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    checking_event(ctx, Service::Rss, signal)
}

fn checking_check_in_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    checking_event(ctx, Service::CheckIn, signal)
}

fn checking_sound_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        // A new sound is waiting upstream.
        Signal::Sound => Some(Transition::to(StateId::PlayingSound)),
        other => checking_event(ctx, Service::Sound, other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PLAYING_SOUND
// ═══════════════════════════════════════════════════════════════════════════

fn playing_sound_enter(ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    // Blocks until the fetch succeeds or gives up.
    let ok = dev.fetch_sound();
    ctx.last_fetch_ok = Some(ok);
    if ok {
        info!("PLAYING: sound fetched");
        ctx.record(AppEvent::SoundFetched);
        dev.emit(Signal::PlaySound);
    } else {
        warn!("PLAYING: sound fetch failed");
        ctx.record(AppEvent::SoundFetchFailed);
        dev.show_fault();
    }
}

fn playing_sound_event(
    ctx: &mut EngineContext,
    _dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::Stop => Some(Transition::to(StateId::EnteringPushMode)),
        // Nothing will be played, so nobody will send Stop.
        Signal::Tick if ctx.last_fetch_ok == Some(false) => {
            Some(Transition::to(StateId::EnteringPushMode))
        }
        _ => None,
    }
}

fn playing_sound_exit(ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    restart_deadlines(ctx, dev);
    ctx.last_fetch_ok = None;
}

// ═══════════════════════════════════════════════════════════════════════════
//  REMOTE_CONTROL
// ═══════════════════════════════════════════════════════════════════════════

fn remote_control_event(
    ctx: &mut EngineContext,
    dev: &mut dyn DevicePorts,
    signal: Signal,
) -> Option<Transition> {
    match signal {
        Signal::Tick => {
            dev.advance(ctx.now_ms);
            if dev.trajectory_finished() {
                info!("REMOTE: trajectory finished");
                Some(Transition::to(StateId::Awake))
            } else {
                if dev.step_finished() {
                    dev.start_next_step();
                }
                None
            }
        }
        Signal::ShortClickReleased => Some(Transition::to(StateId::Awake)),
        Signal::SuperlongClickArmed => {
            Some(Transition::to(StateId::FallingAsleep).emitting(Signal::FallAsleep))
        }
        _ => None,
    }
}

fn remote_control_exit(ctx: &mut EngineContext, dev: &mut dyn DevicePorts) {
    restart_deadlines(ctx, dev);
}
