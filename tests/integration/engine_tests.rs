//! Integration tests for the BehaviorEngine → FSM → device ports pipeline.
//!
//! These run on the host and drive the engine exactly as the firmware loop
//! does: one `dispatch` per tick or gesture, with a recording mock device
//! standing in for LED, inbox, servo player, action runner and clock.

use super::mock_hw::{Call, MockDevice, RecordingSink};

use deskmate::app::events::AppEvent;
use deskmate::app::ports::{InboxMessage, TrajectorySource};
use deskmate::app::service::BehaviorEngine;
use deskmate::config::{CheckIntervals, SystemConfig};
use deskmate::events::Signal;
use deskmate::fsm::StateId;
use deskmate::timer::Service;

const EIGHT_MIN: u32 = 480_000;
const ONE_HOUR: u32 = 3_600_000;

fn engine_at(now: u32, config: SystemConfig) -> (BehaviorEngine, MockDevice, RecordingSink) {
    let mut engine = BehaviorEngine::new(config);
    let mut dev = MockDevice::at(now);
    let mut sink = RecordingSink::new();
    engine.initialize(&mut dev, &mut sink);
    (engine, dev, sink)
}

/// Initialised and through push mode, sitting in `Awake`.
fn awake_at(now: u32, config: SystemConfig) -> (BehaviorEngine, MockDevice, RecordingSink) {
    let (mut engine, mut dev, mut sink) = engine_at(now, config);
    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);
    dev.clear();
    sink.events.clear();
    (engine, dev, sink)
}

fn assert_deadlines_from(engine: &BehaviorEngine, now: u32) {
    let intervals = engine.config().intervals;
    for service in Service::PRIORITY {
        assert_eq!(
            engine.deadlines().get(service).as_millis(),
            now.wrapping_add(intervals.get(service)),
            "{service} deadline"
        );
    }
}

// ── Startup ──────────────────────────────────────────────────

#[test]
fn initialize_enters_push_mode_busy() {
    let (engine, dev, sink) = engine_at(1_000, SystemConfig::default());
    assert_eq!(engine.state(), StateId::EnteringPushMode);
    // EXIT of the parked WakingUp state persists the channel before ENTRY.
    assert_eq!(
        dev.calls(),
        vec![Call::ReadClock(1_000), Call::PersistChannel, Call::ShowBusy]
    );
    assert_eq!(sink.events.last(), Some(&AppEvent::Started(StateId::EnteringPushMode)));
    assert_deadlines_from(&engine, 1_000);
}

#[test]
fn initialize_twice_leaves_nothing_from_the_first_run() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());

    // Move one deadline and leave the engine mid-cycle.
    dev.set_now(EIGHT_MIN);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(engine.state(), StateId::Checking(Service::SocialFeed));
    dev.set_now(EIGHT_MIN + 10);
    engine.dispatch(Signal::Stop, &mut dev, &mut sink);

    dev.set_now(900_000);
    engine.initialize(&mut dev, &mut sink);
    assert_eq!(engine.state(), StateId::EnteringPushMode);
    assert_deadlines_from(&engine, 900_000);

    dev.set_now(950_000);
    engine.initialize(&mut dev, &mut sink);
    assert_eq!(engine.state(), StateId::EnteringPushMode);
    assert_deadlines_from(&engine, 950_000);
}

// ── Push mode ────────────────────────────────────────────────

#[test]
fn push_failure_retries_in_place() {
    let (mut engine, mut dev, mut sink) = engine_at(0, SystemConfig::default());
    dev.establish_results.extend([false, false]);
    dev.clear();
    sink.events.clear();

    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
    assert_eq!(
        dev.calls(),
        vec![
            Call::ReadClock(0),
            Call::Establish(false),
            Call::Suspend,
            Call::ShowFault
        ]
    );
    // No EXIT/ENTRY on an internal retry.
    assert_eq!(sink.events, vec![AppEvent::PushModeFailed]);

    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(engine.state(), StateId::EnteringPushMode);

    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);
    assert_eq!(dev.calls().last(), Some(&Call::ShowActive));
}

// ── Awake ────────────────────────────────────────────────────

#[test]
fn awake_stays_awake_while_nothing_is_due() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    for t in (0..EIGHT_MIN).step_by(7_919) {
        dev.set_now(t);
        assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);
    }
    assert_eq!(sink.transitions(), 0);
    assert!(dev.emitted().is_empty());
}

#[test]
fn keep_alive_ping_is_reported_without_leaving_awake() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.inbox.push_back(InboxMessage::KeepAlivePing);
    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);
    assert_eq!(sink.events, vec![AppEvent::KeepAlive]);
}

#[test]
fn click_starts_an_action_offline() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    assert_eq!(
        engine.dispatch(Signal::ShortClickReleased, &mut dev, &mut sink),
        StateId::Action
    );
    // ENTRY first, outbound signal last.
    assert_eq!(
        dev.calls(),
        vec![
            Call::ReadClock(0),
            Call::ShowBusy,
            Call::Suspend,
            Call::Emit(Signal::Action)
        ]
    );

    assert_eq!(
        engine.dispatch(Signal::Stop, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
}

#[test]
fn due_deadline_wins_over_inbox() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.inbox.push_back(InboxMessage::StartRemoteControl);
    dev.set_now(EIGHT_MIN);
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::CheckingServices
    );
    assert_eq!(dev.inbox.len(), 1, "inbox must not be polled when a check is due");
}

// ── Service checks ───────────────────────────────────────────

#[test]
fn due_services_are_checked_in_priority_order() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.set_now(ONE_HOUR);

    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::CheckingServices
    );
    for service in Service::PRIORITY {
        assert_eq!(
            engine.dispatch(Signal::Tick, &mut dev, &mut sink),
            StateId::Checking(service)
        );
        assert_eq!(
            engine.dispatch(Signal::Stop, &mut dev, &mut sink),
            StateId::CheckingServices
        );
    }
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );

    let expected: Vec<Signal> = Service::PRIORITY
        .iter()
        .map(|s| Signal::for_service(*s))
        .collect();
    assert_eq!(dev.emitted(), expected);
    let started: Vec<Service> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::CheckStarted(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(started, Service::PRIORITY.to_vec());
}

#[test]
fn mailbox_check_rearms_from_the_stop() {
    let config = SystemConfig {
        intervals: CheckIntervals {
            mailbox_ms: 1_000,
            ..CheckIntervals::default()
        },
        ..SystemConfig::default()
    };
    let (mut engine, mut dev, mut sink) = awake_at(0, config);

    dev.set_now(1_000);
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::CheckingServices
    );
    dev.clear();
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::Checking(Service::Mailbox)
    );
    assert_eq!(dev.emitted(), vec![Signal::Mailbox]);

    dev.set_now(1_500);
    assert_eq!(
        engine.dispatch(Signal::Stop, &mut dev, &mut sink),
        StateId::CheckingServices
    );
    assert_eq!(engine.deadlines().get(Service::Mailbox).as_millis(), 2_500);
    // Others untouched.
    assert_eq!(engine.deadlines().get(Service::Rss).as_millis(), EIGHT_MIN);

    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
}

#[test]
fn checking_substates_ignore_unrelated_signals() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.set_now(EIGHT_MIN);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(engine.state(), StateId::Checking(Service::SocialFeed));

    for signal in [Signal::Tick, Signal::ShortClickReleased, Signal::Sound] {
        assert_eq!(
            engine.dispatch(signal, &mut dev, &mut sink),
            StateId::Checking(Service::SocialFeed)
        );
    }
}

#[test]
fn deadlines_survive_clock_wraparound() {
    let start = u32::MAX - 100;
    let (mut engine, mut dev, mut sink) = awake_at(start, SystemConfig::default());

    // Just past the wrap: nothing is due.
    dev.set_now(50);
    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);

    // One interval after start, wrapped.
    dev.set_now(start.wrapping_add(EIGHT_MIN) - 1);
    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);
    dev.set_now(start.wrapping_add(EIGHT_MIN));
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::CheckingServices
    );
}

// ── Sound ────────────────────────────────────────────────────

fn into_checking_sound(engine: &mut BehaviorEngine, dev: &mut MockDevice, sink: &mut RecordingSink) {
    // Everything is due; clear the five feeds first.
    dev.set_now(ONE_HOUR);
    engine.dispatch(Signal::Tick, dev, sink);
    for service in &Service::PRIORITY[..5] {
        assert_eq!(
            engine.dispatch(Signal::Tick, dev, sink),
            StateId::Checking(*service)
        );
        engine.dispatch(Signal::Stop, dev, sink);
    }
    assert_eq!(
        engine.dispatch(Signal::Tick, dev, sink),
        StateId::Checking(Service::Sound)
    );
}

#[test]
fn new_sound_is_fetched_and_played() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    into_checking_sound(&mut engine, &mut dev, &mut sink);
    dev.clear();
    sink.events.clear();

    assert_eq!(
        engine.dispatch(Signal::Sound, &mut dev, &mut sink),
        StateId::PlayingSound
    );
    assert_eq!(
        dev.calls(),
        vec![
            Call::ReadClock(ONE_HOUR),
            Call::FetchSound(true),
            Call::Emit(Signal::PlaySound)
        ]
    );
    assert!(sink.events.contains(&AppEvent::SoundFetched));

    // Playback in progress: ticks do nothing.
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::PlayingSound
    );

    dev.set_now(ONE_HOUR + 30_000);
    assert_eq!(
        engine.dispatch(Signal::Stop, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
    assert_deadlines_from(&engine, ONE_HOUR + 30_000);
}

#[test]
fn failed_fetch_leaves_on_next_tick() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    into_checking_sound(&mut engine, &mut dev, &mut sink);
    dev.fetch_ok = false;
    dev.clear();

    assert_eq!(
        engine.dispatch(Signal::Sound, &mut dev, &mut sink),
        StateId::PlayingSound
    );
    assert!(dev.position(Call::ShowFault).is_some());
    assert!(!dev.emitted().contains(&Signal::PlaySound));
    assert!(sink.events.contains(&AppEvent::SoundFetchFailed));

    dev.set_now(ONE_HOUR + 5);
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
    assert_deadlines_from(&engine, ONE_HOUR + 5);
}

#[test]
fn action_can_request_a_sound() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    engine.dispatch(Signal::ShortClickReleased, &mut dev, &mut sink);
    assert_eq!(
        engine.dispatch(Signal::Sound, &mut dev, &mut sink),
        StateId::PlayingSound
    );
}

// ── Remote control ───────────────────────────────────────────

#[test]
fn remote_control_plays_steps_until_finished() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.inbox.push_back(InboxMessage::StartRemoteControl);
    dev.set_now(100);
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::RemoteControl
    );
    assert!(dev.position(Call::Begin(TrajectorySource::Realtime)) < dev.position(Call::ShowBusy));

    dev.clear();
    dev.set_now(150);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(dev.calls(), vec![Call::ReadClock(150), Call::Advance(150)]);

    dev.step_done = true;
    dev.clear();
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(dev.calls().last(), Some(&Call::StartNextStep));
    assert_eq!(engine.state(), StateId::RemoteControl);
}

#[test]
fn leaving_remote_control_resets_deadlines_before_awake_entry() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.inbox.push_back(InboxMessage::StartRemoteControl);
    dev.set_now(100);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(engine.state(), StateId::RemoteControl);

    dev.clear();
    dev.set_now(200_000);
    dev.clock_step = 7;
    dev.trajectory_done = true;
    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);

    let reset = dev.position(Call::ReadClock(200_007)).expect("EXIT clock read");
    let entry = dev.position(Call::ShowActive).expect("Awake ENTRY");
    assert!(reset < entry, "EXIT reset must precede ENTRY: {:?}", dev.calls());
    assert_deadlines_from(&engine, 200_007);
}

#[test]
fn click_ends_remote_control_early() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    dev.inbox.push_back(InboxMessage::StartRemoteControl);
    engine.dispatch(Signal::Tick, &mut dev, &mut sink);
    assert_eq!(
        engine.dispatch(Signal::ShortClickReleased, &mut dev, &mut sink),
        StateId::Awake
    );
}

// ── Sleep / wake ─────────────────────────────────────────────

#[test]
fn sleep_and_wake_cycle() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());

    assert_eq!(
        engine.dispatch(Signal::SuperlongClickArmed, &mut dev, &mut sink),
        StateId::FallingAsleep
    );
    assert_eq!(dev.emitted(), vec![Signal::FallAsleep]);

    dev.clear();
    assert_eq!(engine.dispatch(Signal::Stop, &mut dev, &mut sink), StateId::Asleep);
    assert_eq!(
        dev.calls(),
        vec![Call::ReadClock(0), Call::ShowIdle, Call::Suspend]
    );

    // Asleep only answers the long press.
    for signal in [Signal::Tick, Signal::ShortClickReleased, Signal::Stop] {
        assert_eq!(engine.dispatch(signal, &mut dev, &mut sink), StateId::Asleep);
    }

    dev.clear();
    assert_eq!(
        engine.dispatch(Signal::SuperlongClickArmed, &mut dev, &mut sink),
        StateId::WakingUp
    );
    assert_eq!(
        dev.calls(),
        vec![Call::ReadClock(0), Call::ShowBusy, Call::Emit(Signal::WakeUp)]
    );

    dev.clear();
    assert_eq!(
        engine.dispatch(Signal::ShortClickReleased, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
    assert_eq!(
        dev.calls(),
        vec![
            Call::ReadClock(0),
            Call::PersistChannel,
            Call::ShowBusy,
            Call::Emit(Signal::Stop)
        ]
    );
}

#[test]
fn overdue_checks_survive_a_sleep_longer_than_half_the_clock() {
    const TEN_MIN: u32 = 600_000;
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    engine.dispatch(Signal::SuperlongClickArmed, &mut dev, &mut sink);
    assert_eq!(engine.dispatch(Signal::Stop, &mut dev, &mut sink), StateId::Asleep);

    // Asleep for over 2^31 ms, still ticking.
    let wake_at = (1u32 << 31) + 2 * ONE_HOUR;
    let mut now = 0u32;
    while now < wake_at {
        now += TEN_MIN;
        dev.set_now(now);
        assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Asleep);
    }
    dev.clear();

    assert_eq!(
        engine.dispatch(Signal::SuperlongClickArmed, &mut dev, &mut sink),
        StateId::WakingUp
    );
    assert_eq!(
        engine.dispatch(Signal::Stop, &mut dev, &mut sink),
        StateId::EnteringPushMode
    );
    assert_eq!(engine.dispatch(Signal::Tick, &mut dev, &mut sink), StateId::Awake);
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::CheckingServices
    );
    assert_eq!(
        engine.dispatch(Signal::Tick, &mut dev, &mut sink),
        StateId::Checking(Service::SocialFeed)
    );
}

#[test]
fn every_transition_is_reported() {
    let (mut engine, mut dev, mut sink) = awake_at(0, SystemConfig::default());
    let before = engine.transition_count();
    engine.dispatch(Signal::SuperlongClickArmed, &mut dev, &mut sink);
    engine.dispatch(Signal::Stop, &mut dev, &mut sink);
    assert_eq!(engine.transition_count() - before, 2);
    assert_eq!(
        sink.events,
        vec![
            AppEvent::StateChanged {
                from: StateId::Awake,
                to: StateId::FallingAsleep
            },
            AppEvent::StateChanged {
                from: StateId::FallingAsleep,
                to: StateId::Asleep
            },
        ]
    );
}
