//! Wrap-tolerant millisecond deadlines.
//!
//! The device clock is a free-running `u32` millisecond counter that wraps
//! roughly every 49.7 days.  A plain `now >= deadline` comparison breaks at
//! the wrap, so every comparison here goes through the wrapping difference
//! reinterpreted as a signed value:
//!
//! ```text
//!   due  ⇔  (now − deadline) mod 2³²  <  2³¹
//! ```
//!
//! This is exact as long as no interval exceeds 2³¹ ms ≈ 24.8 days;
//! [`SystemConfig::validate`](crate::config::SystemConfig::validate)
//! rejects longer intervals.  A deadline left overdue for longer than that
//! would read as "not due" again, so [`Deadlines::observe`] latches every
//! deadline it sees due.  The engine observes on every dispatch, which
//! leaves only the gap between two dispatches bounded by 2³¹ ms.

use core::fmt;

use crate::config::CheckIntervals;

/// Largest interval the wrap-tolerant comparison can represent.
pub const MAX_INTERVAL_MS: u32 = i32::MAX as u32;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// An absolute point on the wrapping millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(u32);

impl Deadline {
    /// Deadline at exactly `at_ms`.
    pub const fn at(at_ms: u32) -> Self {
        Self(at_ms)
    }

    /// Deadline `interval_ms` after `now_ms`, wrapping past `u32::MAX`.
    pub const fn after(now_ms: u32, interval_ms: u32) -> Self {
        Self(now_ms.wrapping_add(interval_ms))
    }

    /// Raw timestamp.
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// `now >= deadline` on the wrapping clock.
    pub const fn is_due(self, now_ms: u32) -> bool {
        (now_ms.wrapping_sub(self.0) as i32) >= 0
    }

    /// Milliseconds left until the deadline, or 0 once due.
    pub const fn remaining(self, now_ms: u32) -> u32 {
        if self.is_due(now_ms) {
            0
        } else {
            self.0.wrapping_sub(now_ms)
        }
    }
}

// ---------------------------------------------------------------------------
// Polled services
// ---------------------------------------------------------------------------

/// The six remote services the device polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Service {
    /// Social feed (feed A).
    SocialFeed = 0,
    /// Mailbox.
    Mailbox = 1,
    /// Microblog (feed B).
    Microblog = 2,
    /// RSS source.
    Rss = 3,
    /// Location check-ins.
    CheckIn = 4,
    /// Sound/media service.
    Sound = 5,
}

impl Service {
    pub const COUNT: usize = 6;

    /// Fixed polling priority.  A persistently overdue service earlier in
    /// this list starves later ones until it has been serviced.
    pub const PRIORITY: [Service; Service::COUNT] = [
        Service::SocialFeed,
        Service::Mailbox,
        Service::Microblog,
        Service::Rss,
        Service::CheckIn,
        Service::Sound,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::SocialFeed => "social-feed",
            Self::Mailbox => "mailbox",
            Self::Microblog => "microblog",
            Self::Rss => "rss",
            Self::CheckIn => "check-in",
            Self::Sound => "sound",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Per-service deadline set
// ---------------------------------------------------------------------------

/// One deadline per polled service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadlines {
    slots: [Deadline; Service::COUNT],
    /// Seen due by [`observe`](Self::observe); cleared only by a reset.
    overdue: [bool; Service::COUNT],
}

impl Deadlines {
    /// All six deadlines at `now + interval`.
    pub fn starting_at(now_ms: u32, intervals: &CheckIntervals) -> Self {
        let mut d = Self::default();
        d.reset_all(now_ms, intervals);
        d
    }

    pub fn get(&self, service: Service) -> Deadline {
        self.slots[service.index()]
    }

    /// Push one service's deadline to `now + interval`.
    pub fn reset(&mut self, service: Service, now_ms: u32, intervals: &CheckIntervals) {
        self.slots[service.index()] = Deadline::after(now_ms, intervals.get(service));
        self.overdue[service.index()] = false;
    }

    /// Bulk reset performed when (re)entering the push-connected cycle.
    pub fn reset_all(&mut self, now_ms: u32, intervals: &CheckIntervals) {
        for service in Service::PRIORITY {
            self.reset(service, now_ms, intervals);
        }
    }

    /// Latch every deadline due at `now_ms` so it stays due until reset,
    /// however long it is left waiting.
    pub fn observe(&mut self, now_ms: u32) {
        for (slot, overdue) in self.slots.iter().zip(self.overdue.iter_mut()) {
            *overdue |= slot.is_due(now_ms);
        }
    }

    /// Due at `now_ms`, or latched due by an earlier observation.
    pub fn is_due(&self, service: Service, now_ms: u32) -> bool {
        self.overdue[service.index()] || self.get(service).is_due(now_ms)
    }

    /// First due service in priority order.
    pub fn first_due(&self, now_ms: u32) -> Option<Service> {
        Service::PRIORITY
            .into_iter()
            .find(|s| self.is_due(*s, now_ms))
    }

    pub fn any_due(&self, now_ms: u32) -> bool {
        self.first_due(now_ms).is_some()
    }
}
