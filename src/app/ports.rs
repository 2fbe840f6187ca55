//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BehaviorEngine / ContentFetcher (domain)
//! ```
//!
//! Driven adapters (LED, inbox, servo player, backend, HTTP, SD card)
//! implement these traits.  The engine consumes the device-facing ports
//! through the [`DevicePorts`] bundle; the fetcher is generic over the
//! network and storage ports, so neither core touches hardware directly.
//!
//! All port errors are typed, so callers must handle every variant explicitly.

use crate::app::events::AppEvent;
use crate::events::Signal;
use crate::fetch::pieces::ByteRange;

// ───────────────────────────────────────────────────────────────
// Indicator port (domain → status LED)
// ───────────────────────────────────────────────────────────────

/// Status indication.  Fire-and-forget.
pub trait IndicatorPort {
    /// Asleep / idle.
    fn show_idle(&mut self);
    /// Awake and listening.
    fn show_active(&mut self);
    /// Working on something.
    fn show_busy(&mut self);
    /// A collaborator failed.
    fn show_fault(&mut self);
    /// Indicator dark.
    fn show_nothing(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Inbox / push session port
// ───────────────────────────────────────────────────────────────

/// What the push inbox had waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxMessage {
    None,
    StartRemoteControl,
    KeepAlivePing,
}

/// The persistent notification channel to the backend.
pub trait InboxPort {
    /// Stop using the push session (configuration is kept).
    fn suspend(&mut self);
    /// Try to (re)establish the push session.
    fn establish(&mut self) -> bool;
    /// Persist the current channel/session identity.
    fn persist_channel(&mut self);
    /// Non-blocking poll for the next inbox message.
    fn poll_message(&mut self) -> InboxMessage;
}

// ───────────────────────────────────────────────────────────────
// Motion port (domain → servo trajectory player)
// ───────────────────────────────────────────────────────────────

/// Where the trajectory player takes its motion steps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectorySource {
    /// Steps streamed in real time over the push session.
    Realtime,
}

pub trait MotionPort {
    fn begin(&mut self, source: TrajectorySource);
    /// Advance the current motion step to `now_ms`.
    fn advance(&mut self, now_ms: u32);
    fn trajectory_finished(&self) -> bool;
    fn step_finished(&self) -> bool;
    fn start_next_step(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Signal port (domain → action runner)
// ───────────────────────────────────────────────────────────────

/// Outbound signals for the action runner.
pub trait SignalPort {
    fn emit(&mut self, signal: Signal);
}

// ───────────────────────────────────────────────────────────────
// Sound port (domain → content fetcher)
// ───────────────────────────────────────────────────────────────

/// Fetch the current sound into local storage.  Blocks until done.
pub trait SoundPort {
    /// `true` when a complete file is on storage.
    fn fetch_sound(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Free-running millisecond counter.  Wraps at `u32::MAX`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Device bundle consumed by the state handlers
// ───────────────────────────────────────────────────────────────

/// Every device-facing port the behaviour engine drives.
///
/// State handlers are plain `fn` pointers, so they receive the bundle as
/// `&mut dyn DevicePorts`.  Implemented automatically for any type that
/// implements all the member ports.
pub trait DevicePorts:
    IndicatorPort + InboxPort + MotionPort + SignalPort + SoundPort + ClockPort
{
}

impl<T> DevicePorts for T where
    T: IndicatorPort + InboxPort + MotionPort + SignalPort + SoundPort + ClockPort
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Backend, settings, network and storage ports (content fetcher)
// ───────────────────────────────────────────────────────────────

/// Call/response access to the device backend API.
pub trait BackendPort {
    fn connect(&mut self) -> bool;
    /// Call `method` with a single `key=value` argument.  The reply stays
    /// readable through [`read_field`](Self::read_field) until the next call.
    fn invoke(&mut self, method: &str, key: &str, value: &str) -> bool;
    fn read_field(&self, key: &str) -> Option<String>;
}

/// Read-only persistent settings.
pub trait SettingsPort {
    fn get(&self, name: &str) -> Option<String>;
}

/// Byte-range HTTP access to a file host.
pub trait RangeClientPort {
    fn connect(&mut self, host: &str) -> bool;
    /// Total content length, 0 when unknown or on failure.
    fn probe_length(&mut self, host: &str, path: &str) -> u64;
    /// Fetch `range` (inclusive) into `buf`, returning the bytes written.
    /// Implementations must fail rather than return a short read.
    fn get_range(
        &mut self,
        host: &str,
        path: &str,
        range: ByteRange,
        buf: &mut [u8],
    ) -> Result<usize, NetError>;
}

/// Local file storage (SD card).  One open file at a time.
pub trait FileStoragePort {
    fn init(&mut self) -> Result<(), StorageError>;
    fn exists(&self, path: &str) -> bool;
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;
    /// Create (truncate) `path` and make it the open file.
    fn create(&mut self, path: &str) -> Result<(), StorageError>;
    fn append(&mut self, data: &[u8]) -> Result<(), StorageError>;
    fn sync(&mut self) -> Result<(), StorageError>;
    fn close(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from config persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`FileStoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Medium missing or not mounted.
    NotReady,
    /// Requested file does not exist.
    NotFound,
    /// No file is open.
    NotOpen,
    /// Medium is full.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`RangeClientPort::get_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// Not connected to the host.
    NotConnected,
    /// Non-success HTTP status (an expired link typically shows up as 403/404).
    Status(u16),
    /// Body shorter than the requested range.
    ShortRead,
    /// Range larger than the transfer buffer.
    BufferTooSmall,
    /// Socket/transport failure.
    Io,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotReady => write!(f, "storage not ready"),
            Self::NotFound => write!(f, "file not found"),
            Self::NotOpen => write!(f, "no open file"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for NetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::ShortRead => write!(f, "short read"),
            Self::BufferTooSmall => write!(f, "range exceeds buffer"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}
