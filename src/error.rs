//! Error types for the Deskmate core.
//!
//! The behaviour engine never fails: collaborator problems turn into fault
//! indications.  The sound fetcher is the only fallible core operation, and
//! every way it can fail funnels into [`FetchError`].  All variants are
//! `Copy` so they can be logged and passed back through ports without
//! allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

/// Why a sound fetch gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    /// Backend connect or call failed.
    BackendUnavailable,
    /// The owner key is not present in the settings store.
    MissingSetting,
    /// The backend reply lacked a required field.
    MissingField(&'static str),
    /// A backend field does not fit its bounded buffer.
    FieldTooLong(&'static str),
    /// Could not open a connection to the file host.
    HostUnreachable,
    /// The size probe reported zero bytes.
    EmptyContent,
    /// The size probe reported more pieces than a `u32` can count.
    ContentTooLarge,
    /// Local storage failed.
    Storage(StorageError),
    /// Fetching a fresh link or reconnecting after link expiry failed.
    RelinkFailed,
    /// The relink budget ran out on one piece.
    RetriesExhausted { piece: u32 },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable => write!(f, "backend unavailable"),
            Self::MissingSetting => write!(f, "owner setting missing"),
            Self::MissingField(key) => write!(f, "backend reply missing '{key}'"),
            Self::FieldTooLong(key) => write!(f, "'{key}' exceeds its buffer"),
            Self::HostUnreachable => write!(f, "file host unreachable"),
            Self::EmptyContent => write!(f, "remote content is empty"),
            Self::ContentTooLarge => write!(f, "remote content too large to fetch"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::RelinkFailed => write!(f, "relink failed"),
            Self::RetriesExhausted { piece } => {
                write!(f, "retries exhausted on piece {piece}")
            }
        }
    }
}

impl From<StorageError> for FetchError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Fetch `Result` alias.
pub type Result<T> = core::result::Result<T, FetchError>;
