//! System configuration parameters
//!
//! All tunable parameters for the Deskmate core.
//! Values can be overridden by a config blob in the settings store.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::timer::{MAX_INTERVAL_MS, Service};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SystemConfig {
    /// How often each remote service is checked.
    pub intervals: CheckIntervals,
    /// Piecewise download tuning.
    pub fetch: FetchConfig,
}

/// Per-service check intervals, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIntervals {
    pub social_feed_ms: u32,
    pub mailbox_ms: u32,
    pub microblog_ms: u32,
    pub rss_ms: u32,
    pub check_in_ms: u32,
    pub sound_ms: u32,
}

impl CheckIntervals {
    pub const fn get(&self, service: Service) -> u32 {
        match service {
            Service::SocialFeed => self.social_feed_ms,
            Service::Mailbox => self.mailbox_ms,
            Service::Microblog => self.microblog_ms,
            Service::Rss => self.rss_ms,
            Service::CheckIn => self.check_in_ms,
            Service::Sound => self.sound_ms,
        }
    }
}

impl Default for CheckIntervals {
    fn default() -> Self {
        Self {
            social_feed_ms: 480_000, // 8 min
            mailbox_ms: 480_000,
            microblog_ms: 480_000,
            rss_ms: 480_000,
            check_in_ms: 480_000,
            sound_ms: 3_600_000, // 1 h
        }
    }
}

/// Download tuning for the sound fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Transfer buffer size; also the piece size.
    pub buffer_size: u32,
    /// Consecutive failures on one range before the link is considered expired.
    pub attempts_before_relink: u8,
    /// Relink cap for one fetch.  `None` retries forever.
    pub max_relinks: Option<u32>,
    /// First backoff delay after a failed range request.
    pub backoff_first_ms: u32,
    /// Backoff ceiling.
    pub backoff_max_ms: u32,
    /// Multiplicative growth per consecutive failure.
    pub backoff_factor: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            buffer_size: 512,
            attempts_before_relink: 3,
            max_relinks: Some(8),
            backoff_first_ms: 100,
            backoff_max_ms: 5_000,
            backoff_factor: 2,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for service in Service::PRIORITY {
            let iv = self.intervals.get(service);
            if iv == 0 {
                return Err(ConfigError::ValidationFailed("check interval must be non-zero"));
            }
            if iv > MAX_INTERVAL_MS {
                return Err(ConfigError::ValidationFailed(
                    "check interval exceeds wrap-safe range (2^31 ms)",
                ));
            }
        }
        let f = &self.fetch;
        if f.buffer_size == 0 {
            return Err(ConfigError::ValidationFailed("buffer_size must be non-zero"));
        }
        if f.attempts_before_relink == 0 {
            return Err(ConfigError::ValidationFailed(
                "attempts_before_relink must be at least 1",
            ));
        }
        if f.backoff_first_ms > f.backoff_max_ms {
            return Err(ConfigError::ValidationFailed(
                "backoff_first_ms must not exceed backoff_max_ms",
            ));
        }
        if f.backoff_factor == 0 {
            return Err(ConfigError::ValidationFailed("backoff_factor must be non-zero"));
        }
        Ok(())
    }

    /// Encode as a compact blob for the settings store.
    pub fn to_blob(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)
    }

    /// Decode and validate a stored blob.
    pub fn from_blob(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
