//! Retry policy for range requests.
//!
//! A failing range is retried in place up to `attempts_before_relink`
//! times; after that the download link is assumed expired and the
//! fetcher relinks.  [`RetryPolicy::max_relinks`] caps how often that may
//! happen within one fetch (`None` keeps going forever).
//!
//! The wait after the `n`th consecutive failure is `first × factor^n`,
//! clamped to `max`.  The base is derived from the attempt number alone.

use crate::config::FetchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts_before_relink: u8,
    pub max_relinks: Option<u32>,
    pub backoff: Backoff,
}

/// Integer exponential backoff in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub first_ms: u32,
    pub max_ms: u32,
    pub factor: u32,
}

impl Backoff {
    /// No waiting at all.
    pub const NONE: Self = Self {
        first_ms: 0,
        max_ms: 0,
        factor: 1,
    };

    /// Delay for the given attempt (0-indexed).  Saturates instead of
    /// overflowing.
    pub fn delay_ms(&self, attempt: u32) -> u32 {
        let mut delay = self.first_ms.min(self.max_ms);
        for _ in 0..attempt {
            if delay >= self.max_ms {
                break;
            }
            delay = delay.saturating_mul(self.factor).min(self.max_ms);
        }
        delay
    }
}

impl RetryPolicy {
    /// Whether another relink is allowed after `done` relinks.
    pub fn may_relink(&self, done: u32) -> bool {
        self.max_relinks.is_none_or(|cap| done < cap)
    }

    /// `true` once `failures` consecutive failures call for a relink.
    pub fn should_relink(&self, failures: u32) -> bool {
        failures >= u32::from(self.attempts_before_relink)
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            attempts_before_relink: cfg.attempts_before_relink,
            max_relinks: cfg.max_relinks,
            backoff: Backoff {
                first_ms: cfg.backoff_first_ms,
                max_ms: cfg.backoff_max_ms,
                factor: cfg.backoff_factor,
            },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}
