//! Sound fetch bridge.
//!
//! Implements [`SoundPort`] for the behaviour engine by running a
//! [`ContentFetcher`] into a fixed folder.  The engine only needs a
//! boolean; the full [`FetchReport`] / [`FetchError`] is logged here and
//! kept for inspection.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::{BackendPort, FileStoragePort, RangeClientPort, SettingsPort, SoundPort};
use crate::error::FetchError;
use crate::fetch::{ContentFetcher, FetchReport};

/// Folder on local storage that holds the downloaded sound.
pub const DEFAULT_SOUND_FOLDER: &str = "sounds";

pub struct SoundFetcher<B, S, R, F, D> {
    fetcher: ContentFetcher<B, S, R, F, D>,
    folder: &'static str,
    last: Option<Result<FetchReport, FetchError>>,
}

impl<B, S, R, F, D> SoundFetcher<B, S, R, F, D>
where
    B: BackendPort,
    S: SettingsPort,
    R: RangeClientPort,
    F: FileStoragePort,
    D: DelayNs,
{
    pub fn new(fetcher: ContentFetcher<B, S, R, F, D>) -> Self {
        Self::with_folder(fetcher, DEFAULT_SOUND_FOLDER)
    }

    pub fn with_folder(fetcher: ContentFetcher<B, S, R, F, D>, folder: &'static str) -> Self {
        Self {
            fetcher,
            folder,
            last: None,
        }
    }

    /// Outcome of the most recent fetch.
    pub fn last_outcome(&self) -> Option<&Result<FetchReport, FetchError>> {
        self.last.as_ref()
    }

    pub fn fetcher(&self) -> &ContentFetcher<B, S, R, F, D> {
        &self.fetcher
    }
}

impl<B, S, R, F, D> SoundPort for SoundFetcher<B, S, R, F, D>
where
    B: BackendPort,
    S: SettingsPort,
    R: RangeClientPort,
    F: FileStoragePort,
    D: DelayNs,
{
    fn fetch_sound(&mut self) -> bool {
        let outcome = self.fetcher.fetch(self.folder);
        let ok = match &outcome {
            Ok(report) => {
                info!(
                    "SoundFetcher: {} ready ({} bytes, {} retries)",
                    report.path, report.bytes, report.retries
                );
                true
            }
            Err(e) => {
                warn!("SoundFetcher: {}", e);
                false
            }
        };
        self.last = Some(outcome);
        ok
    }
}
