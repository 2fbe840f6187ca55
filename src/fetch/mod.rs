//! Piecewise sound download.
//!
//! [`ContentFetcher`] asks the backend where the current sound lives, then
//! pulls it from the file host one buffer-sized byte range at a time and
//! appends every piece to local storage before requesting the next one.
//!
//! ```text
//! settings ─owner─▶ backend ─host,name,url─▶ range client ─piece─▶ storage
//!                      ▲                          │
//!                      └──── relink (fresh url) ◀─┘  N failures on one range
//! ```
//!
//! Download links expire.  When the same range fails
//! `attempts_before_relink` times in a row the fetcher asks the backend
//! again with the same owner key, swaps in the fresh `url` (the host is
//! kept), reconnects, and retries the same range.  A fetch that fails
//! after the target file was created removes the partial file.

pub mod pieces;
pub mod retry;

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{BackendPort, FileStoragePort, RangeClientPort, SettingsPort};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};

use pieces::PiecePlan;
use retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Backend contract
// ---------------------------------------------------------------------------

/// Backend method returning the latest sound's location.
pub const API_METHOD: &str = "soundcloud/update";
pub const OWNER_KEY: &str = "owner";
pub const HOST_KEY: &str = "host";
pub const NAME_KEY: &str = "name";
pub const URL_KEY: &str = "url";

/// Settings entry holding the owner key, unless overridden.
pub const DEFAULT_OWNER_SETTING: &str = "owner";

pub const HOST_CAP: usize = 128;
pub const PATH_CAP: usize = 256;
/// `folder/name` on local storage.
pub const TARGET_CAP: usize = 64;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Summary of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub bytes: u64,
    pub pieces: u32,
    pub relinks: u32,
    /// Failed range requests, across all pieces.
    pub retries: u32,
    /// Local path of the written file.
    pub path: String,
}

/// Where one download comes from and goes to.
struct Session {
    owner: String,
    host: heapless::String<HOST_CAP>,
    path: heapless::String<PATH_CAP>,
    target: heapless::String<TARGET_CAP>,
}

#[derive(Default)]
struct Progress {
    relinks: u32,
    retries: u32,
}

// ---------------------------------------------------------------------------
// ContentFetcher
// ---------------------------------------------------------------------------

pub struct ContentFetcher<B, S, R, F, D> {
    backend: B,
    settings: S,
    client: R,
    storage: F,
    delay: D,
    policy: RetryPolicy,
    owner_setting: &'static str,
    buffer: Vec<u8>,
}

impl<B, S, R, F, D> ContentFetcher<B, S, R, F, D>
where
    B: BackendPort,
    S: SettingsPort,
    R: RangeClientPort,
    F: FileStoragePort,
    D: DelayNs,
{
    /// The transfer buffer (`cfg.buffer_size` bytes) is allocated here and
    /// reused for every fetch.
    pub fn new(backend: B, settings: S, client: R, storage: F, delay: D, cfg: &FetchConfig) -> Self {
        Self {
            backend,
            settings,
            client,
            storage,
            delay,
            policy: RetryPolicy::from(cfg),
            owner_setting: DEFAULT_OWNER_SETTING,
            buffer: vec![0; cfg.buffer_size as usize],
        }
    }

    /// Read the owner key from a different settings entry.
    pub fn with_owner_setting(mut self, name: &'static str) -> Self {
        self.owner_setting = name;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn client(&self) -> &R {
        &self.client
    }

    pub fn storage(&self) -> &F {
        &self.storage
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Download the current sound into `folder`.
    pub fn fetch(&mut self, folder: &str) -> Result<FetchReport> {
        let owner = self
            .settings
            .get(self.owner_setting)
            .ok_or(FetchError::MissingSetting)?;
        let mut session = self.open_session(owner, folder)?;
        info!("fetch: {} from {}", session.target, session.host);

        if !self.client.connect(&session.host) {
            return Err(FetchError::HostUnreachable);
        }
        let total = self.client.probe_length(&session.host, &session.path);
        if total == 0 {
            return Err(FetchError::EmptyContent);
        }
        let plan =
            PiecePlan::new(total, self.buffer.len() as u32).ok_or(FetchError::ContentTooLarge)?;

        self.storage.init()?;
        if self.storage.exists(&session.target) {
            self.storage.remove(&session.target)?;
        }
        self.storage.create(&session.target)?;

        let outcome = self
            .download(&mut session, &plan)
            .and_then(|progress| {
                self.storage.close()?;
                Ok(progress)
            });

        match outcome {
            Ok(progress) => {
                info!(
                    "fetch: {} complete ({} bytes, {} pieces, {} relinks)",
                    session.target,
                    plan.total(),
                    plan.count(),
                    progress.relinks
                );
                Ok(FetchReport {
                    bytes: plan.total(),
                    pieces: plan.count(),
                    relinks: progress.relinks,
                    retries: progress.retries,
                    path: session.target.as_str().into(),
                })
            }
            Err(e) => {
                warn!("fetch: {} failed: {}", session.target, e);
                self.discard(&session.target);
                Err(e)
            }
        }
    }

    // -- Internal ----------------------------------------------------------

    fn open_session(&mut self, owner: String, folder: &str) -> Result<Session> {
        self.query_backend(&owner)?;
        let host = self.field::<HOST_CAP>(HOST_KEY)?;
        let name = self.field::<TARGET_CAP>(NAME_KEY)?;
        let target = target_path(folder, &name)?;
        let path = self.field::<PATH_CAP>(URL_KEY)?;
        Ok(Session {
            owner,
            host,
            path,
            target,
        })
    }

    fn query_backend(&mut self, owner: &str) -> Result<()> {
        if !self.backend.connect() {
            return Err(FetchError::BackendUnavailable);
        }
        if !self.backend.invoke(API_METHOD, OWNER_KEY, owner) {
            return Err(FetchError::BackendUnavailable);
        }
        Ok(())
    }

    fn field<const N: usize>(&self, key: &'static str) -> Result<heapless::String<N>> {
        let value = self
            .backend
            .read_field(key)
            .filter(|v| !v.is_empty())
            .ok_or(FetchError::MissingField(key))?;
        bounded(key, &value)
    }

    fn download(&mut self, session: &mut Session, plan: &PiecePlan) -> Result<Progress> {
        let mut progress = Progress::default();

        for (index, range) in (0u32..).zip(plan.iter()) {
            let len = range.len() as usize;
            let mut failures = 0u32;

            loop {
                match self.client.get_range(
                    &session.host,
                    &session.path,
                    range,
                    &mut self.buffer[..len],
                ) {
                    Ok(n) if n == len => break,
                    Ok(n) => warn!("fetch: piece {index} short read ({n}/{len})"),
                    Err(e) => warn!("fetch: piece {index} failed: {e}"),
                }
                failures += 1;
                progress.retries += 1;

                if self.policy.should_relink(failures) {
                    if !self.policy.may_relink(progress.relinks) {
                        return Err(FetchError::RetriesExhausted { piece: index });
                    }
                    self.relink(session)?;
                    progress.relinks += 1;
                    failures = 0;
                } else {
                    self.delay
                        .delay_ms(self.policy.backoff.delay_ms(failures - 1));
                }
            }

            self.storage.append(&self.buffer[..len])?;
            self.storage.sync()?;
            debug!(
                "fetch: piece {}/{} stored, {} bytes remaining",
                index + 1,
                plan.count(),
                plan.remaining_after(index)
            );
        }

        Ok(progress)
    }

    /// Fresh link for the same owner; the host is kept.
    fn relink(&mut self, session: &mut Session) -> Result<()> {
        warn!("fetch: link for {} looks expired, relinking", session.target);
        self.query_backend(&session.owner)
            .map_err(|_| FetchError::RelinkFailed)?;
        session.path = self.field::<PATH_CAP>(URL_KEY).map_err(|e| match e {
            FetchError::FieldTooLong(_) => e,
            _ => FetchError::RelinkFailed,
        })?;
        if !self.client.connect(&session.host) {
            return Err(FetchError::RelinkFailed);
        }
        Ok(())
    }

    fn discard(&mut self, target: &str) {
        // The file may already be closed; only the removal matters.
        let _ = self.storage.close();
        if let Err(e) = self.storage.remove(target) {
            warn!("fetch: could not remove partial {target}: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Bounded strings
// ---------------------------------------------------------------------------

fn bounded<const N: usize>(key: &'static str, value: &str) -> Result<heapless::String<N>> {
    let mut out = heapless::String::new();
    out.push_str(value)
        .map_err(|_| FetchError::FieldTooLong(key))?;
    Ok(out)
}

fn target_path(folder: &str, name: &str) -> Result<heapless::String<TARGET_CAP>> {
    let mut out = heapless::String::new();
    write!(out, "{folder}/{name}").map_err(|_| FetchError::FieldTooLong(NAME_KEY))?;
    Ok(out)
}
