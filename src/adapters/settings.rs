//! Settings store adapter (NVS on the device).
//!
//! Implements [`SettingsPort`] and persists the [`SystemConfig`] blob.
//!
//! - String settings (owner key, backend credentials) live as NVS strings
//!   in the `deskmate` namespace.
//! - The config is a postcard blob under `syscfg`; it is validated on
//!   both load and save.
//!
//! On the host the same API is backed by in-memory maps.

use anyhow::Result;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, SettingsPort};
use crate::config::SystemConfig;

#[cfg(not(target_os = "espidf"))]
use std::{cell::RefCell, collections::HashMap};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const NAMESPACE: &str = "deskmate";
const CONFIG_KEY: &str = "syscfg";

/// NVS keys are at most 15 bytes plus NUL.
const MAX_KEY_LEN: usize = 15;
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_VALUE_LEN: usize = 512;
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsSettings {
    #[cfg(not(target_os = "espidf"))]
    strings: RefCell<HashMap<String, String>>,
    #[cfg(not(target_os = "espidf"))]
    blobs: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsSettings {
    /// Initialise NVS flash.  On first boot or after a version mismatch the
    /// partition is erased and re-initialised.
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS
            // access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NvsSettings: erasing and re-initialising flash partition");
                esp_check(unsafe { nvs_flash_erase() })
                    .map_err(|e| anyhow::anyhow!("nvs_flash_erase failed: {e}"))?;
                esp_check(unsafe { nvs_flash_init() })
                    .map_err(|e| anyhow::anyhow!("nvs_flash_init failed: {e}"))?;
            } else {
                esp_check(ret).map_err(|e| anyhow::anyhow!("nvs_flash_init failed: {e}"))?;
            }
            info!("NvsSettings: ESP-IDF NVS initialised");
            Ok(Self {})
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsSettings: simulation backend");
            Ok(Self {
                strings: RefCell::new(HashMap::new()),
                blobs: RefCell::new(HashMap::new()),
            })
        }
    }

    /// Host-only convenience for tests and simulation.
    #[cfg(not(target_os = "espidf"))]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let strings = entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self {
            strings: RefCell::new(strings),
            blobs: RefCell::new(HashMap::new()),
        }
    }

    /// Store a string setting.
    pub fn set(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        if name.len() > MAX_KEY_LEN {
            return Err(ConfigError::ValidationFailed("setting name exceeds 15 bytes"));
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.strings
                .borrow_mut()
                .insert(name.to_owned(), value.to_owned());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            if value.len() >= MAX_VALUE_LEN {
                return Err(ConfigError::ValidationFailed("setting value too long"));
            }
            let key = c_key(name);
            let mut val = [0u8; MAX_VALUE_LEN];
            val[..value.len()].copy_from_slice(value.as_bytes());
            with_nvs_handle(true, |handle| {
                esp_check(unsafe {
                    nvs_set_str(handle, key.as_ptr() as *const _, val.as_ptr() as *const _)
                })?;
                esp_check(unsafe { nvs_commit(handle) })
            })
            .map_err(|e| {
                warn!("NvsSettings: write of '{name}' failed ({e})");
                ConfigError::IoError
            })
        }
    }

    /// Load the persisted config; defaults on first boot.
    pub fn load_config(&self) -> Result<SystemConfig, ConfigError> {
        match self.read_blob(CONFIG_KEY) {
            Ok(bytes) => {
                let cfg = SystemConfig::from_blob(&bytes)?;
                info!("NvsSettings: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Err(ConfigError::NotFound) => {
                info!("NvsSettings: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Validate and persist `config`.
    pub fn save_config(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = config.to_blob()?;
        self.write_blob(CONFIG_KEY, &bytes)?;
        info!("NvsSettings: config saved ({} bytes)", bytes.len());
        Ok(())
    }

    // -- Blob storage ------------------------------------------------------

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.blobs
            .borrow()
            .get(key)
            .cloned()
            .ok_or(ConfigError::NotFound)
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.blobs.borrow_mut().insert(key.to_owned(), data.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let k = c_key(key);
        let result = with_nvs_handle(false, |handle| {
            let mut size: usize = 0;
            esp_check(unsafe {
                nvs_get_blob(handle, k.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
            })?;
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as esp_err_t);
            }
            let mut buf = vec![0u8; size];
            esp_check(unsafe {
                nvs_get_blob(
                    handle,
                    k.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            })?;
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND as esp_err_t => Err(ConfigError::NotFound),
            Err(e) => {
                warn!("NvsSettings: blob read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let k = c_key(key);
        with_nvs_handle(true, |handle| {
            esp_check(unsafe {
                nvs_set_blob(handle, k.as_ptr() as *const _, data.as_ptr() as *const _, data.len())
            })?;
            esp_check(unsafe { nvs_commit(handle) })
        })
        .map_err(|e| {
            warn!("NvsSettings: blob write error {}", e);
            ConfigError::IoError
        })
    }
}

impl SettingsPort for NvsSettings {
    #[cfg(not(target_os = "espidf"))]
    fn get(&self, name: &str) -> Option<String> {
        self.strings.borrow().get(name).cloned()
    }

    #[cfg(target_os = "espidf")]
    fn get(&self, name: &str) -> Option<String> {
        let key = c_key(name);
        with_nvs_handle(false, |handle| {
            let mut buf = [0u8; MAX_VALUE_LEN];
            let mut len = buf.len();
            esp_check(unsafe {
                nvs_get_str(
                    handle,
                    key.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut len,
                )
            })?;
            // `len` includes the trailing NUL.
            let text = core::str::from_utf8(&buf[..len.saturating_sub(1)])
                .map_err(|_| ESP_ERR_NVS_INVALID_LENGTH as esp_err_t)?;
            Ok(text.to_owned())
        })
        .ok()
    }
}

// ── ESP-IDF helpers ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn c_key(key: &str) -> [u8; MAX_KEY_LEN + 1] {
    let mut buf = [0u8; MAX_KEY_LEN + 1];
    let bytes = key.as_bytes();
    let len = bytes.len().min(MAX_KEY_LEN);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

#[cfg(target_os = "espidf")]
fn esp_check(ret: esp_err_t) -> core::result::Result<(), esp_err_t> {
    if ret == ESP_OK as esp_err_t { Ok(()) } else { Err(ret) }
}

/// Open the namespace, run `f` with the handle, then close.
#[cfg(target_os = "espidf")]
fn with_nvs_handle<F, T>(write: bool, f: F) -> core::result::Result<T, esp_err_t>
where
    F: FnOnce(nvs_handle_t) -> core::result::Result<T, esp_err_t>,
{
    let ns = c_key(NAMESPACE);
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };
    let mut handle: nvs_handle_t = 0;
    esp_check(unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) })?;
    let result = f(handle);
    unsafe { nvs_close(handle) };
    result
}
