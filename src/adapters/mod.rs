//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements        | Connects to                  |
//! |---------------|-------------------|------------------------------|
//! | `delay`       | DelayNs           | `std::thread::sleep`         |
//! | `fs_storage`  | FileStoragePort   | SD card VFS / host directory |
//! | `http`        | BackendPort       | Backend JSON API (ureq)      |
//! |               | RangeClientPort   | File host `Range:` GETs      |
//! | `log_sink`    | EventSink         | Serial log output            |
//! | `settings`    | SettingsPort      | NVS / in-memory store        |
//! | `sound`       | SoundPort         | ContentFetcher               |
//! | `status_led`  | IndicatorPort     | Three PWM channels           |
//! | `time`        | ClockPort         | ESP32 system timer           |

pub mod delay;
pub mod fs_storage;
#[cfg(not(target_os = "espidf"))]
pub mod http;
pub mod log_sink;
pub mod settings;
pub mod sound;
pub mod status_led;
pub mod time;
