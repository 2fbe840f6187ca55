//! Deskmate device core.
//!
//! Exposes the behaviour engine, the sound fetcher and their adapters for
//! integration testing and for the firmware binary.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod fsm;
pub mod timer;

pub mod adapters;
