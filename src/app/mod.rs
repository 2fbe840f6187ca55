//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the behaviour rules for the Deskmate device:
//! the FSM orchestration and the events it reports.  All interaction with
//! hardware and the network happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
