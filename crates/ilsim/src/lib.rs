// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ilsim - IL-series sensor bus simulator
//!
//! A faithful network-level simulator of a multi-drop laser displacement
//! sensor bus: one communication unit fronting up to fifteen
//! sensor-amplifier units. Clients speak the ASCII command protocol over
//! TCP and receive replies that are bit-exact with the real device
//! family, making the simulator a drop-in stand-in for integration
//! testing of client software.
//!
//! ## Quick start
//!
//! ```rust
//! use ilsim::amplifier::Amplifier;
//! use ilsim::bus::CommunicationUnit;
//! use ilsim::head::{HeadModel, HeadProfile};
//! use ilsim::protocol;
//!
//! let mut bus = CommunicationUnit::new();
//! bus.add_unit(Amplifier::new(HeadProfile::for_model(HeadModel::Il030)));
//!
//! let reply = protocol::handle_query(&bus, "SR,01,037\r\n");
//! assert_eq!(reply, "SR,01,037,+000000000\r\n");
//! # bus.stop_workers();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                     TCP front end (ilsim-server)             |
//! |       one line in, one line out, per-connection tasks        |
//! +--------------------------------------------------------------+
//! |                    protocol engine (protocol)                |
//! |     lexer | dispatch to bus or amplifier | ER mapping        |
//! +--------------------------------------------------------------+
//! |   communication unit (bus)    |    amplifiers (amplifier)    |
//! |   global registers 0..=1179   |    registers 0..=223,        |
//! |   per-sensor aggregation      |    pipeline + hold machine   |
//! +--------------------------------------------------------------+
//! ```
//!
//! Each amplifier runs the four-stage measurement cascade
//! raw -> R.V. -> CALC -> P.V. plus two background workers (EEPROM
//! deadline observer and external-input observer). The first amplifier
//! on the bus is the main unit; the second, if present, is its
//! expansion partner for the CALC stage.

/// Sensor-amplifier model: register file, measurement pipeline, hold
/// state machine, background workers.
pub mod amplifier;
/// Banked parameter sets (thresholds, shift target, analog limits).
pub mod bank;
/// Communication unit and its global register space.
pub mod bus;
/// Fixed-point wire codec and sentinel constants.
pub mod codec;
/// JSON configuration loading and bus construction.
pub mod config;
/// Wire, bus and amplifier error types.
pub mod errors;
/// Sensor-head catalog and per-head constant tables.
pub mod head;
/// ASCII line protocol engine.
pub mod protocol;

pub use amplifier::Amplifier;
pub use bus::CommunicationUnit;
pub use config::SimulatorConfig;
pub use errors::{AmpError, BusErrorCode, WireError, WireResult};
pub use head::{HeadModel, HeadProfile};
