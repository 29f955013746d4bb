//! # zbswitch - string-configured Zigbee switch/relay firmware core
//!
//! One firmware image serves many wall switches and relay modules. Which pins
//! are buttons, switches, LEDs and relays is described by a short
//! configuration string kept in non-volatile storage:
//!
//! ```text
//! Acme;ACME-1;SB0u;RA0A1;IC2;
//! ```
//!
//! This crate compiles that string into peripheral descriptors and a
//! protocol-facing endpoint/cluster topology, and runs the I/O at runtime.
//! It is designed for embedded systems and supports `no_std` environments.
//!
//! ## Features
//!
//! ### Configuration compiler
//! - **In-place tokenizer**: splits the stored string without copying and
//!   restores it afterwards
//! - **Descriptor builder**: bounded, typed peripheral arrays; overflow is an
//!   explicit error
//! - **Topology assembler**: one endpoint per switch and relay
//!
//! ### Runtime
//! - **Latching relay pulse arbiter**: one coil pulse in flight at a time
//! - **Debounced interrupt dispatcher**: one settled notification per burst
//!   of contact bounce
//! - **Indicators, buttons, resets** and NV housekeeping
//!
//! ## Usage
//!
//! ```rust
//! use zbswitch::config::{self, ConfigBuffer};
//!
//! let mut buffer = ConfigBuffer::from_bytes(b"Acme;ACME-1;R A0A1;S B0u;").unwrap();
//! let compiled = config::compile(&mut buffer).unwrap();
//!
//! let relay = &compiled.config.relays[0];
//! assert!(relay.is_latching());
//! assert_eq!(compiled.topology.endpoints().len(), 2);
//! ```
//!
//! The platform implements the collaborator traits in [`hal`] and
//! [`storage::KeyValueStore`], boots a [`device::Device`] and forwards
//! interrupts, fired tasks and network status changes to it.
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

/// Collaborator traits implemented by the target platform.
pub mod hal;

/// Non-volatile key/value storage and persisted records.
pub mod storage;

/// Configuration string compiler.
pub mod config;

/// Endpoint/cluster layout handed to the network stack.
pub mod topology;

/// Relays and the latching pulse arbiter.
pub mod relay;

/// Debounced pin interrupt dispatcher.
pub mod interrupts;

/// Button and switch input handling.
pub mod buttons;

/// LED outputs.
pub mod indicator;

/// Resets and boot-time storage checks.
pub mod system;

/// Boot orchestration and runtime routing.
pub mod device;
