//! # Configuration compiler
//!
//! The whole I/O personality of the device is a single `;`-delimited string:
//!
//! ```text
//! <manufacturer>;<model>;[<token>;]*
//! ```
//!
//! Compiling it runs three stages over one buffer:
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  EntryReader    │───▶│  DeviceConfig   │───▶│    Topology     │
//! │ (in place, ';'  │    │ (descriptors in │    │ (endpoints and  │
//! │  → terminator)  │    │ bounded arrays) │    │   clusters)     │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!          │                                             │
//!          └────────── ConfigBuffer::restore ◀───────────┘
//! ```
//!
//! The buffer is tokenized destructively and restored afterwards, so the
//! original string stays available as attribute data.
//!
//! ## Example
//!
//! ```rust
//! use zbswitch::config::{self, ConfigBuffer};
//!
//! let mut buffer = ConfigBuffer::from_bytes(b"Acme;ACME-1;RA0A1;SB0u;").unwrap();
//! let compiled = config::compile(&mut buffer).unwrap();
//!
//! assert_eq!(compiled.config.relays.len(), 1);
//! assert_eq!(compiled.config.switches.len(), 1);
//! assert_eq!(compiled.topology.endpoints().len(), 2);
//! assert_eq!(buffer.as_bytes(), b"Acme;ACME-1;RA0A1;SB0u;");
//! ```

use heapless::Vec;

pub mod descriptor;
pub mod device;
pub mod error;
pub mod nv;
pub mod tokens;

pub use descriptor::{Flag, PeripheralDescriptor};
pub use device::DeviceConfig;
pub use error::{Capacity, ConfigError};
pub use tokens::{Entry, EntryReader, TERMINATOR};

use crate::topology::Topology;

/// Capacity of the configuration buffer in bytes.
pub const MAX_CONFIG_LEN: usize = 256;

/// Entry delimiter.
pub const DELIMITER: u8 = b';';

/// Configuration used when storage holds none.
pub const DEFAULT_CONFIG: &[u8] = b"unknown;TS0012-CUSTOM;";

/// Owned configuration string.
///
/// Holds raw bytes only up to the first NUL; the NUL byte is reserved as the
/// entry terminator while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBuffer {
    data: Vec<u8, MAX_CONFIG_LEN>,
}

impl ConfigBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// The built-in default configuration.
    pub fn default_config() -> Self {
        let mut buffer = Self::new();
        // DEFAULT_CONFIG is far below MAX_CONFIG_LEN.
        let _ = buffer.data.extend_from_slice(DEFAULT_CONFIG);
        buffer
    }

    /// Copy a configuration string, stopping at the first NUL byte.
    ///
    /// # Errors
    ///
    /// `ConfigTooLong` if the string exceeds [`MAX_CONFIG_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let len = bytes
            .iter()
            .position(|&b| b == TERMINATOR)
            .unwrap_or(bytes.len());
        let data = Vec::from_slice(&bytes[..len]).map_err(|_| ConfigError::ConfigTooLong(len))?;
        Ok(Self { data })
    }

    /// The raw string.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The string as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.data).ok()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no configuration.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Start tokenizing the buffer in place.
    pub fn entries(&mut self) -> EntryReader<'_> {
        EntryReader::new(&mut self.data, DELIMITER)
    }

    /// Put back every delimiter the reader replaced, scanning backwards from
    /// `cursor` to the start of the buffer.
    pub fn restore(&mut self, cursor: usize) {
        let end = cursor.min(self.data.len());
        for byte in self.data[..end].iter_mut().rev() {
            if *byte == TERMINATOR {
                *byte = DELIMITER;
            }
        }
    }
}

impl Default for ConfigBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// Peripheral descriptors.
    pub config: DeviceConfig,
    /// Protocol-facing endpoint/cluster layout.
    pub topology: Topology,
}

/// Compile a configuration string into peripheral descriptors and topology.
///
/// The buffer is byte-identical afterwards, on success and on error.
///
/// # Errors
///
/// Any [`ConfigError`] raised by [`DeviceConfig::build`] or
/// [`Topology::assemble`]. All of them are fatal at boot.
pub fn compile(buffer: &mut ConfigBuffer) -> Result<Compiled, ConfigError> {
    let mut reader = buffer.entries();
    let built = DeviceConfig::build(&mut reader);
    let cursor = reader.cursor();

    let result = built.and_then(|config| {
        let topology = Topology::assemble(&config)?;
        Ok(Compiled { config, topology })
    });

    buffer.restore(cursor);

    if let Ok(compiled) = &result {
        info!(
            "config: {} switches, {} relays, {} endpoints",
            compiled.config.switches.len(),
            compiled.config.relays.len(),
            compiled.topology.endpoints().len()
        );
    }
    result
}
