//! # Non-volatile key/value storage
//!
//! The device keeps a handful of small items in a byte-addressed key/value
//! store: the configuration string, per-cluster settings, the NV layout
//! version and the device role. This module defines the collaborator trait
//! for that store, the item keys, typed record helpers and an in-memory
//! implementation for host builds and tests.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Config string  │    │  Typed records  │    │   Migrations    │
//! │   (raw bytes)   │    │ (JSON + CRC-32) │    │  (version, role)│
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!           │                        │                        │
//!           ▼                        ▼                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  KeyValueStore (platform NVM)                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage Examples
//!
//! ```rust
//! use zbswitch::storage::{items, KeyValueStore, MemoryStore};
//!
//! let mut store: MemoryStore<8, 64> = MemoryStore::new();
//! store.write(items::DEVICE_CONFIG, b"Acme;ACME-1;").unwrap();
//!
//! let mut buf = [0u8; 64];
//! let len = store.read(items::DEVICE_CONFIG, &mut buf).unwrap();
//! assert_eq!(&buf[..len], b"Acme;ACME-1;");
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

use heapless::{FnvIndexMap, Vec};

/// Common error types for storage operations
pub mod error;

/// Typed records persisted as JSON with a CRC-32 trailer.
pub mod records;

pub use error::Error;

/// Keys of the items this crate keeps in the store.
pub mod items {
    use crate::config::device::MAX_SWITCHES;

    /// Layout version of the stored items.
    pub const VERSION: u16 = 1;
    /// Raw configuration string.
    pub const DEVICE_CONFIG: u16 = 2;
    /// Basic cluster settings.
    pub const BASIC_CLUSTER_DATA: u16 = 3;
    /// Device role (router / end device).
    pub const DEVICE_TYPE: u16 = 32;

    /// Settings of the switch with the given zero-based index.
    pub const fn switch_cluster_data(switch_idx: u8) -> u16 {
        BASIC_CLUSTER_DATA + 1 + switch_idx as u16
    }

    /// Settings of the relay with the given zero-based index.
    pub const fn relay_cluster_data(relay_idx: u8) -> u16 {
        BASIC_CLUSTER_DATA + MAX_SWITCHES as u16 + 1 + relay_idx as u16
    }
}

/// Byte-addressed key/value store provided by the platform.
///
/// Items are opaque byte strings of bounded size. Implementations are expected
/// to be reliable and already initialized; failures are reported and handled
/// as soft errors by the callers in this crate.
///
/// # Examples
///
/// ```rust,no_run
/// use zbswitch::storage::{Error, KeyValueStore};
///
/// fn read_version<S: KeyValueStore>(store: &mut S) -> Result<u16, Error> {
///     let mut bytes = [0u8; 2];
///     let len = store.read(1, &mut bytes)?;
///     if len != 2 {
///         return Err(Error::SizeMismatch);
///     }
///     Ok(u16::from_le_bytes(bytes))
/// }
/// ```
pub trait KeyValueStore {
    /// Read the item stored under `key` into `bytes`.
    ///
    /// Returns the length of the stored item.
    ///
    /// # Errors
    ///
    /// - `NotFound` if nothing is stored under `key`
    /// - `SizeMismatch` if the item is longer than `bytes`
    /// - `ReadError` if the underlying memory could not be read
    fn read(&mut self, key: u16, bytes: &mut [u8]) -> Result<usize, Error>;

    /// Store `bytes` under `key`, replacing any previous item.
    ///
    /// # Errors
    ///
    /// - `Full` if the store has no room for the item
    /// - `WriteError` if the underlying memory could not be written
    fn write(&mut self, key: u16, bytes: &[u8]) -> Result<(), Error>;

    /// Erase every item.
    fn clear_all(&mut self) -> Result<(), Error>;
}

/// RAM-backed [`KeyValueStore`].
///
/// Holds up to `KEYS` items of at most `SIZE` bytes each. `KEYS` must be a
/// power of two.
#[derive(Debug)]
pub struct MemoryStore<const KEYS: usize, const SIZE: usize> {
    items: FnvIndexMap<u16, Vec<u8, SIZE>, KEYS>,
}

impl<const KEYS: usize, const SIZE: usize> MemoryStore<KEYS, SIZE> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            items: FnvIndexMap::new(),
        }
    }

    /// Whether an item is stored under `key`.
    pub fn contains(&self, key: u16) -> bool {
        self.items.contains_key(&key)
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<const KEYS: usize, const SIZE: usize> Default for MemoryStore<KEYS, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const KEYS: usize, const SIZE: usize> KeyValueStore for MemoryStore<KEYS, SIZE> {
    fn read(&mut self, key: u16, bytes: &mut [u8]) -> Result<usize, Error> {
        let item = self.items.get(&key).ok_or(Error::NotFound)?;
        if item.len() > bytes.len() {
            return Err(Error::SizeMismatch);
        }
        bytes[..item.len()].copy_from_slice(item);
        Ok(item.len())
    }

    fn write(&mut self, key: u16, bytes: &[u8]) -> Result<(), Error> {
        let item = Vec::from_slice(bytes).map_err(|_| Error::Full)?;
        // Replace in place: the map refuses inserts once full, even for known keys.
        if let Some(slot) = self.items.get_mut(&key) {
            *slot = item;
            return Ok(());
        }
        self.items.insert(key, item).map_err(|_| Error::Full)?;
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), Error> {
        self.items.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests;
