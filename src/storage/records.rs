//! Typed records stored as compact JSON followed by a little-endian CRC-32.
//!
//! ```text
//! ┌──────────────────────────────┬───────────────┐
//! │ {"network_led_on":true}      │ CRC-32 (LE)   │
//! └──────────────────────────────┴───────────────┘
//! ```
//!
//! A record whose checksum does not match, or whose body does not decode into
//! the requested type, reads back as [`Error::Corrupted`].

use super::{Error, KeyValueStore};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Largest serialized record body.
pub const MAX_RECORD_LEN: usize = 128;

const CRC_LEN: usize = 4;

/// Serialize `value` and store it under `key`.
pub fn store<S, T>(store: &mut S, key: u16, value: &T) -> Result<(), Error>
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    let mut buf = [0u8; MAX_RECORD_LEN + CRC_LEN];
    let len = serde_json_core::to_slice(value, &mut buf[..MAX_RECORD_LEN]).map_err(|_| Error::Full)?;
    let crc = crc32fast::hash(&buf[..len]);
    buf[len..len + CRC_LEN].copy_from_slice(&crc.to_le_bytes());
    store.write(key, &buf[..len + CRC_LEN])
}

/// Load and decode the record stored under `key`.
pub fn load<S, T>(store: &mut S, key: u16) -> Result<T, Error>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let mut buf = [0u8; MAX_RECORD_LEN + CRC_LEN];
    let len = store.read(key, &mut buf)?;
    if len < CRC_LEN {
        return Err(Error::Corrupted);
    }
    let (body, trailer) = buf[..len].split_at(len - CRC_LEN);
    let mut crc = [0u8; CRC_LEN];
    crc.copy_from_slice(trailer);
    if crc32fast::hash(body) != u32::from_le_bytes(crc) {
        return Err(Error::Corrupted);
    }
    let (value, _) = serde_json_core::from_slice::<T>(body).map_err(|_| Error::Corrupted)?;
    Ok(value)
}

/// Persisted basic cluster settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicClusterRecord {
    /// State of the dedicated status LED while joined.
    pub network_led_on: bool,
}

/// Persisted NV layout version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Layout version number.
    pub version: u16,
}

/// Persisted device role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypeRecord {
    /// Role code, see [`DeviceType`](crate::system::migrations::DeviceType).
    pub role: u8,
}

/// Persisted state of a relay, restored at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayClusterRecord {
    /// Logical on/off state.
    pub on: bool,
}

/// Persisted runtime settings of a switch.
///
/// Enumerations are kept as their attribute codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchClusterRecord {
    /// Toggle, momentary or normally-closed momentary.
    pub mode: u8,
    /// What an activation does.
    pub action: u8,
    /// When the local relay follows; zero is detached.
    pub relay_mode: u8,
    /// When bound devices are commanded.
    pub binded_mode: u8,
    /// One-based index of the driven relay; zero drives none.
    pub relay_index: u8,
    /// Hold time that counts as a long press.
    pub long_press_ms: u16,
    /// Level change rate for dimming bound devices.
    pub level_move_rate: u8,
}
