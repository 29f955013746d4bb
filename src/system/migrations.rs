//! Stored layout version and device role.

use super::reset::ResetScheduler;
use crate::hal::{Scheduler, System};
use crate::storage::records::{self, DeviceTypeRecord, VersionRecord};
use crate::storage::{Error, KeyValueStore, items};

/// Layout version written by this firmware.
pub const NV_VERSION: u16 = 1;

/// Reboot delay after a device role change.
pub const DEVICE_TYPE_CHANGE_REBOOT_MS: u16 = 2000;

/// Network role of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Mains powered, routes traffic.
    Router,
    /// Sleepy end device.
    EndDevice,
}

impl DeviceType {
    /// Stored role code.
    pub fn code(self) -> u8 {
        match self {
            DeviceType::Router => 0,
            DeviceType::EndDevice => 1,
        }
    }

    /// Decode a stored role code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DeviceType::Router),
            1 => Some(DeviceType::EndDevice),
            _ => None,
        }
    }
}

/// Outcome of [`check_version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// No readable version was stored; the current one was written.
    Initialized,
    /// The stored version is current.
    Current,
    /// The stored version differed and was migrated.
    Migrated {
        /// Version found in storage.
        from: u16,
    },
}

/// Make sure the stored layout version is [`NV_VERSION`].
pub fn check_version<S: KeyValueStore + ?Sized>(store: &mut S) -> VersionCheck {
    let outcome = match records::load::<_, VersionRecord>(store, items::VERSION) {
        Ok(record) if record.version == NV_VERSION => return VersionCheck::Current,
        Ok(record) => {
            info!("nv: migrating layout {} -> {}", record.version, NV_VERSION);
            // No layout changes exist yet between versions.
            VersionCheck::Migrated {
                from: record.version,
            }
        }
        Err(_) => VersionCheck::Initialized,
    };
    let current = VersionRecord {
        version: NV_VERSION,
    };
    if let Err(e) = records::store(store, items::VERSION, &current) {
        error!("nv: version write failed ({})", e);
    }
    outcome
}

/// Outcome of [`check_device_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTypeCheck {
    /// No role was stored; the running one was written.
    FirstBoot,
    /// The stored role matches.
    Unchanged,
    /// The role changed; the network was left and a reboot is scheduled.
    Changed {
        /// Role found in storage, if decodable.
        from: Option<DeviceType>,
    },
}

/// Compare the stored role with the running one.
///
/// A change leaves the network and reboots after
/// [`DEVICE_TYPE_CHANGE_REBOOT_MS`] so the device rejoins in its new role.
pub fn check_device_type<H, S>(
    hal: &mut H,
    store: &mut S,
    resets: &mut ResetScheduler,
    running: DeviceType,
) -> DeviceTypeCheck
where
    H: System + Scheduler + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let stored = match records::load::<_, DeviceTypeRecord>(store, items::DEVICE_TYPE) {
        Ok(record) => Some(record.role),
        Err(Error::NotFound) => None,
        Err(e) => {
            warn!("nv: device type unreadable ({})", e);
            None
        }
    };

    if stored == Some(running.code()) {
        return DeviceTypeCheck::Unchanged;
    }

    let record = DeviceTypeRecord {
        role: running.code(),
    };
    if let Err(e) = records::store(store, items::DEVICE_TYPE, &record) {
        error!("nv: device type write failed ({})", e);
    }

    match stored {
        None => DeviceTypeCheck::FirstBoot,
        Some(code) => {
            info!("device type changed {} -> {}", code, running.code());
            hal.factory_reset();
            resets.schedule_reboot(hal, DEVICE_TYPE_CHANGE_REBOOT_MS);
            DeviceTypeCheck::Changed {
                from: DeviceType::from_code(code),
            }
        }
    }
}
