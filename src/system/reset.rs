//! Reboot and full reset.
//!
//! A full reset wipes the NV store, leaves the network and reboots. A reboot
//! only restarts the firmware. Both can be deferred on the [`TaskId::Reset`]
//! handle so that an attribute write can be acknowledged first. There is one
//! handle: scheduling again replaces whatever was pending, kind and delay.

use crate::hal::{Scheduler, System, TaskId};
use crate::storage::KeyValueStore;

/// Delay used when a caller asks for a reset with zero delay.
pub const DEFAULT_RESET_DELAY_MS: u16 = 300;

/// What happens when the reset task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Restart the firmware.
    Reboot,
    /// Erase settings, leave the network, restart.
    Full,
}

/// The pending reset, if any.
#[derive(Debug, Default)]
pub struct ResetScheduler {
    pending: Option<ResetKind>,
}

impl ResetScheduler {
    /// Nothing pending.
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Pending reset kind.
    pub fn pending(&self) -> Option<ResetKind> {
        self.pending
    }

    /// Schedule a full reset after `delay_ms` (zero: the default delay).
    pub fn schedule_full_reset<H: Scheduler + ?Sized>(&mut self, hal: &mut H, delay_ms: u16) {
        self.schedule(hal, ResetKind::Full, delay_ms);
    }

    /// Schedule a reboot after `delay_ms` (zero: the default delay).
    pub fn schedule_reboot<H: Scheduler + ?Sized>(&mut self, hal: &mut H, delay_ms: u16) {
        self.schedule(hal, ResetKind::Reboot, delay_ms);
    }

    /// Drop the pending reset.
    pub fn cancel<H: Scheduler + ?Sized>(&mut self, hal: &mut H) {
        self.pending = None;
        hal.unschedule(TaskId::Reset);
    }

    /// Run the reset task.
    pub fn on_reset_task<H, S>(&mut self, hal: &mut H, store: &mut S)
    where
        H: System + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        match self.pending.take() {
            Some(ResetKind::Full) => reset_all(hal, store),
            Some(ResetKind::Reboot) => {
                info!("reset: rebooting");
                hal.system_reset();
            }
            None => {}
        }
    }

    fn schedule<H: Scheduler + ?Sized>(&mut self, hal: &mut H, kind: ResetKind, delay_ms: u16) {
        let delay_ms = if delay_ms == 0 {
            DEFAULT_RESET_DELAY_MS
        } else {
            delay_ms
        };
        self.pending = Some(kind);
        hal.schedule(TaskId::Reset, delay_ms);
    }
}

/// Full reset, right now: erase the store, leave the network, reboot.
pub fn reset_all<H, S>(hal: &mut H, store: &mut S)
where
    H: System + ?Sized,
    S: KeyValueStore + ?Sized,
{
    error!("reset: full device reset");
    if let Err(e) = store.clear_all() {
        error!("reset: clearing storage failed ({})", e);
    }
    hal.factory_reset();
    hal.system_reset();
}
