//! # Relays and the latching pulse arbiter
//!
//! A continuously driven relay follows its logical state on a single pin. A
//! latching (bi-stable) relay has an "on" and an "off" coil and only needs a
//! short pulse on one of them per transition. The coils of all latching
//! relays share one drive resource, so at most one pulse may be in flight at a
//! time unless the configuration allows simultaneous pulses.
//!
//! ## Pulse state machine
//!
//! ```text
//!            set()                    slot busy
//!   ┌──────┐ ───────▶ start attempt ───────────▶ ┌──────────────┐
//!   │ Idle │                │                    │ PendingRetry │
//!   └──────┘                │ slot free          └──────────────┘
//!       ▲                   ▼                       │ 50 ms
//!       │  100 ms   ┌──────────────┐                │
//!       └────────── │ PulseActive  │ ◀──────────────┘ (retry start)
//!                   └──────────────┘
//! ```
//!
//! The pulse holder slot is shared by all relays in a [`Relays`] bank. Every
//! timed transition runs from the [`TaskId::RelayPulse`] task of the relay.

use heapless::Vec;

use crate::config::device::{DeviceConfig, MAX_RELAYS, RelaySpec};
use crate::hal::{Gpio, OutputHal, PinMode, TaskId};
use crate::indicator::Led;

/// Length of a latching coil pulse.
pub const PULSE_MS: u16 = 100;

/// Wait before retrying a pulse start blocked by another relay.
pub const WAIT_FOR_END_MS: u16 = 50;

/// State-change notification: relay index, new logical state, user parameter.
pub type StateFn = fn(relay: u8, on: bool, param: usize);

/// Pulse progress of a latching relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    /// No pulse pending or active.
    Idle,
    /// A coil is energized; the end-of-pulse task is scheduled.
    PulseActive,
    /// Waiting for another relay to release the pulse slot.
    PendingRetry,
}

/// Runtime state of one relay.
#[derive(Debug, Clone, Copy)]
pub struct Relay {
    spec: RelaySpec,
    on: bool,
    pulse: PulseState,
    indicator: Option<Led>,
    callback: Option<(StateFn, usize)>,
}

impl Relay {
    fn new(spec: RelaySpec, indicator: Option<Led>) -> Self {
        Self {
            spec,
            on: false,
            pulse: PulseState::Idle,
            indicator,
            callback: None,
        }
    }

    /// Configuration of the relay.
    pub fn spec(&self) -> &RelaySpec {
        &self.spec
    }

    /// Logical state.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Pulse progress; always `Idle` for continuously driven relays.
    pub fn pulse_state(&self) -> PulseState {
        self.pulse
    }

    fn active_level(&self) -> bool {
        self.spec.active_high
    }

    fn release_coils<H: Gpio + ?Sized>(&self, hal: &mut H) {
        hal.write(self.spec.pin, !self.active_level());
        if let Some(off_pin) = self.spec.off_pin {
            hal.write(off_pin, !self.active_level());
        }
    }
}

/// All relays of the device and the shared pulse slot.
#[derive(Debug)]
pub struct Relays {
    relays: Vec<Relay, MAX_RELAYS>,
    pulse_holder: Option<u8>,
    allow_simultaneous_pulses: bool,
}

impl Relays {
    /// Create the relays described by `config`, all off.
    pub fn new(config: &DeviceConfig) -> Self {
        let mut relays = Vec::new();
        for spec in config.relays.iter() {
            let indicator = config
                .relay_indicator(usize::from(spec.index))
                .copied()
                .map(Led::new);
            // config.relays has the same capacity.
            let _ = relays.push(Relay::new(*spec, indicator));
        }
        Self {
            relays,
            pulse_holder: None,
            allow_simultaneous_pulses: config.allow_simultaneous_pulses,
        }
    }

    /// Configure every drive pin and indicator, leaving coils de-energized.
    pub fn init<H: OutputHal + ?Sized>(&mut self, hal: &mut H) {
        for relay in self.relays.iter() {
            let pins = [Some(relay.spec.pin), relay.spec.off_pin];
            for pin in pins.into_iter().flatten() {
                if let Err(e) = hal.configure(pin, PinMode::Output) {
                    warn!("relay {}: pin {} init failed ({})", relay.spec.index, pin, e);
                }
            }
            relay.release_coils(hal);
            if let Some(led) = &relay.indicator {
                led.init(hal);
            }
        }
    }

    /// Number of relays.
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    /// Whether no relays are configured.
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Relay by index.
    pub fn get(&self, index: u8) -> Option<&Relay> {
        self.relays.get(usize::from(index))
    }

    /// Logical state of a relay; `false` for unknown indices.
    pub fn is_on(&self, index: u8) -> bool {
        self.get(index).is_some_and(Relay::is_on)
    }

    /// Relay currently holding the pulse slot.
    pub fn pulse_holder(&self) -> Option<u8> {
        self.pulse_holder
    }

    /// Whether latching relays may pulse at the same time.
    pub fn allows_simultaneous_pulses(&self) -> bool {
        self.allow_simultaneous_pulses
    }

    /// Register the state-change callback of a relay. Returns `false` for
    /// unknown indices.
    pub fn set_callback(&mut self, index: u8, callback: StateFn, param: usize) -> bool {
        match self.relays.get_mut(usize::from(index)) {
            Some(relay) => {
                relay.callback = Some((callback, param));
                true
            }
            None => false,
        }
    }

    /// Switch a relay on.
    pub fn turn_on<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        self.set(hal, index, true);
    }

    /// Switch a relay off.
    pub fn turn_off<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        self.set(hal, index, false);
    }

    /// Invert the logical state of a relay.
    pub fn toggle<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        let on = self.is_on(index);
        self.set(hal, index, !on);
    }

    /// Drive a relay to `on`.
    ///
    /// A latching relay drops any pulse of its own that is still pending or in
    /// flight and starts a new one for the requested direction. The callback
    /// sees the final logical state once actuation has been issued.
    pub fn set<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8, on: bool) {
        let Some(relay) = self.relays.get_mut(usize::from(index)) else {
            warn!("relay {}: no such relay", index);
            return;
        };
        relay.on = on;
        debug!("relay {}: -> {}", index, on);

        if relay.spec.is_latching() {
            self.clear_pending(hal, index);
            self.start_pulse(hal, index);
        } else {
            hal.write(relay.spec.pin, on == relay.active_level());
        }

        let relay = &self.relays[usize::from(index)];
        if let Some(led) = &relay.indicator {
            led.set(hal, on);
        }
        if let Some((callback, param)) = relay.callback {
            callback(index, on, param);
        }
    }

    /// Drive every relay indicator to its relay's state.
    pub fn sync_indicators<H: Gpio + ?Sized>(&self, hal: &mut H) {
        for relay in self.relays.iter() {
            if let Some(led) = &relay.indicator {
                led.set(hal, relay.on);
            }
        }
    }

    /// Run the pulse task of a relay: end an active pulse or retry a blocked
    /// start.
    pub fn on_pulse_task<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        match self.get(index).map(Relay::pulse_state) {
            Some(PulseState::PulseActive) => self.end_pulse(hal, index),
            Some(PulseState::PendingRetry) => self.start_pulse(hal, index),
            Some(PulseState::Idle) | None => {}
        }
    }

    fn clear_pending<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        let relay = &mut self.relays[usize::from(index)];
        relay.release_coils(hal);
        relay.pulse = PulseState::Idle;
        hal.unschedule(TaskId::RelayPulse(index));
        if self.pulse_holder == Some(index) {
            self.pulse_holder = None;
        }
    }

    fn start_pulse<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        let busy = self.pulse_holder.is_some_and(|holder| holder != index);
        let relay = &mut self.relays[usize::from(index)];

        if busy && !self.allow_simultaneous_pulses {
            debug!("relay {}: pulse slot busy, retrying", index);
            relay.pulse = PulseState::PendingRetry;
            hal.schedule(TaskId::RelayPulse(index), WAIT_FOR_END_MS);
            return;
        }

        let coil = if relay.on {
            relay.spec.pin
        } else {
            relay.spec.off_pin.unwrap_or(relay.spec.pin)
        };
        hal.write(coil, relay.active_level());
        relay.pulse = PulseState::PulseActive;
        self.pulse_holder = Some(index);
        hal.schedule(TaskId::RelayPulse(index), PULSE_MS);
    }

    fn end_pulse<H: OutputHal + ?Sized>(&mut self, hal: &mut H, index: u8) {
        let relay = &mut self.relays[usize::from(index)];
        relay.release_coils(hal);
        relay.pulse = PulseState::Idle;
        if self.pulse_holder == Some(index) {
            self.pulse_holder = None;
        }
    }
}
