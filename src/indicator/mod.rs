//! LED outputs: relay indicators and the network status indicator.
//!
//! An indicator LED configured with `I` does double duty. It follows the state
//! of its relay, and when no dedicated `L` status LED exists it is also
//! borrowed by the network indicator, which lights it while the device is not
//! joined.

use crate::config::device::{DeviceConfig, LedSpec, NETWORK_INDICATOR_SLOTS};
use crate::hal::{Gpio, NetworkStatus, PinMode};

/// A single LED output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Led {
    spec: LedSpec,
}

impl Led {
    /// Wrap a configured LED.
    pub fn new(spec: LedSpec) -> Self {
        Self { spec }
    }

    /// Configure the pin as an output and switch the LED off.
    pub fn init<H: Gpio + ?Sized>(&self, hal: &mut H) {
        if let Err(e) = hal.configure(self.spec.pin, PinMode::Output) {
            warn!("led {}: init failed ({})", self.spec.pin, e);
        }
        self.set(hal, false);
    }

    /// Light or darken the LED.
    pub fn set<H: Gpio + ?Sized>(&self, hal: &mut H, on: bool) {
        hal.write(self.spec.pin, on == self.spec.active_high);
    }

    /// Underlying LED spec.
    pub fn spec(&self) -> &LedSpec {
        &self.spec
    }
}

/// LEDs showing whether the device is joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIndicator {
    leds: [Option<Led>; NETWORK_INDICATOR_SLOTS],
    has_dedicated_led: bool,
    manual_state_when_connected: bool,
    status: NetworkStatus,
}

impl NetworkIndicator {
    /// Collect the LEDs assigned to the network indicator by `config`.
    pub fn new(config: &DeviceConfig) -> Self {
        let mut leds = [None; NETWORK_INDICATOR_SLOTS];
        for (slot, led) in leds.iter_mut().zip(config.network_indicator.leds.iter()) {
            *slot = led
                .and_then(|index| config.leds.get(usize::from(index)))
                .copied()
                .map(Led::new);
        }
        Self {
            leds,
            has_dedicated_led: config.network_indicator.has_dedicated_led,
            manual_state_when_connected: true,
            status: NetworkStatus::NotJoined,
        }
    }

    /// Whether a dedicated status LED is configured.
    pub fn has_dedicated_led(&self) -> bool {
        self.has_dedicated_led
    }

    /// Number of LEDs driven by the indicator.
    pub fn led_count(&self) -> usize {
        self.leds.iter().flatten().count()
    }

    /// State of the dedicated LED while joined; lit until set otherwise.
    pub fn manual_state(&self) -> bool {
        self.manual_state_when_connected
    }

    /// Last applied network status.
    pub fn status(&self) -> NetworkStatus {
        self.status
    }

    /// Set the state of the dedicated LED while joined and re-apply.
    pub fn set_manual_state<H: Gpio + ?Sized>(&mut self, hal: &mut H, on: bool) {
        self.manual_state_when_connected = on;
        self.apply(hal, self.status);
    }

    /// Drive the LEDs for `status`.
    ///
    /// Not joined (or joining) lights every LED. Joined shows the manual state
    /// on a dedicated LED and switches borrowed relay indicators off; the
    /// caller re-syncs those with their relays afterwards.
    pub fn apply<H: Gpio + ?Sized>(&mut self, hal: &mut H, status: NetworkStatus) {
        if status != self.status {
            info!("network: status {}", status);
        }
        self.status = status;
        let on = match status {
            NetworkStatus::Joined => self.has_dedicated_led && self.manual_state_when_connected,
            NetworkStatus::NotJoined | NetworkStatus::Joining => true,
        };
        for led in self.leds.iter().flatten() {
            led.set(hal, on);
        }
    }
}
