//! Device description accumulated from the configuration entries.
//!
//! [`DeviceConfig::build`] consumes the entry stream in order. The first two
//! entries are the manufacturer name and model identifier; every further entry
//! is classified by [`PeripheralDescriptor::classify`] and appended to the
//! fixed-capacity peripheral arrays by [`DeviceConfig::apply`]. Switches and
//! relays keep their parse order, which becomes their protocol-facing index.

use heapless::Vec;

use super::descriptor::{Flag, PeripheralDescriptor};
use super::error::{Capacity, ConfigError};
use super::tokens::EntryReader;
use crate::hal::{Pin, Pull};

/// Longest manufacturer name or model identifier.
pub const MAX_ATTR_STR_LEN: usize = 31;
/// Button slots, shared by plain buttons and switch buttons.
pub const MAX_BUTTONS: usize = 5;
/// LED slots, shared by status and indicator LEDs.
pub const MAX_LEDS: usize = 5;
/// Relay slots.
pub const MAX_RELAYS: usize = 5;
/// Switch slots.
pub const MAX_SWITCHES: usize = 5;
/// LED slots of the network status indicator.
pub const NETWORK_INDICATOR_SLOTS: usize = 4;

/// Long press of a plain button, which triggers a factory reset.
pub const RESET_LONG_PRESS_MS: u16 = 2000;
/// Default long press of a momentary switch.
pub const SWITCH_LONG_PRESS_MS: u16 = 800;
/// Default level move rate of a switch.
pub const DEFAULT_LEVEL_MOVE_RATE: u8 = 50;

/// Basic cluster string attribute.
pub type AttrString = Vec<u8, MAX_ATTR_STR_LEN>;

/// What a button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Long press resets the device to factory settings.
    FactoryReset,
    /// The button backs the switch with this index.
    Switch(u8),
}

/// A configured button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonSpec {
    /// Input pin.
    pub pin: Pin,
    /// Input pull.
    pub pull: Pull,
    /// What the button does.
    pub action: ButtonAction,
}

/// A configured LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSpec {
    /// Output pin.
    pub pin: Pin,
    /// `false` when the LED is lit by driving the pin low.
    pub active_high: bool,
}

/// Physical behavior of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    /// Two-position switch; every flip is one action.
    Toggle,
    /// Spring-return push switch, contact closed while pressed.
    Momentary,
    /// Spring-return push switch, contact open while pressed.
    MomentaryNc,
}

impl SwitchMode {
    /// Attribute code.
    pub fn code(self) -> u8 {
        match self {
            SwitchMode::Toggle => 0,
            SwitchMode::Momentary => 1,
            SwitchMode::MomentaryNc => 2,
        }
    }

    /// Decode an attribute code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SwitchMode::Toggle),
            1 => Some(SwitchMode::Momentary),
            2 => Some(SwitchMode::MomentaryNc),
            _ => None,
        }
    }

    /// Whether the switch springs back after a press.
    pub fn is_momentary(self) -> bool {
        self != SwitchMode::Toggle
    }
}

/// What a switch activation does to its relay and bound devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchAction {
    /// Closed position means on, open means off.
    OnOff,
    /// Closed position means off, open means on.
    OffOn,
    /// Toggle the relay, send toggle to bound devices.
    ToggleSimple,
    /// Toggle the relay, send bound devices the relay's new state.
    ToggleSmartSync,
    /// Toggle the relay, send bound devices the opposite of its new state.
    ToggleSmartOpposite,
}

impl SwitchAction {
    /// Attribute code.
    pub fn code(self) -> u8 {
        match self {
            SwitchAction::OnOff => 0,
            SwitchAction::OffOn => 1,
            SwitchAction::ToggleSimple => 2,
            SwitchAction::ToggleSmartSync => 3,
            SwitchAction::ToggleSmartOpposite => 4,
        }
    }

    /// Decode an attribute code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SwitchAction::OnOff),
            1 => Some(SwitchAction::OffOn),
            2 => Some(SwitchAction::ToggleSimple),
            3 => Some(SwitchAction::ToggleSmartSync),
            4 => Some(SwitchAction::ToggleSmartOpposite),
            _ => None,
        }
    }
}

/// Point of a momentary press at which something happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressStage {
    /// The switch went down.
    PressStart,
    /// The switch has been held for the long-press time.
    LongPress,
    /// The switch came up before the long-press time.
    ShortPress,
}

impl PressStage {
    /// Attribute code.
    pub fn code(self) -> u8 {
        match self {
            PressStage::PressStart => 1,
            PressStage::LongPress => 2,
            PressStage::ShortPress => 3,
        }
    }

    /// Decode an attribute code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PressStage::PressStart),
            2 => Some(PressStage::LongPress),
            3 => Some(PressStage::ShortPress),
            _ => None,
        }
    }
}

/// When the local relay follows a momentary switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Never; the switch only reports and commands bound devices.
    Detached,
    /// At the given stage of a press.
    At(PressStage),
}

impl RelayMode {
    /// Attribute code; zero is detached.
    pub fn code(self) -> u8 {
        match self {
            RelayMode::Detached => 0,
            RelayMode::At(stage) => stage.code(),
        }
    }

    /// Decode an attribute code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RelayMode::Detached),
            _ => PressStage::from_code(code).map(RelayMode::At),
        }
    }
}

/// A configured switch and the settings of its configuration cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchSpec {
    /// Zero-based parse-order index.
    pub index: u8,
    /// Index of the backing button.
    pub button: u8,
    /// Toggle or momentary.
    pub mode: SwitchMode,
    /// What an activation does.
    pub action: SwitchAction,
    /// When the local relay follows a momentary press.
    pub relay_mode: RelayMode,
    /// When bound devices are commanded on a momentary press.
    pub binded_mode: PressStage,
    /// One-based index of the relay this switch drives; zero drives none.
    pub relay_index: u8,
    /// Hold time that counts as a long press.
    pub long_press_ms: u16,
    /// Level change rate used for dimming commands sent to bound devices.
    pub level_move_rate: u8,
}

/// A configured relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySpec {
    /// Zero-based parse-order index.
    pub index: u8,
    /// Drive pin ("on" pin of a latching relay).
    pub pin: Pin,
    /// Second drive pin; present only for latching relays.
    pub off_pin: Option<Pin>,
    /// Level that energizes the coil.
    pub active_high: bool,
}

impl RelaySpec {
    /// Whether the relay is bi-stable and needs a pulse per transition.
    pub fn is_latching(&self) -> bool {
        self.off_pin.is_some()
    }
}

/// LEDs showing the network state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIndicatorSpec {
    /// Indices into [`DeviceConfig::leds`].
    pub leds: [Option<u8>; NETWORK_INDICATOR_SLOTS],
    /// Whether a dedicated `L` status LED is configured.
    pub has_dedicated_led: bool,
}

/// Everything the configuration string describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Manufacturer name reported by the basic cluster.
    pub manufacturer: AttrString,
    /// Model identifier reported by the basic cluster.
    pub model: AttrString,
    /// Buttons in parse order.
    pub buttons: Vec<ButtonSpec, MAX_BUTTONS>,
    /// LEDs in parse order.
    pub leds: Vec<LedSpec, MAX_LEDS>,
    /// Switches in parse order.
    pub switches: Vec<SwitchSpec, MAX_SWITCHES>,
    /// Relays in parse order.
    pub relays: Vec<RelaySpec, MAX_RELAYS>,
    /// Indicator LED (index into `leds`) of each relay slot.
    pub relay_indicators: [Option<u8>; MAX_RELAYS],
    /// LEDs showing the network state.
    pub network_indicator: NetworkIndicatorSpec,
    /// Firmware image type hint.
    pub image_type: Option<u32>,
    /// Set by the `SLP` flag.
    pub allow_simultaneous_pulses: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceConfig {
    /// An empty configuration with no identity and no peripherals.
    pub fn new() -> Self {
        Self {
            manufacturer: Vec::new(),
            model: Vec::new(),
            buttons: Vec::new(),
            leds: Vec::new(),
            switches: Vec::new(),
            relays: Vec::new(),
            relay_indicators: [None; MAX_RELAYS],
            network_indicator: NetworkIndicatorSpec {
                leds: [None; NETWORK_INDICATOR_SLOTS],
                has_dedicated_led: false,
            },
            image_type: None,
            allow_simultaneous_pulses: false,
        }
    }

    /// Build a configuration from the entry stream.
    ///
    /// Reading stops at the first empty entry. The caller owns restoring the
    /// buffer afterwards.
    ///
    /// # Errors
    ///
    /// - `ManufacturerTooLong` / `ModelTooLong` for identity strings over
    ///   [`MAX_ATTR_STR_LEN`] bytes
    /// - `CapacityExceeded` when a peripheral array overflows
    pub fn build(reader: &mut EntryReader<'_>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        let manufacturer = reader.next_entry();
        config.manufacturer = AttrString::from_slice(manufacturer.as_bytes())
            .map_err(|_| ConfigError::ManufacturerTooLong(manufacturer.len()))?;

        let model = reader.next_entry();
        config.model = AttrString::from_slice(model.as_bytes())
            .map_err(|_| ConfigError::ModelTooLong(model.len()))?;

        loop {
            let entry = reader.next_entry();
            if entry.is_empty() {
                break;
            }
            match PeripheralDescriptor::classify(&entry) {
                Some(descriptor) => config.apply(descriptor)?,
                None => warn!("config: ignoring unknown entry {}", entry.as_bytes()),
            }
        }

        Ok(config)
    }

    /// Append one descriptor.
    pub fn apply(&mut self, descriptor: PeripheralDescriptor) -> Result<(), ConfigError> {
        match descriptor {
            PeripheralDescriptor::Flag(Flag::SimultaneousPulses) => {
                self.allow_simultaneous_pulses = true;
            }
            PeripheralDescriptor::Flag(Flag::MomentarySwitches) => {
                for switch in self.switches.iter_mut() {
                    switch.mode = SwitchMode::Momentary;
                }
            }
            PeripheralDescriptor::Button { pin, pull } => {
                self.push_button(ButtonSpec {
                    pin,
                    pull,
                    action: ButtonAction::FactoryReset,
                })?;
            }
            PeripheralDescriptor::Switch { pin, pull } => {
                if self.switches.is_full() {
                    return Err(ConfigError::CapacityExceeded(Capacity::Switches));
                }
                let index = self.switches.len() as u8;
                let button = self.push_button(ButtonSpec {
                    pin,
                    pull,
                    action: ButtonAction::Switch(index),
                })?;
                self.switches
                    .push(SwitchSpec {
                        index,
                        button,
                        mode: SwitchMode::Toggle,
                        action: SwitchAction::ToggleSimple,
                        relay_mode: RelayMode::At(PressStage::ShortPress),
                        binded_mode: PressStage::ShortPress,
                        relay_index: index + 1,
                        long_press_ms: SWITCH_LONG_PRESS_MS,
                        level_move_rate: DEFAULT_LEVEL_MOVE_RATE,
                    })
                    .map_err(|_| ConfigError::CapacityExceeded(Capacity::Switches))?;
            }
            PeripheralDescriptor::Led { pin, active_high } => {
                let led = self.push_led(LedSpec { pin, active_high })?;
                let indicator = &mut self.network_indicator;
                indicator.leds = [None; NETWORK_INDICATOR_SLOTS];
                indicator.leds[0] = Some(led);
                indicator.has_dedicated_led = true;
            }
            PeripheralDescriptor::IndicatorLed { pin, active_high } => {
                let led = self.push_led(LedSpec { pin, active_high })?;
                if let Some(slot) = self.relay_indicators.iter_mut().find(|slot| slot.is_none()) {
                    *slot = Some(led);
                }
                if !self.network_indicator.has_dedicated_led {
                    let leds = &mut self.network_indicator.leds;
                    if let Some(slot) = leds.iter_mut().find(|slot| slot.is_none()) {
                        *slot = Some(led);
                    }
                }
            }
            PeripheralDescriptor::Relay { pin, off_pin } => {
                let index = self.relays.len() as u8;
                self.relays
                    .push(RelaySpec {
                        index,
                        pin,
                        off_pin,
                        active_high: true,
                    })
                    .map_err(|_| ConfigError::CapacityExceeded(Capacity::Relays))?;
            }
            PeripheralDescriptor::ImageTypeHint(image_type) => {
                self.image_type = Some(image_type);
            }
        }
        Ok(())
    }

    /// Indicator LED assigned to the relay with the given index.
    pub fn relay_indicator(&self, relay_index: usize) -> Option<&LedSpec> {
        let led = (*self.relay_indicators.get(relay_index)?)?;
        self.leds.get(usize::from(led))
    }

    /// Endpoints the topology will expose: one per switch and relay, at least one.
    pub fn endpoint_count(&self) -> usize {
        (self.switches.len() + self.relays.len()).max(1)
    }

    fn push_button(&mut self, button: ButtonSpec) -> Result<u8, ConfigError> {
        let index = self.buttons.len() as u8;
        self.buttons
            .push(button)
            .map_err(|_| ConfigError::CapacityExceeded(Capacity::Buttons))?;
        Ok(index)
    }

    fn push_led(&mut self, led: LedSpec) -> Result<u8, ConfigError> {
        let index = self.leds.len() as u8;
        self.leds
            .push(led)
            .map_err(|_| ConfigError::CapacityExceeded(Capacity::Leds))?;
        Ok(index)
    }
}
