//! Errors raised while compiling a configuration string

/// Fixed-capacity peripheral arrays.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Capacity {
    /// Buttons, including the buttons backing switches.
    Buttons,
    /// Status and indicator LEDs.
    Leds,
    /// Relays.
    Relays,
    /// Switches.
    Switches,
}

/// A configuration error.
///
/// Every variant except [`ConfigError::ConfigTooLong`] is unrecoverable when
/// raised during boot: the device performs a full reset instead of exposing a
/// partial topology.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    /// The manufacturer name exceeds the basic cluster attribute size.
    ManufacturerTooLong(usize),
    /// The model identifier exceeds the basic cluster attribute size.
    ModelTooLong(usize),
    /// More peripherals of one kind than the device can hold.
    CapacityExceeded(Capacity),
    /// The endpoint/cluster tables overflowed.
    TopologyOverflow,
    /// A configuration string longer than the configuration buffer.
    ConfigTooLong(usize),
}

impl ConfigError {
    /// Whether the error must end in a full device reset when hit at boot.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConfigError::ConfigTooLong(_))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Capacity {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Capacity::Buttons => defmt::write!(f, "Buttons"),
            Capacity::Leds => defmt::write!(f, "Leds"),
            Capacity::Relays => defmt::write!(f, "Relays"),
            Capacity::Switches => defmt::write!(f, "Switches"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::ManufacturerTooLong(len) => defmt::write!(f, "ManufacturerTooLong({})", len),
            ConfigError::ModelTooLong(len) => defmt::write!(f, "ModelTooLong({})", len),
            ConfigError::CapacityExceeded(kind) => defmt::write!(f, "CapacityExceeded({})", kind),
            ConfigError::TopologyOverflow => defmt::write!(f, "TopologyOverflow"),
            ConfigError::ConfigTooLong(len) => defmt::write!(f, "ConfigTooLong({})", len),
        }
    }
}
