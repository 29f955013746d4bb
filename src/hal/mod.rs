//! Hardware and platform collaborator interfaces.
//!
//! The core never touches registers, radios or timers directly. Everything it
//! needs from the platform is expressed by the traits in this module:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │    Gpio      │   │  EdgeInterrupts  │   │  Scheduler   │
//! │ drive/read/  │   │ enable/disable/  │   │ single-shot  │
//! │ pull config  │   │ arm edge         │   │ delayed task │
//! └──────────────┘   └──────────────────┘   └──────────────┘
//!          ┌──────────────┐   ┌────────────────┐
//!          │    System    │   │  NetworkStack  │
//!          │ reset/reboot │   │ topology sink  │
//!          └──────────────┘   └────────────────┘
//! ```
//!
//! All traits are synchronous and non-blocking. They are implemented by the
//! board support code of a concrete target, or by a simulation in tests.

use crate::topology::Topology;

/// A physical pin: a port letter (`A`..=`D`) and a pin number (`0`..=`8`).
///
/// The encoding packs the port index in the upper byte and the pin number in
/// the lower byte. [`Pin::INVALID`] is the sentinel produced for any
/// unparseable pin spec and marks empty interrupt slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin(u16);

impl Pin {
    /// Sentinel for "no pin" / "unparseable pin spec".
    pub const INVALID: Pin = Pin(0xFFFF);

    /// Number of ports addressable from a configuration string.
    pub const PORTS: u8 = 4;

    /// Highest pin number addressable from a configuration string.
    pub const MAX_NUMBER: u8 = 8;

    /// Create a pin from a zero-based port index and pin number.
    ///
    /// Out-of-range values yield [`Pin::INVALID`].
    pub const fn new(port: u8, number: u8) -> Self {
        if port < Self::PORTS && number <= Self::MAX_NUMBER {
            Pin(((port as u16) << 8) | number as u16)
        } else {
            Self::INVALID
        }
    }

    /// Parse a two-character pin spec such as `b"B3"`.
    ///
    /// Only the first two bytes are inspected; trailing bytes (pull letters,
    /// a second pin) are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zbswitch::hal::Pin;
    ///
    /// assert_eq!(Pin::parse(b"A0"), Pin::new(0, 0));
    /// assert_eq!(Pin::parse(b"D8u"), Pin::new(3, 8));
    /// assert_eq!(Pin::parse(b"E1"), Pin::INVALID);
    /// assert_eq!(Pin::parse(b"A9"), Pin::INVALID);
    /// assert_eq!(Pin::parse(b"A"), Pin::INVALID);
    /// ```
    pub fn parse(spec: &[u8]) -> Self {
        match spec {
            [port @ b'A'..=b'D', number @ b'0'..=b'8', ..] => Pin::new(port - b'A', number - b'0'),
            _ => Self::INVALID,
        }
    }

    /// Whether this is a real pin rather than the sentinel.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Zero-based port index (`A` = 0).
    pub fn port(self) -> Option<u8> {
        self.is_valid().then_some((self.0 >> 8) as u8)
    }

    /// Pin number within the port.
    pub fn number(self) -> Option<u8> {
        self.is_valid().then_some((self.0 & 0xFF) as u8)
    }

    /// Raw packed encoding.
    pub fn raw(self) -> u16 {
        self.0
    }
}

impl core::fmt::Display for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (self.port(), self.number()) {
            (Some(port), Some(number)) => write!(f, "{}{}", (b'A' + port) as char, number),
            _ => f.write_str("invalid"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Pin {
    fn format(&self, f: defmt::Formatter) {
        match (self.port(), self.number()) {
            (Some(port), Some(number)) => defmt::write!(f, "{}{}", (b'A' + port) as char, number),
            _ => defmt::write!(f, "invalid"),
        }
    }
}

/// Input pull configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// Pull-up resistor (`u`).
    Up,
    /// Pull-down resistor (`d`).
    Down,
    /// No pull (`f`).
    Floating,
    /// Missing or unknown pull letter. Passed through to the GPIO layer.
    Invalid,
}

impl Pull {
    /// Decode a pull letter.
    pub fn parse(letter: u8) -> Self {
        match letter {
            b'u' | b'U' => Pull::Up,
            b'd' => Pull::Down,
            b'f' => Pull::Floating,
            _ => Pull::Invalid,
        }
    }
}

/// How a pin is configured by [`Gpio::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Input with the given pull.
    Input(Pull),
    /// Push-pull output.
    Output,
}

/// Edge that arms a pin interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high transition.
    Rising,
    /// High to low transition.
    Falling,
}

/// Errors reported by the GPIO collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// The pin does not exist on this target (includes [`Pin::INVALID`]).
    InvalidPin,
    /// The requested mode is not supported by this pin.
    Unsupported,
}

#[cfg(feature = "defmt")]
impl defmt::Format for GpioError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            GpioError::InvalidPin => defmt::write!(f, "InvalidPin"),
            GpioError::Unsupported => defmt::write!(f, "Unsupported"),
        }
    }
}

/// Pin drive, read and mode configuration.
pub trait Gpio {
    /// Configure a pin as input (with pull) or output.
    fn configure(&mut self, pin: Pin, mode: PinMode) -> Result<(), GpioError>;

    /// Drive an output pin to the given level.
    fn write(&mut self, pin: Pin, high: bool);

    /// Read the current level of a pin.
    fn read(&mut self, pin: Pin) -> bool;
}

/// Per-pin edge interrupt control.
///
/// The platform's interrupt service routine is expected to call
/// [`Device::on_edge_interrupt`](crate::device::Device::on_edge_interrupt)
/// (or [`Dispatcher::on_edge_interrupt`](crate::interrupts::Dispatcher::on_edge_interrupt))
/// for every raw edge on an enabled pin.
pub trait EdgeInterrupts {
    /// Enable the raw edge interrupt of a pin.
    fn irq_enable(&mut self, pin: Pin);

    /// Disable the raw edge interrupt of a pin.
    fn irq_disable(&mut self, pin: Pin);

    /// Select which edge triggers the next interrupt of a pin.
    fn irq_set_edge(&mut self, pin: Pin, edge: Edge);
}

/// Handle of a single-shot delayed task.
///
/// Every handle has at most one pending firing. Scheduling a handle that is
/// already pending replaces the earlier firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// Pulse start/end task of the relay with the given index.
    RelayPulse(u8),
    /// Deferred settle-and-dispatch pass of the interrupt dispatcher.
    GpioDispatch,
    /// Long-press timer of the button with the given index.
    ButtonHold(u8),
    /// Delayed reboot or full reset.
    Reset,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TaskId::RelayPulse(index) => defmt::write!(f, "RelayPulse({})", index),
            TaskId::GpioDispatch => defmt::write!(f, "GpioDispatch"),
            TaskId::ButtonHold(index) => defmt::write!(f, "ButtonHold({})", index),
            TaskId::Reset => defmt::write!(f, "Reset"),
        }
    }
}

/// Millisecond-granularity single-shot task scheduler.
///
/// When a task fires, the platform hands its [`TaskId`] back to
/// [`Device::on_task`](crate::device::Device::on_task).
pub trait Scheduler {
    /// Schedule `task` to fire after `delay_ms`, replacing any pending firing.
    fn schedule(&mut self, task: TaskId, delay_ms: u16);

    /// Cancel the pending firing of `task`, if any.
    fn unschedule(&mut self, task: TaskId);
}

/// Reset primitives.
pub trait System {
    /// Leave the network and drop all network settings.
    fn factory_reset(&mut self);

    /// Reboot the device. Real implementations do not return.
    fn system_reset(&mut self);
}

/// Network join state as reported by the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Not part of a network.
    NotJoined,
    /// Steering or rejoin in progress.
    Joining,
    /// Joined.
    Joined,
}

#[cfg(feature = "defmt")]
impl defmt::Format for NetworkStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            NetworkStatus::NotJoined => defmt::write!(f, "NotJoined"),
            NetworkStatus::Joining => defmt::write!(f, "Joining"),
            NetworkStatus::Joined => defmt::write!(f, "Joined"),
        }
    }
}

/// Switch activity reported on a switch endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    /// A momentary switch came up.
    Released,
    /// A momentary switch went down.
    Press,
    /// A momentary switch has been held for its long-press time.
    LongPress,
    /// A toggle switch moved to its closed position.
    PositionOn,
    /// A toggle switch moved to its open position.
    PositionOff,
}

/// On/off command sent to the devices bound to a switch endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOffCommand {
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// Invert.
    Toggle,
}

impl OnOffCommand {
    /// `On` or `Off` for the given state.
    pub fn from_state(on: bool) -> Self {
        if on { OnOffCommand::On } else { OnOffCommand::Off }
    }
}

/// The wireless stack: takes the assembled topology and carries switch
/// activity to the network.
pub trait NetworkStack {
    /// Register the endpoint/cluster topology. Called once per boot.
    fn init(&mut self, topology: &Topology);

    /// Set the firmware image type advertised for updates.
    fn set_image_type(&mut self, image_type: u32);

    /// Current join state.
    fn status(&self) -> NetworkStatus;

    /// Report switch activity on the endpoint of switch `switch_idx`.
    fn report_press(&mut self, switch_idx: u8, action: PressAction);

    /// Send `command` to the devices bound to switch `switch_idx`.
    fn send_bound(&mut self, switch_idx: u8, command: OnOffCommand);
}

/// GPIO output plus task scheduling, as needed by relays and LEDs.
pub trait OutputHal: Gpio + Scheduler {}

impl<T: Gpio + Scheduler + ?Sized> OutputHal for T {}

/// GPIO input plus edge interrupts plus task scheduling, as needed by the
/// interrupt dispatcher.
pub trait InterruptHal: Gpio + EdgeInterrupts + Scheduler {}

impl<T: Gpio + EdgeInterrupts + Scheduler + ?Sized> InterruptHal for T {}

/// Every collaborator a [`Device`](crate::device::Device) talks to.
pub trait Platform: Gpio + EdgeInterrupts + Scheduler + System + NetworkStack {}

impl<T: Gpio + EdgeInterrupts + Scheduler + System + NetworkStack + ?Sized> Platform for T {}
