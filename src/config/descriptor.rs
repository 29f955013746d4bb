//! Classification of configuration entries into peripheral descriptors.
//!
//! | Tag                         | Descriptor                          |
//! |-----------------------------|-------------------------------------|
//! | `SLP`                       | [`Flag::SimultaneousPulses`]        |
//! | `B<port><pin>[<pull>]`      | [`PeripheralDescriptor::Button`]    |
//! | `S<port><pin>[<pull>]`      | [`PeripheralDescriptor::Switch`]    |
//! | `L<port><pin><polarity>`    | [`PeripheralDescriptor::Led`]       |
//! | `I<port><pin><polarity>`    | [`PeripheralDescriptor::IndicatorLed`] |
//! | `R<port><pin>[<port><pin>]` | [`PeripheralDescriptor::Relay`]     |
//! | `i<digits>`                 | [`PeripheralDescriptor::ImageTypeHint`] |
//! | `M`                         | [`Flag::MomentarySwitches`]         |
//!
//! Pin fields that do not parse become [`Pin::INVALID`]; classification itself
//! never fails on a known tag.

use super::tokens::{Entry, TERMINATOR};
use crate::hal::{Pin, Pull};

/// Payload-free modifier tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Allow several latching relays to pulse at the same time.
    SimultaneousPulses,
    /// Switch every switch parsed so far to momentary mode.
    MomentarySwitches,
}

/// One classified configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralDescriptor {
    /// Push button whose long press triggers a factory reset.
    Button {
        /// Input pin.
        pin: Pin,
        /// Input pull.
        pull: Pull,
    },
    /// Wall switch bound to a relay.
    Switch {
        /// Input pin.
        pin: Pin,
        /// Input pull.
        pull: Pull,
    },
    /// Dedicated network status LED.
    Led {
        /// Output pin.
        pin: Pin,
        /// `false` when the LED is lit by driving the pin low.
        active_high: bool,
    },
    /// Per-relay indicator LED.
    IndicatorLed {
        /// Output pin.
        pin: Pin,
        /// `false` when the LED is lit by driving the pin low.
        active_high: bool,
    },
    /// Relay output; a second pin makes it a latching relay.
    Relay {
        /// "On" drive pin.
        pin: Pin,
        /// "Off" drive pin of a latching relay.
        off_pin: Option<Pin>,
    },
    /// Firmware image type advertised for updates.
    ImageTypeHint(u32),
    /// Modifier token.
    Flag(Flag),
}

impl PeripheralDescriptor {
    /// Classify an entry by its tag.
    ///
    /// Returns `None` for unknown tags and for the empty entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zbswitch::config::descriptor::PeripheralDescriptor;
    /// use zbswitch::config::tokens::Entry;
    /// use zbswitch::hal::{Pin, Pull};
    ///
    /// let descriptor = PeripheralDescriptor::classify(&Entry::new(b"SB0u"));
    /// assert_eq!(
    ///     descriptor,
    ///     Some(PeripheralDescriptor::Switch { pin: Pin::new(1, 0), pull: Pull::Up })
    /// );
    /// ```
    pub fn classify(entry: &Entry<'_>) -> Option<Self> {
        if entry.starts_with(b"SLP") {
            return Some(Self::Flag(Flag::SimultaneousPulses));
        }
        let payload = entry.payload();
        let descriptor = match entry.tag() {
            b'B' => Self::Button {
                pin: Pin::parse(payload),
                pull: Pull::parse(byte_at(payload, 2)),
            },
            b'S' => Self::Switch {
                pin: Pin::parse(payload),
                pull: Pull::parse(byte_at(payload, 2)),
            },
            b'L' => Self::Led {
                pin: Pin::parse(payload),
                active_high: byte_at(payload, 2) != b'i',
            },
            b'I' => Self::IndicatorLed {
                pin: Pin::parse(payload),
                active_high: byte_at(payload, 2) != b'i',
            },
            b'R' => Self::Relay {
                pin: Pin::parse(payload),
                off_pin: payload.get(2..).filter(|rest| !rest.is_empty()).map(Pin::parse),
            },
            b'i' => Self::ImageTypeHint(parse_int(payload)),
            b'M' => Self::Flag(Flag::MomentarySwitches),
            _ => return None,
        };
        Some(descriptor)
    }
}

fn byte_at(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(TERMINATOR)
}

/// Parse leading decimal digits; stops at the first non-digit.
pub fn parse_int(digits: &[u8]) -> u32 {
    digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u32, |n, &b| n.wrapping_mul(10).wrapping_add(u32::from(b - b'0')))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(bytes: &[u8]) -> Option<PeripheralDescriptor> {
        PeripheralDescriptor::classify(&Entry::new(bytes))
    }

    #[test]
    fn test_slp_wins_over_switch() {
        assert_eq!(
            classify(b"SLP"),
            Some(PeripheralDescriptor::Flag(Flag::SimultaneousPulses))
        );
    }

    #[test]
    fn test_inputs() {
        assert_eq!(
            classify(b"BC3d"),
            Some(PeripheralDescriptor::Button {
                pin: Pin::new(2, 3),
                pull: Pull::Down
            })
        );
        assert_eq!(
            classify(b"SA1"),
            Some(PeripheralDescriptor::Switch {
                pin: Pin::new(0, 1),
                pull: Pull::Invalid
            })
        );
        assert_eq!(
            classify(b"S B0u"),
            Some(PeripheralDescriptor::Switch {
                pin: Pin::new(1, 0),
                pull: Pull::Up
            })
        );
    }

    #[test]
    fn test_led_polarity() {
        assert_eq!(
            classify(b"LD2i"),
            Some(PeripheralDescriptor::Led {
                pin: Pin::new(3, 2),
                active_high: false
            })
        );
        assert_eq!(
            classify(b"IB1"),
            Some(PeripheralDescriptor::IndicatorLed {
                pin: Pin::new(1, 1),
                active_high: true
            })
        );
    }

    #[test]
    fn test_relays() {
        assert_eq!(
            classify(b"RB2"),
            Some(PeripheralDescriptor::Relay {
                pin: Pin::new(1, 2),
                off_pin: None
            })
        );
        assert_eq!(
            classify(b"RC2A0"),
            Some(PeripheralDescriptor::Relay {
                pin: Pin::new(2, 2),
                off_pin: Some(Pin::new(0, 0))
            })
        );
        assert_eq!(
            classify(b"RZ9x"),
            Some(PeripheralDescriptor::Relay {
                pin: Pin::INVALID,
                off_pin: Some(Pin::INVALID)
            })
        );
    }

    #[test]
    fn test_image_type_and_unknown() {
        assert_eq!(
            classify(b"i4660"),
            Some(PeripheralDescriptor::ImageTypeHint(4660))
        );
        assert_eq!(classify(b"i"), Some(PeripheralDescriptor::ImageTypeHint(0)));
        assert_eq!(classify(b"M"), Some(PeripheralDescriptor::Flag(Flag::MomentarySwitches)));
        assert_eq!(classify(b"Xyz"), None);
        assert_eq!(classify(b""), None);
    }

    #[test]
    fn test_parse_int_stops_at_non_digit() {
        assert_eq!(parse_int(b"12ab3"), 12);
        assert_eq!(parse_int(b""), 0);
    }
}
