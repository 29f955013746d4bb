//! Button and switch inputs.
//!
//! [`Buttons::on_pin`] is the interrupt handler registered for every button
//! pin. The dispatcher calls it once per settled burst for every pin, so it
//! compares the settled level with the last known state and queues a
//! [`ButtonEvent`] only when the contact actually moved.

use heapless::{Deque, Vec};

use crate::config::device::{ButtonSpec, DeviceConfig, MAX_BUTTONS};
use crate::hal::{Gpio, PinMode, Pull};
use crate::interrupts::PinEvent;

/// Events buffered between two drains.
pub const EVENT_QUEUE: usize = 8;

/// A debounced contact change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// The button with this index was pressed (switch closed).
    Pressed(u8),
    /// The button with this index was released (switch opened).
    Released(u8),
}

/// State of all configured buttons.
#[derive(Debug)]
pub struct Buttons {
    specs: Vec<ButtonSpec, MAX_BUTTONS>,
    pressed: [bool; MAX_BUTTONS],
    events: Deque<ButtonEvent, EVENT_QUEUE>,
}

impl Buttons {
    /// Buttons described by `config`, all released.
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            specs: config.buttons.clone(),
            pressed: [false; MAX_BUTTONS],
            events: Deque::new(),
        }
    }

    /// Configure the input pins and take the initial contact state.
    pub fn init<H: Gpio + ?Sized>(&mut self, hal: &mut H) {
        for (index, spec) in self.specs.iter().enumerate() {
            if let Err(e) = hal.configure(spec.pin, PinMode::Input(spec.pull)) {
                warn!("button {}: pin {} init failed ({})", index, spec.pin, e);
            }
            self.pressed[index] = is_active(spec.pull, hal.read(spec.pin));
        }
    }

    /// Configured buttons.
    pub fn specs(&self) -> &[ButtonSpec] {
        &self.specs
    }

    /// Whether the button is currently held.
    pub fn is_pressed(&self, index: u8) -> bool {
        self.pressed.get(usize::from(index)).copied().unwrap_or(false)
    }

    /// Next queued event.
    pub fn pop_event(&mut self) -> Option<ButtonEvent> {
        self.events.pop_front()
    }

    /// Interrupt handler; `param` is the button index.
    pub fn on_pin(ctx: &mut Buttons, event: PinEvent, param: usize) {
        let Some(spec) = ctx.specs.get(param) else {
            return;
        };
        let pressed = is_active(spec.pull, event.high);
        if pressed == ctx.pressed[param] {
            return;
        }
        ctx.pressed[param] = pressed;

        let index = param as u8;
        let change = if pressed {
            ButtonEvent::Pressed(index)
        } else {
            ButtonEvent::Released(index)
        };
        debug!("button {}: pressed {}", index, pressed);
        if ctx.events.push_back(change).is_err() {
            warn!("button {}: event queue full", index);
        }
    }
}

/// A pulled-up contact closes to ground; anything else closes to supply.
fn is_active(pull: Pull, high: bool) -> bool {
    match pull {
        Pull::Up => !high,
        Pull::Down | Pull::Floating | Pull::Invalid => high,
    }
}
