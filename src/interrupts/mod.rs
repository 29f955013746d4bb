//! # Debounced interrupt dispatcher
//!
//! Mechanical contacts bounce, and every bounce is a raw edge interrupt. The
//! dispatcher turns a burst of raw edges into one settled notification:
//!
//! ```text
//! raw edge ──▶ disable all pin IRQs ──▶ schedule GpioDispatch (1..6 ms)
//!                                             │
//!     ┌───────────────────────────────────────┘
//!     ▼
//! snapshot levels ──▶ arm opposite edges ──▶ snapshot again ──▶ equal? ──no──┐
//!     ▲                                                          │ yes      │
//!     └──────────────────────── (at most 50 tries) ◀─────────────┼──────────┘
//!                                                                ▼
//!                                     enable all pin IRQs ──▶ call every handler
//! ```
//!
//! Handlers are plain function pointers taking a caller-supplied context, the
//! settled [`PinEvent`] and the parameter given at registration. Every handler
//! is called once per settled burst; working out what changed is up to the
//! handler.

use crate::hal::{Edge, InterruptHal, Pin, TaskId};

/// Slots in the handler table.
pub const MAX_SLOTS: usize = 16;

/// Ceiling of the settle loop.
pub const SETTLE_TRIES: u8 = 50;

const PAUSE_SEED: u16 = 3;
const PAUSE_MULTIPLIER: u16 = 3;
const PAUSE_MODULUS: u16 = 7;

/// Settled level of a registered pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
    /// The pin.
    pub pin: Pin,
    /// Level read at the end of the settle loop.
    pub high: bool,
}

/// Interrupt handler: context, settled pin level, registration parameter.
pub type InterruptFn<C> = fn(ctx: &mut C, event: PinEvent, param: usize);

/// Errors of handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptError {
    /// Every slot is taken by another pin.
    TableFull,
    /// The pin is [`Pin::INVALID`].
    InvalidPin,
}

#[cfg(feature = "defmt")]
impl defmt::Format for InterruptError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            InterruptError::TableFull => defmt::write!(f, "TableFull"),
            InterruptError::InvalidPin => defmt::write!(f, "InvalidPin"),
        }
    }
}

/// One handler slot. Empty slots carry [`Pin::INVALID`].
#[derive(Debug)]
struct Slot<C> {
    pin: Pin,
    handler: Option<InterruptFn<C>>,
    param: usize,
}

impl<C> Slot<C> {
    const EMPTY: Self = Self {
        pin: Pin::INVALID,
        handler: None,
        param: 0,
    };

    fn in_use(&self) -> bool {
        self.pin.is_valid()
    }
}

/// Pin handler table and settle state.
#[derive(Debug)]
pub struct Dispatcher<C> {
    slots: [Slot<C>; MAX_SLOTS],
    pause: u16,
    dispatches: u32,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::EMPTY),
            pause: PAUSE_SEED,
            dispatches: 0,
        }
    }

    /// Register `handler` for `pin` and enable its raw interrupt.
    ///
    /// Registering a pin again replaces its handler and parameter.
    ///
    /// # Errors
    ///
    /// - `InvalidPin` for [`Pin::INVALID`]
    /// - `TableFull` when no slot is free
    pub fn register<H: InterruptHal + ?Sized>(
        &mut self,
        hal: &mut H,
        pin: Pin,
        handler: InterruptFn<C>,
        param: usize,
    ) -> Result<(), InterruptError> {
        if !pin.is_valid() {
            return Err(InterruptError::InvalidPin);
        }
        let index = self
            .position(pin)
            .or_else(|| self.slots.iter().position(|slot| !slot.in_use()))
            .ok_or_else(|| {
                warn!("irq: table full, dropping {}", pin);
                InterruptError::TableFull
            })?;

        self.slots[index] = Slot {
            pin,
            handler: Some(handler),
            param,
        };
        let high = hal.read(pin);
        hal.irq_set_edge(pin, opposite_edge(high));
        hal.irq_enable(pin);
        Ok(())
    }

    /// Disable the raw interrupt of `pin` and free its slot.
    ///
    /// Returns `false` if the pin was not registered. A dispatch already
    /// scheduled simply skips the freed slot.
    pub fn unregister<H: InterruptHal + ?Sized>(&mut self, hal: &mut H, pin: Pin) -> bool {
        match self.position(pin) {
            Some(index) => {
                hal.irq_disable(pin);
                self.slots[index] = Slot::EMPTY;
                true
            }
            None => false,
        }
    }

    /// Whether `pin` has a handler.
    pub fn is_registered(&self, pin: Pin) -> bool {
        self.position(pin).is_some()
    }

    /// Number of registered pins.
    pub fn registered(&self) -> usize {
        self.slots.iter().filter(|slot| slot.in_use()).count()
    }

    /// Number of settle-and-dispatch passes run so far.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }

    /// Handle a raw edge on any registered pin.
    ///
    /// Disables every pin interrupt and defers the settle pass by a short
    /// delay that varies from burst to burst.
    pub fn on_edge_interrupt<H: InterruptHal + ?Sized>(&mut self, hal: &mut H) {
        for slot in self.slots.iter().filter(|slot| slot.in_use()) {
            hal.irq_disable(slot.pin);
        }
        hal.schedule(TaskId::GpioDispatch, self.pause);
        self.pause = self.pause * PAUSE_MULTIPLIER % PAUSE_MODULUS;
    }

    /// Run the deferred settle-and-dispatch pass.
    pub fn on_dispatch_task<H: InterruptHal + ?Sized>(&mut self, hal: &mut H, ctx: &mut C) {
        let mut levels = self.snapshot(hal);
        let mut settled = false;
        for _ in 0..SETTLE_TRIES {
            for (index, slot) in self.slots.iter().enumerate() {
                if slot.in_use() {
                    hal.irq_set_edge(slot.pin, opposite_edge(level(levels, index)));
                }
            }
            let again = self.snapshot(hal);
            if again == levels {
                settled = true;
                break;
            }
            levels = again;
        }
        if !settled {
            warn!("irq: pins still bouncing after {} tries", SETTLE_TRIES);
        }

        for slot in self.slots.iter().filter(|slot| slot.in_use()) {
            hal.irq_enable(slot.pin);
        }

        self.dispatches = self.dispatches.wrapping_add(1);
        for (index, slot) in self.slots.iter().enumerate() {
            if let (true, Some(handler)) = (slot.in_use(), slot.handler) {
                let event = PinEvent {
                    pin: slot.pin,
                    high: level(levels, index),
                };
                handler(ctx, event, slot.param);
            }
        }
    }

    fn position(&self, pin: Pin) -> Option<usize> {
        if !pin.is_valid() {
            return None;
        }
        self.slots.iter().position(|slot| slot.pin == pin)
    }

    fn snapshot<H: InterruptHal + ?Sized>(&self, hal: &mut H) -> u16 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.in_use())
            .fold(0u16, |levels, (index, slot)| {
                if hal.read(slot.pin) {
                    levels | (1 << index)
                } else {
                    levels
                }
            })
    }
}

fn level(levels: u16, index: usize) -> bool {
    levels & (1 << index) != 0
}

/// Edge that fires on the next real transition away from `high`.
fn opposite_edge(high: bool) -> Edge {
    if high { Edge::Falling } else { Edge::Rising }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{EdgeInterrupts, Gpio, GpioError, PinMode, Scheduler};

    #[derive(Default)]
    struct Sim {
        high: heapless::FnvIndexMap<u16, bool, 16>,
        enabled: heapless::FnvIndexMap<u16, bool, 16>,
        edges: heapless::FnvIndexMap<u16, Edge, 16>,
        scheduled: Option<(TaskId, u16)>,
        // Remaining level flips of a bouncing pin, applied one per read pass.
        bounces: u8,
        bouncing: Option<Pin>,
        reads: u32,
    }

    impl Gpio for Sim {
        fn configure(&mut self, _pin: Pin, _mode: PinMode) -> Result<(), GpioError> {
            Ok(())
        }
        fn write(&mut self, pin: Pin, high: bool) {
            self.high.insert(pin.raw(), high).unwrap();
        }
        fn read(&mut self, pin: Pin) -> bool {
            self.reads += 1;
            if self.bouncing == Some(pin) && self.bounces > 0 {
                self.bounces -= 1;
                let level = !self.high.get(&pin.raw()).copied().unwrap_or(false);
                self.high.insert(pin.raw(), level).unwrap();
            }
            self.high.get(&pin.raw()).copied().unwrap_or(false)
        }
    }

    impl EdgeInterrupts for Sim {
        fn irq_enable(&mut self, pin: Pin) {
            self.enabled.insert(pin.raw(), true).unwrap();
        }
        fn irq_disable(&mut self, pin: Pin) {
            self.enabled.insert(pin.raw(), false).unwrap();
        }
        fn irq_set_edge(&mut self, pin: Pin, edge: Edge) {
            self.edges.insert(pin.raw(), edge).unwrap();
        }
    }

    impl Scheduler for Sim {
        fn schedule(&mut self, task: TaskId, delay_ms: u16) {
            self.scheduled = Some((task, delay_ms));
        }
        fn unschedule(&mut self, _task: TaskId) {
            self.scheduled = None;
        }
    }

    #[derive(Default)]
    struct Seen {
        events: heapless::Vec<(PinEvent, usize), 16>,
    }

    fn record(ctx: &mut Seen, event: PinEvent, param: usize) {
        ctx.events.push((event, param)).unwrap();
    }

    fn record_twice(ctx: &mut Seen, event: PinEvent, param: usize) {
        record(ctx, event, param * 2);
    }

    const A0: Pin = Pin::new(0, 0);
    const B3: Pin = Pin::new(1, 3);

    #[test]
    fn test_register_enables_and_arms() {
        let mut sim = Sim::default();
        sim.write(B3, true);
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        dispatcher.register(&mut sim, B3, record, 1).unwrap();
        assert_eq!(sim.enabled.get(&B3.raw()), Some(&true));
        assert_eq!(sim.edges.get(&B3.raw()), Some(&Edge::Falling));
        assert_eq!(
            dispatcher.register(&mut sim, Pin::INVALID, record, 0),
            Err(InterruptError::InvalidPin)
        );
    }

    #[test]
    fn test_reregister_replaces_slot() {
        let mut sim = Sim::default();
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        dispatcher.register(&mut sim, A0, record, 1).unwrap();
        dispatcher.register(&mut sim, A0, record_twice, 5).unwrap();
        assert_eq!(dispatcher.registered(), 1);

        let mut seen = Seen::default();
        dispatcher.on_dispatch_task(&mut sim, &mut seen);
        assert_eq!(seen.events.len(), 1);
        assert_eq!(seen.events[0].1, 10);
    }

    #[test]
    fn test_table_full() {
        let mut sim = Sim::default();
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        let mut count = 0;
        for port in 0..Pin::PORTS {
            for number in 0..=Pin::MAX_NUMBER {
                if count < MAX_SLOTS {
                    dispatcher.register(&mut sim, Pin::new(port, number), record, 0).unwrap();
                    count += 1;
                }
            }
        }
        assert_eq!(
            dispatcher.register(&mut sim, Pin::new(3, 8), record, 0),
            Err(InterruptError::TableFull)
        );
    }

    #[test]
    fn test_edge_disables_all_and_defers() {
        let mut sim = Sim::default();
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        dispatcher.register(&mut sim, A0, record, 0).unwrap();
        dispatcher.register(&mut sim, B3, record, 0).unwrap();

        let mut delays = heapless::Vec::<u16, 8>::new();
        for _ in 0..7 {
            dispatcher.on_edge_interrupt(&mut sim);
            let (task, delay) = sim.scheduled.unwrap();
            assert_eq!(task, TaskId::GpioDispatch);
            delays.push(delay).unwrap();
        }
        assert_eq!(&delays[..], &[3, 2, 6, 4, 5, 1, 3]);
        assert_eq!(sim.enabled.get(&A0.raw()), Some(&false));
        assert_eq!(sim.enabled.get(&B3.raw()), Some(&false));
    }

    #[test]
    fn test_settles_bouncing_pin() {
        let mut sim = Sim::default();
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        dispatcher.register(&mut sim, A0, record, 3).unwrap();
        sim.bouncing = Some(A0);
        sim.bounces = 5;

        dispatcher.on_edge_interrupt(&mut sim);
        let mut seen = Seen::default();
        dispatcher.on_dispatch_task(&mut sim, &mut seen);

        // Five flips end on the opposite level.
        assert_eq!(seen.events.len(), 1);
        assert_eq!(seen.events[0].0, PinEvent { pin: A0, high: true });
        assert_eq!(sim.edges.get(&A0.raw()), Some(&Edge::Falling));
        assert_eq!(sim.enabled.get(&A0.raw()), Some(&true));
        assert_eq!(dispatcher.dispatches(), 1);
    }

    #[test]
    fn test_gives_up_after_ceiling() {
        let mut sim = Sim::default();
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        dispatcher.register(&mut sim, A0, record, 0).unwrap();
        sim.bouncing = Some(A0);
        sim.bounces = u8::MAX;
        sim.reads = 0;

        let mut seen = Seen::default();
        dispatcher.on_dispatch_task(&mut sim, &mut seen);
        assert_eq!(sim.reads, 1 + u32::from(SETTLE_TRIES));
        assert_eq!(seen.events.len(), 1);
        assert_eq!(sim.enabled.get(&A0.raw()), Some(&true));
    }

    #[test]
    fn test_unregister_skips_slot() {
        let mut sim = Sim::default();
        let mut dispatcher: Dispatcher<Seen> = Dispatcher::new();
        dispatcher.register(&mut sim, A0, record, 0).unwrap();
        dispatcher.register(&mut sim, B3, record, 1).unwrap();
        dispatcher.on_edge_interrupt(&mut sim);
        assert!(dispatcher.unregister(&mut sim, A0));
        assert!(!dispatcher.unregister(&mut sim, A0));

        let mut seen = Seen::default();
        dispatcher.on_dispatch_task(&mut sim, &mut seen);
        assert_eq!(seen.events.len(), 1);
        assert_eq!(seen.events[0].0.pin, B3);
        assert_eq!(sim.enabled.get(&A0.raw()), Some(&false));
    }
}
