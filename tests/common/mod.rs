#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use zbswitch::hal::{
    Edge, EdgeInterrupts, Gpio, GpioError, NetworkStack, NetworkStatus, OnOffCommand, Pin,
    PinMode, PressAction, Scheduler, System, TaskId,
};
use zbswitch::storage::MemoryStore;
use zbswitch::topology::Topology;

pub type Store = MemoryStore<16, 256>;

// -------------------------
// Simulated board
// -------------------------

#[derive(Debug, Default)]
pub struct Sim {
    pub now: u64,
    pub levels: HashMap<Pin, bool>,
    pub modes: HashMap<Pin, PinMode>,
    pub irq_enabled: HashMap<Pin, bool>,
    pub edges: HashMap<Pin, Edge>,
    /// Levels a pin takes on successive reads, to model contact bounce.
    pub bounce: HashMap<Pin, VecDeque<bool>>,
    /// Every output write as (time, pin, level).
    pub writes: Vec<(u64, Pin, bool)>,
    tasks: Vec<(TaskId, u64)>,
    pub factory_resets: u32,
    pub system_resets: u32,
    pub topology: Option<Topology>,
    pub image_type: Option<u32>,
    pub network: Option<NetworkStatus>,
    /// Switch activity reported to the network as (switch, action).
    pub presses: Vec<(u8, PressAction)>,
    /// Commands sent to bound devices as (switch, command).
    pub bound: Vec<(u8, OnOffCommand)>,
}

impl Sim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, pin: Pin) -> bool {
        self.levels.get(&pin).copied().unwrap_or(false)
    }

    /// Drive an input from outside. Returns whether the edge fires an interrupt.
    pub fn set_input(&mut self, pin: Pin, high: bool) -> bool {
        let before = self.level(pin);
        self.levels.insert(pin, high);
        let enabled = self.irq_enabled.get(&pin).copied().unwrap_or(false);
        let edge = match (before, high) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        };
        enabled && edge.is_some() && self.edges.get(&pin).copied() == edge
    }

    pub fn pending(&self, task: TaskId) -> Option<u64> {
        self.tasks
            .iter()
            .find(|(t, _)| *t == task)
            .map(|(_, due)| due - self.now)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Advance time by `ms`, handing every task that falls due to `handle`.
    pub fn run_for(&mut self, ms: u64, mut handle: impl FnMut(&mut Self, TaskId)) {
        let end = self.now + ms;
        while let Some(task) = self.next_due(end) {
            handle(self, task);
        }
        self.now = end;
    }

    fn next_due(&mut self, end: u64) -> Option<TaskId> {
        let (index, &(task, due)) = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, (_, due))| *due <= end)
            .min_by_key(|(index, (_, due))| (*due, *index))?;
        self.tasks.remove(index);
        self.now = due;
        Some(task)
    }

    /// Largest number of `coils` driven high at the same time.
    pub fn max_concurrent_high(&self, coils: &[Pin]) -> usize {
        let mut high: HashMap<Pin, bool> = HashMap::new();
        let mut max = 0;
        for &(_, pin, level) in &self.writes {
            if coils.contains(&pin) {
                high.insert(pin, level);
                max = max.max(high.values().filter(|&&h| h).count());
            }
        }
        max
    }

    /// Number of low-to-high transitions written to `pin`.
    pub fn rising_writes(&self, pin: Pin) -> usize {
        let mut last = false;
        let mut count = 0;
        for &(_, p, level) in &self.writes {
            if p == pin {
                if level && !last {
                    count += 1;
                }
                last = level;
            }
        }
        count
    }
}

impl Gpio for Sim {
    fn configure(&mut self, pin: Pin, mode: PinMode) -> Result<(), GpioError> {
        if !pin.is_valid() {
            return Err(GpioError::InvalidPin);
        }
        self.modes.insert(pin, mode);
        Ok(())
    }

    fn write(&mut self, pin: Pin, high: bool) {
        self.levels.insert(pin, high);
        self.writes.push((self.now, pin, high));
    }

    fn read(&mut self, pin: Pin) -> bool {
        if let Some(level) = self.bounce.get_mut(&pin).and_then(VecDeque::pop_front) {
            self.levels.insert(pin, level);
        }
        self.level(pin)
    }
}

impl EdgeInterrupts for Sim {
    fn irq_enable(&mut self, pin: Pin) {
        self.irq_enabled.insert(pin, true);
    }

    fn irq_disable(&mut self, pin: Pin) {
        self.irq_enabled.insert(pin, false);
    }

    fn irq_set_edge(&mut self, pin: Pin, edge: Edge) {
        self.edges.insert(pin, edge);
    }
}

impl Scheduler for Sim {
    fn schedule(&mut self, task: TaskId, delay_ms: u16) {
        self.unschedule(task);
        self.tasks.push((task, self.now + u64::from(delay_ms)));
    }

    fn unschedule(&mut self, task: TaskId) {
        self.tasks.retain(|(t, _)| *t != task);
    }
}

impl System for Sim {
    fn factory_reset(&mut self) {
        self.factory_resets += 1;
    }

    fn system_reset(&mut self) {
        self.system_resets += 1;
    }
}

impl NetworkStack for Sim {
    fn init(&mut self, topology: &Topology) {
        self.topology = Some(topology.clone());
    }

    fn set_image_type(&mut self, image_type: u32) {
        self.image_type = Some(image_type);
    }

    fn status(&self) -> NetworkStatus {
        self.network.unwrap_or(NetworkStatus::NotJoined)
    }

    fn report_press(&mut self, switch_idx: u8, action: PressAction) {
        self.presses.push((switch_idx, action));
    }

    fn send_bound(&mut self, switch_idx: u8, command: OnOffCommand) {
        self.bound.push((switch_idx, command));
    }
}

pub fn pin(spec: &str) -> Pin {
    Pin::parse(spec.as_bytes())
}
