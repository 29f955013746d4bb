//! # Device orchestration
//!
//! [`Device`] owns every runtime piece and wires them to the platform:
//!
//! ```text
//!                 ┌──────────────────────── Device ────────────────────────┐
//! edge IRQ ──────▶│ Dispatcher ──▶ Buttons ──▶ switch / reset handling     │
//!                 │                                 │                      │
//! TaskId ────────▶│ RelayPulse ─▶ Relays ◀──────────┘     ResetScheduler   │
//!                 │ GpioDispatch / ButtonHold / Reset ────────▶            │
//! net status ────▶│ NetworkIndicator                                       │
//!                 └────────────────────────────────────────────────────────┘
//! ```
//!
//! The platform forwards three kinds of notifications: raw edge interrupts
//! ([`Device::on_edge_interrupt`]), fired tasks ([`Device::on_task`]) and
//! network status changes ([`Device::on_network_status_change`]).
//!
//! A toggle switch acts on every flip. A momentary switch reports press, long
//! press and release to the network; its relay and its bound devices follow
//! at the press stage chosen by the switch's relay mode and binded mode.

use crate::buttons::{ButtonEvent, Buttons};
use crate::config::device::{
    ButtonAction, DeviceConfig, MAX_SWITCHES, PressStage, RESET_LONG_PRESS_MS, RelayMode,
    SwitchAction, SwitchMode, SwitchSpec,
};
use crate::config::{self, Compiled, ConfigBuffer, ConfigError, nv};
use crate::hal::{NetworkStatus, OnOffCommand, Platform, PressAction, TaskId};
use crate::indicator::{Led, NetworkIndicator};
use crate::interrupts::Dispatcher;
use crate::relay::Relays;
use crate::storage::records::{self, BasicClusterRecord, RelayClusterRecord, SwitchClusterRecord};
use crate::storage::{KeyValueStore, items};
use crate::system::migrations::{self, DeviceType};
use crate::system::reset::{self, ResetScheduler};
use crate::topology::Topology;

/// A booted switch/relay device.
#[derive(Debug)]
pub struct Device<S: KeyValueStore> {
    store: S,
    config_string: ConfigBuffer,
    compiled: Compiled,
    relays: Relays,
    buttons: Buttons,
    dispatcher: Dispatcher<Buttons>,
    network: NetworkIndicator,
    resets: ResetScheduler,
    long_pressed: [bool; MAX_SWITCHES],
}

impl<S: KeyValueStore> Device<S> {
    /// Bring the device up.
    ///
    /// Checks the stored layout, compiles the stored configuration (or the
    /// default one), configures every pin, registers the inputs and hands the
    /// topology to the network stack.
    ///
    /// # Errors
    ///
    /// A fatal [`ConfigError`] from compiling the configuration. The full
    /// reset has already been performed when this returns; the network stack
    /// never sees a topology.
    pub fn boot<H: Platform + ?Sized>(
        hal: &mut H,
        mut store: S,
        role: DeviceType,
    ) -> Result<Self, ConfigError> {
        migrations::check_version(&mut store);

        let mut config_string = nv::read_config(&mut store);
        debug!("config: {}", config_string.as_bytes());
        let mut compiled = match config::compile(&mut config_string) {
            Ok(compiled) => compiled,
            Err(e) => {
                error!("config: fatal error {}", e);
                reset::reset_all(hal, &mut store);
                return Err(e);
            }
        };
        apply_switch_records(&mut store, &mut compiled.config);

        if let Some(image_type) = compiled.config.image_type {
            hal.set_image_type(image_type);
        }

        let mut relays = Relays::new(&compiled.config);
        relays.init(hal);

        for led in compiled.config.leds.iter() {
            Led::new(*led).init(hal);
        }
        let mut network = NetworkIndicator::new(&compiled.config);
        if let Ok(basic) = records::load::<_, BasicClusterRecord>(&mut store, items::BASIC_CLUSTER_DATA) {
            network.set_manual_state(hal, basic.network_led_on);
        }

        let mut buttons = Buttons::new(&compiled.config);
        buttons.init(hal);
        let mut dispatcher = Dispatcher::new();
        for (index, spec) in compiled.config.buttons.iter().enumerate() {
            if let Err(e) = dispatcher.register(hal, spec.pin, Buttons::on_pin, index) {
                warn!("button {}: no interrupt ({})", index, e);
            }
        }

        hal.init(&compiled.topology);

        let mut device = Self {
            store,
            config_string,
            compiled,
            relays,
            buttons,
            dispatcher,
            network,
            resets: ResetScheduler::new(),
            long_pressed: [false; MAX_SWITCHES],
        };
        device.restore_relays(hal);
        let status = hal.status();
        device.on_network_status_change(hal, status);
        migrations::check_device_type(hal, &mut device.store, &mut device.resets, role);

        Ok(device)
    }

    /// Route a fired task.
    pub fn on_task<H: Platform + ?Sized>(&mut self, hal: &mut H, task: TaskId) {
        match task {
            TaskId::RelayPulse(index) => self.relays.on_pulse_task(hal, index),
            TaskId::GpioDispatch => {
                self.dispatcher.on_dispatch_task(hal, &mut self.buttons);
                self.handle_button_events(hal);
            }
            TaskId::ButtonHold(index) => self.on_button_hold(hal, index),
            TaskId::Reset => self.resets.on_reset_task(hal, &mut self.store),
        }
    }

    /// Forward a raw edge interrupt on any registered pin.
    pub fn on_edge_interrupt<H: Platform + ?Sized>(&mut self, hal: &mut H) {
        self.dispatcher.on_edge_interrupt(hal);
    }

    /// Update the indicators for a new network status.
    pub fn on_network_status_change<H: Platform + ?Sized>(&mut self, hal: &mut H, status: NetworkStatus) {
        self.network.apply(hal, status);
        if status == NetworkStatus::Joined {
            self.relays.sync_indicators(hal);
        }
    }

    /// Switch a relay and persist its state.
    pub fn set_relay<H: Platform + ?Sized>(&mut self, hal: &mut H, index: u8, on: bool) {
        if self.relays.get(index).is_none() {
            warn!("relay {}: no such relay", index);
            return;
        }
        self.relays.set(hal, index, on);
        let record = RelayClusterRecord { on };
        if let Err(e) = records::store(&mut self.store, items::relay_cluster_data(index), &record) {
            error!("relay {}: state write failed ({})", index, e);
        }
    }

    /// Invert a relay and persist its state.
    pub fn toggle_relay<H: Platform + ?Sized>(&mut self, hal: &mut H, index: u8) {
        let on = !self.relays.is_on(index);
        self.set_relay(hal, index, on);
    }

    /// Change the switch type and persist it. Returns `false` for unknown
    /// switches, as do the other switch setters.
    pub fn set_switch_mode(&mut self, switch_idx: u8, mode: SwitchMode) -> bool {
        self.update_switch(switch_idx, |switch| switch.mode = mode)
    }

    /// Change what a switch activation does and persist it.
    pub fn set_switch_action(&mut self, switch_idx: u8, action: SwitchAction) -> bool {
        self.update_switch(switch_idx, |switch| switch.action = action)
    }

    /// Change when the local relay follows a momentary switch and persist it.
    pub fn set_relay_mode(&mut self, switch_idx: u8, relay_mode: RelayMode) -> bool {
        self.update_switch(switch_idx, |switch| switch.relay_mode = relay_mode)
    }

    /// Change when bound devices are commanded and persist it.
    pub fn set_binded_mode(&mut self, switch_idx: u8, binded_mode: PressStage) -> bool {
        self.update_switch(switch_idx, |switch| switch.binded_mode = binded_mode)
    }

    /// Bind a switch to a relay (one-based, zero for none) and persist it.
    pub fn set_relay_index(&mut self, switch_idx: u8, relay_index: u8) -> bool {
        self.update_switch(switch_idx, |switch| switch.relay_index = relay_index)
    }

    /// Change the long-press time of a switch and persist it.
    pub fn set_long_press_ms(&mut self, switch_idx: u8, long_press_ms: u16) -> bool {
        self.update_switch(switch_idx, |switch| switch.long_press_ms = long_press_ms)
    }

    /// Change the dimming rate of a switch and persist it.
    pub fn set_level_move_rate(&mut self, switch_idx: u8, level_move_rate: u8) -> bool {
        self.update_switch(switch_idx, |switch| switch.level_move_rate = level_move_rate)
    }

    /// Show or hide the dedicated status LED while joined, and persist it.
    pub fn set_status_led<H: Platform + ?Sized>(&mut self, hal: &mut H, on: bool) {
        self.network.set_manual_state(hal, on);
        let record = BasicClusterRecord { network_led_on: on };
        if let Err(e) = records::store(&mut self.store, items::BASIC_CLUSTER_DATA, &record) {
            error!("basic: write failed ({})", e);
        }
    }

    /// Accept a new configuration string.
    ///
    /// The string is stored and a reboot is scheduled; the running device
    /// keeps its current personality until then. A store failure is logged
    /// and the reboot still happens.
    ///
    /// # Errors
    ///
    /// `ConfigTooLong` if the string does not fit the configuration buffer.
    pub fn write_config<H: Platform + ?Sized>(&mut self, hal: &mut H, bytes: &[u8]) -> Result<(), ConfigError> {
        let buffer = ConfigBuffer::from_bytes(bytes)?;
        let _ = nv::write_config(&mut self.store, &buffer);
        self.config_string = buffer;
        self.resets.schedule_reboot(hal, 0);
        Ok(())
    }

    /// The configuration string, as reported by the config attribute.
    pub fn config_string(&self) -> &ConfigBuffer {
        &self.config_string
    }

    /// Compiled peripheral descriptors.
    pub fn config(&self) -> &DeviceConfig {
        &self.compiled.config
    }

    /// Topology handed to the network stack.
    pub fn topology(&self) -> &Topology {
        &self.compiled.topology
    }

    /// Relay bank.
    pub fn relays(&self) -> &Relays {
        &self.relays
    }

    /// Mutable relay bank, e.g. to register state callbacks.
    pub fn relays_mut(&mut self) -> &mut Relays {
        &mut self.relays
    }

    /// Button states.
    pub fn buttons(&self) -> &Buttons {
        &self.buttons
    }

    /// Interrupt dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<Buttons> {
        &self.dispatcher
    }

    /// Network indicator.
    pub fn network_indicator(&self) -> &NetworkIndicator {
        &self.network
    }

    /// Pending reset.
    pub fn resets(&self) -> &ResetScheduler {
        &self.resets
    }

    /// Backing store.
    pub fn store(&mut self) -> &mut S {
        &mut self.store
    }

    fn handle_button_events<H: Platform + ?Sized>(&mut self, hal: &mut H) {
        while let Some(event) = self.buttons.pop_event() {
            let (index, closed) = match event {
                ButtonEvent::Pressed(index) => (index, true),
                ButtonEvent::Released(index) => (index, false),
            };
            let Some(spec) = self.buttons.specs().get(usize::from(index)).copied() else {
                continue;
            };
            match spec.action {
                ButtonAction::FactoryReset if closed => {
                    hal.schedule(TaskId::ButtonHold(index), RESET_LONG_PRESS_MS);
                }
                ButtonAction::FactoryReset => hal.unschedule(TaskId::ButtonHold(index)),
                ButtonAction::Switch(switch_idx) => self.on_switch_contact(hal, switch_idx, closed),
            }
        }
    }

    fn on_button_hold<H: Platform + ?Sized>(&mut self, hal: &mut H, index: u8) {
        let Some(spec) = self.buttons.specs().get(usize::from(index)).copied() else {
            return;
        };
        match spec.action {
            ButtonAction::FactoryReset => {
                if self.buttons.is_pressed(index) {
                    info!("button {}: long press, factory reset", index);
                    self.resets.schedule_full_reset(hal, 0);
                }
            }
            ButtonAction::Switch(switch_idx) => {
                let Some(switch) = self.switch(switch_idx) else {
                    return;
                };
                // A normally-closed switch is held while its contact is open.
                let closed = self.buttons.is_pressed(switch.button);
                let held = closed != (switch.mode == SwitchMode::MomentaryNc);
                if !switch.mode.is_momentary() || !held {
                    return;
                }
                self.long_pressed[usize::from(switch_idx)] = true;
                hal.report_press(switch_idx, PressAction::LongPress);
                self.on_press_stage(hal, &switch, PressStage::LongPress);
            }
        }
    }

    fn on_switch_contact<H: Platform + ?Sized>(&mut self, hal: &mut H, switch_idx: u8, closed: bool) {
        let Some(switch) = self.switch(switch_idx) else {
            return;
        };
        let hold = TaskId::ButtonHold(switch.button);
        match switch.mode {
            SwitchMode::Toggle => {
                let action = if closed {
                    PressAction::PositionOn
                } else {
                    PressAction::PositionOff
                };
                hal.report_press(switch_idx, action);
                if switch.relay_mode != RelayMode::Detached {
                    self.drive_relay(hal, &switch, Some(closed));
                }
                let command = self.bound_command(&switch, Some(closed));
                hal.send_bound(switch_idx, command);
            }
            SwitchMode::Momentary | SwitchMode::MomentaryNc => {
                let pressed = closed != (switch.mode == SwitchMode::MomentaryNc);
                if pressed {
                    self.long_pressed[usize::from(switch_idx)] = false;
                    hal.report_press(switch_idx, PressAction::Press);
                    hal.schedule(hold, switch.long_press_ms);
                    self.on_press_stage(hal, &switch, PressStage::PressStart);
                } else {
                    hal.unschedule(hold);
                    hal.report_press(switch_idx, PressAction::Released);
                    if !self.long_pressed[usize::from(switch_idx)] {
                        self.on_press_stage(hal, &switch, PressStage::ShortPress);
                    }
                }
            }
        }
    }

    fn on_press_stage<H: Platform + ?Sized>(&mut self, hal: &mut H, switch: &SwitchSpec, stage: PressStage) {
        if switch.relay_mode == RelayMode::At(stage) {
            self.drive_relay(hal, switch, None);
        }
        if switch.binded_mode == stage {
            let command = self.bound_command(switch, None);
            hal.send_bound(switch.index, command);
        }
    }

    /// `position` is the contact state of a toggle switch; momentary presses
    /// have none and always toggle.
    fn drive_relay<H: Platform + ?Sized>(&mut self, hal: &mut H, switch: &SwitchSpec, position: Option<bool>) {
        let Some(relay) = switch.relay_index.checked_sub(1) else {
            return;
        };
        let on = match (switch.action, position) {
            (SwitchAction::OnOff, Some(closed)) => closed,
            (SwitchAction::OffOn, Some(closed)) => !closed,
            _ => !self.relays.is_on(relay),
        };
        self.set_relay(hal, relay, on);
    }

    fn bound_command(&self, switch: &SwitchSpec, position: Option<bool>) -> OnOffCommand {
        let relay_on = switch
            .relay_index
            .checked_sub(1)
            .and_then(|relay| self.relays.get(relay))
            .map(|relay| relay.is_on());
        match (switch.action, position, relay_on) {
            (SwitchAction::OnOff, Some(closed), _) => OnOffCommand::from_state(closed),
            (SwitchAction::OffOn, Some(closed), _) => OnOffCommand::from_state(!closed),
            (SwitchAction::ToggleSmartSync, _, Some(on)) => OnOffCommand::from_state(on),
            (SwitchAction::ToggleSmartOpposite, _, Some(on)) => OnOffCommand::from_state(!on),
            _ => OnOffCommand::Toggle,
        }
    }

    fn switch(&self, switch_idx: u8) -> Option<SwitchSpec> {
        self.compiled.config.switches.get(usize::from(switch_idx)).copied()
    }

    fn update_switch(&mut self, switch_idx: u8, update: impl FnOnce(&mut SwitchSpec)) -> bool {
        let Some(switch) = self.compiled.config.switches.get_mut(usize::from(switch_idx)) else {
            return false;
        };
        update(switch);
        let record = switch_record(switch);
        if let Err(e) = records::store(&mut self.store, items::switch_cluster_data(switch_idx), &record) {
            error!("switch {}: settings write failed ({})", switch_idx, e);
        }
        true
    }

    fn restore_relays<H: Platform + ?Sized>(&mut self, hal: &mut H) {
        for index in 0..self.relays.len() as u8 {
            let key = items::relay_cluster_data(index);
            if let Ok(RelayClusterRecord { on: true }) = records::load(&mut self.store, key) {
                self.relays.turn_on(hal, index);
            }
        }
    }
}

fn apply_switch_records<S: KeyValueStore + ?Sized>(store: &mut S, config: &mut DeviceConfig) {
    for switch in config.switches.iter_mut() {
        let key = items::switch_cluster_data(switch.index);
        if let Ok(record) = records::load::<_, SwitchClusterRecord>(store, key) {
            apply_switch_record(switch, &record);
        }
    }
}

fn switch_record(switch: &SwitchSpec) -> SwitchClusterRecord {
    SwitchClusterRecord {
        mode: switch.mode.code(),
        action: switch.action.code(),
        relay_mode: switch.relay_mode.code(),
        binded_mode: switch.binded_mode.code(),
        relay_index: switch.relay_index,
        long_press_ms: switch.long_press_ms,
        level_move_rate: switch.level_move_rate,
    }
}

/// Unknown codes leave the compiled default in place.
fn apply_switch_record(switch: &mut SwitchSpec, record: &SwitchClusterRecord) {
    if let Some(mode) = SwitchMode::from_code(record.mode) {
        switch.mode = mode;
    }
    if let Some(action) = SwitchAction::from_code(record.action) {
        switch.action = action;
    }
    if let Some(relay_mode) = RelayMode::from_code(record.relay_mode) {
        switch.relay_mode = relay_mode;
    }
    if let Some(binded_mode) = PressStage::from_code(record.binded_mode) {
        switch.binded_mode = binded_mode;
    }
    switch.relay_index = record.relay_index;
    switch.long_press_ms = record.long_press_ms;
    switch.level_move_rate = record.level_move_rate;
}
