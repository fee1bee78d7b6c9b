use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use switchsync_api::frame::{ServerFrame, UnitFrame};
use switchsync_api::models::{FailureReason, ManualMode, MotionConfig, PinState, SwitchConfig};
use switchsync_api::sequence::{SeqCheck, Watermark};
use switchsync_api::signature;

use crate::pins::{PinDriver, Pull};
use crate::queue::{CommandOrigin, CommandQueue, SlotCommand};
use crate::slot::Slot;
use crate::storage::ConfigStore;

/// Storage key holding the persisted switch snapshot.
const CONFIG_KEY: &str = "switchcfg";

/// Upper bound on frames waiting for the transport; oldest are dropped first
/// so a stalled link cannot grow the heap.
const MAX_OUTBOUND: usize = 64;

/// Loop timing and sizing. Defaults match the deployed hardware.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Window a manual input level must hold before it is believed.
    pub manual_debounce_ms: u64,
    /// Cadence of the command-apply queue drain.
    pub command_interval_ms: u64,
    /// Collapse window for outbound state reports.
    pub state_debounce_ms: u64,
    pub heartbeat_ms: u64,
    /// Re-send `identify` this often while connected but unadmitted.
    pub identify_retry_ms: u64,
    /// Minimum spacing of non-volatile writes.
    pub persist_min_ms: u64,
    pub queue_capacity: usize,
    /// Logical ON drives the output low (common relay boards).
    pub relay_active_low: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            manual_debounce_ms: 30,
            command_interval_ms: 100,
            state_debounce_ms: 200,
            heartbeat_ms: 30_000,
            identify_retry_ms: 10_000,
            persist_min_ms: 2_000,
            queue_capacity: 16,
            relay_active_low: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedConfig {
    switches: Vec<SwitchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    motion: Option<MotionConfig>,
}

/// Controller-unit core loop.
///
/// Pure state machine: the host feeds it inbound frames and calls
/// [`Controller::tick`] with a monotonic millisecond clock; it never touches
/// the network itself, so a stalled transport cannot starve manual-switch
/// handling. Outbound frames accumulate in a bounded queue the transport
/// drains when it can.
pub struct Controller<P: PinDriver, S: ConfigStore> {
    unit: String,
    secret: String,
    config: ControllerConfig,
    pins: P,
    store: S,

    slots: Vec<Slot>,
    motion: Option<MotionConfig>,
    queue: CommandQueue,
    /// Highest applied command sequence per output pin.
    applied_seqs: BTreeMap<u8, Watermark>,
    report_seq: u64,
    outbound: VecDeque<UnitFrame>,

    connected: bool,
    identified: bool,
    boot_at: u64,
    last_identify: u64,
    last_heartbeat: u64,
    last_state_sent: u64,
    pending_state: bool,
    last_drain: u64,
    last_persist: u64,
    dirty: bool,
}

impl<P: PinDriver, S: ConfigStore> Controller<P, S> {
    /// Build the controller and restore the last applied states from the
    /// config store, so a power cycle resumes without the server.
    pub fn new(
        unit: impl Into<String>,
        secret: impl Into<String>,
        config: ControllerConfig,
        pins: P,
        store: S,
        now: u64,
    ) -> Self {
        let queue_capacity = config.queue_capacity;
        let mut controller = Self {
            unit: unit.into(),
            secret: secret.into(),
            config,
            pins,
            store,
            slots: Vec::new(),
            motion: None,
            queue: CommandQueue::new(queue_capacity),
            applied_seqs: BTreeMap::new(),
            report_seq: 0,
            outbound: VecDeque::new(),
            connected: false,
            identified: false,
            boot_at: now,
            last_identify: now,
            last_heartbeat: now,
            last_state_sent: 0,
            pending_state: false,
            last_drain: now,
            last_persist: 0,
            dirty: false,
        };

        match controller.store.get_item(CONFIG_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<PersistedConfig>(&json) {
                Ok(saved) => {
                    info!("restored {} switches from config store", saved.switches.len());
                    controller.apply_config(&saved.switches, saved.motion, now, false);
                }
                Err(e) => warn!("discarding unreadable switch snapshot: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("config store read failed: {:?}", e),
        }

        controller
    }

    /// Transport hook: called when the link to the server comes up or goes
    /// down. Admission starts over on every fresh connection.
    pub fn set_connected(&mut self, connected: bool, now: u64) {
        self.connected = connected;
        self.identified = false;

        if connected {
            self.send_identify(now);
            self.send_state_update(now, true);
        } else {
            self.outbound.clear();
        }
    }

    /// Transport hook: one inbound frame from the server.
    pub fn handle_frame(&mut self, frame: ServerFrame, now: u64) {
        match frame {
            ServerFrame::Identified { mode, switches, motion } => {
                info!("identified by server, mode {:?}", mode);
                self.identified = true;
                // Fresh admission resets the command baseline; a restarted
                // server must not be treated as stale.
                self.applied_seqs.clear();
                self.apply_config(&switches, motion, now, true);
            }
            ServerFrame::ConfigUpdate { switches, motion } => {
                info!("config update: {} switches", switches.len());
                self.applied_seqs.clear();
                self.apply_config(&switches, motion, now, true);
            }
            ServerFrame::SwitchCommand { pin, state, seq } => {
                self.handle_switch_command(pin, state, seq);
            }
            ServerFrame::StateAck { changed } => {
                debug!("state_ack changed={}", changed);
            }
        }
    }

    /// One pass of the cooperative loop.
    pub fn tick(&mut self, now: u64) {
        if self.connected
            && !self.identified
            && now.saturating_sub(self.last_identify) >= self.config.identify_retry_ms
        {
            self.send_identify(now);
        }

        self.sample_manual_inputs(now);
        self.drain_commands(now);
        self.send_heartbeat(now);

        if self.pending_state
            && now.saturating_sub(self.last_state_sent) >= self.config.state_debounce_ms
        {
            self.send_state_update(now, true);
        }

        self.persist(now, false);
    }

    /// Take every frame waiting for the transport.
    pub fn drain_outbound(&mut self) -> Vec<UnitFrame> {
        self.outbound.drain(..).collect()
    }

    pub fn is_identified(&self) -> bool {
        self.identified
    }

    pub fn slot_state(&self, pin: u8) -> Option<bool> {
        self.slots.iter().find(|slot| slot.pin == pin).map(|slot| slot.state)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn queued_commands(&self) -> usize {
        self.queue.len()
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    fn apply_config(
        &mut self,
        switches: &[SwitchConfig],
        motion: Option<MotionConfig>,
        now: u64,
        persist: bool,
    ) {
        self.queue.clear();
        self.slots.clear();

        for config in switches {
            if let Err(e) = self.pins.configure_output(config.pin) {
                error!("output pin {} unusable: {:?}", config.pin, e);
            }
            if let Err(e) = self.pins.write(config.pin, self.output_level(config.state)) {
                error!("output pin {} write failed: {:?}", config.pin, e);
            }

            let initial_raw = config.manual.and_then(|manual| {
                let pull = if manual.active_low { Pull::Up } else { Pull::Down };
                if let Err(e) = self.pins.configure_input(manual.pin, pull) {
                    error!("manual pin {} unusable: {:?}", manual.pin, e);
                }
                self.pins.read(manual.pin).ok()
            });

            self.slots.push(Slot::from_config(config, initial_raw));
        }

        self.motion = motion;

        if persist {
            self.persist(now, true);
        }
        self.send_state_update(now, true);
    }

    fn handle_switch_command(&mut self, pin: u8, state: bool, seq: u64) {
        let Some(index) = self.slots.iter().position(|slot| slot.pin == pin) else {
            warn!("switch_command for unknown pin {}", pin);
            self.emit_switch_result(pin, false, state, false, Some(FailureReason::UnknownPin), seq);
            return;
        };

        let mark = self.applied_seqs.entry(pin).or_default();
        if mark.observe(seq) == SeqCheck::Stale {
            let actual = self.slots[index].state;
            debug!("dropping stale command pin={} seq={}", pin, seq);
            self.emit_switch_result(pin, false, state, actual, Some(FailureReason::Stale), seq);
            return;
        }

        let command = SlotCommand {
            pin,
            state,
            origin: CommandOrigin::Remote { seq },
        };
        if self.queue.push(command).is_err() {
            let actual = self.slots[index].state;
            warn!("command queue full, dropping command for pin {}", pin);
            self.emit_switch_result(pin, false, state, actual, Some(FailureReason::Busy), seq);
        }
    }

    fn sample_manual_inputs(&mut self, now: u64) {
        for i in 0..self.slots.len() {
            let slot = &mut self.slots[i];
            let Some(input) = slot.manual.as_mut() else {
                continue;
            };

            let raw = match self.pins.read(input.config.pin) {
                Ok(level) => level,
                Err(e) => {
                    warn!("manual pin {} read failed: {:?}", input.config.pin, e);
                    continue;
                }
            };

            let Some(stable) = input.sample(raw, now, self.config.manual_debounce_ms) else {
                continue;
            };

            let active = input.active_level(stable);
            let was_active = input.last_active;
            input.last_active = active;

            let command = match input.config.mode {
                // A push-button toggles on the debounced active edge only.
                ManualMode::Momentary => (active && !was_active).then_some(SlotCommand {
                    pin: slot.pin,
                    state: !slot.state,
                    origin: CommandOrigin::Manual,
                }),
                // A wall toggle's level is the desired state.
                ManualMode::Maintained => (active != slot.state).then_some(SlotCommand {
                    pin: slot.pin,
                    state: active,
                    origin: CommandOrigin::Manual,
                }),
            };

            if let Some(command) = command {
                if self.queue.push(command).is_err() {
                    warn!("command queue full, dropping manual change for pin {}", command.pin);
                }
            }
        }
    }

    fn drain_commands(&mut self, now: u64) {
        if now.saturating_sub(self.last_drain) < self.config.command_interval_ms {
            return;
        }
        self.last_drain = now;

        let Some(command) = self.queue.pop() else {
            return;
        };
        self.apply_command(command, now);
    }

    fn apply_command(&mut self, command: SlotCommand, now: u64) {
        let Some(index) = self.slots.iter().position(|slot| slot.pin == command.pin) else {
            warn!("dropping command for unmapped pin {}", command.pin);
            if let CommandOrigin::Remote { seq } = command.origin {
                self.emit_switch_result(
                    command.pin,
                    false,
                    command.state,
                    false,
                    Some(FailureReason::UnknownPin),
                    seq,
                );
            }
            return;
        };

        let level = self.output_level(command.state);
        if let Err(e) = self.pins.write(command.pin, level) {
            error!("output pin {} write failed: {:?}", command.pin, e);
            if let CommandOrigin::Remote { seq } = command.origin {
                let actual = self.slots[index].state;
                self.emit_switch_result(
                    command.pin,
                    false,
                    command.state,
                    actual,
                    Some(FailureReason::Hardware),
                    seq,
                );
            }
            return;
        }

        let changed = self.slots[index].state != command.state;
        self.slots[index].state = command.state;
        self.dirty = true;

        debug!(
            "pin {} -> {}{}",
            command.pin,
            if command.state { "ON" } else { "OFF" },
            match command.origin {
                CommandOrigin::Manual => " (manual)",
                CommandOrigin::Remote { .. } => "",
            }
        );

        if let CommandOrigin::Remote { seq } = command.origin {
            self.emit_switch_result(command.pin, true, command.state, command.state, None, seq);
        }

        if changed {
            self.send_state_update(now, false);
        }
    }

    fn emit_switch_result(
        &mut self,
        pin: u8,
        success: bool,
        requested: bool,
        actual: bool,
        reason: Option<FailureReason>,
        seq: u64,
    ) {
        let sig = (!self.secret.is_empty()).then(|| {
            signature::sign(
                &self.secret,
                &signature::switch_result_canonical(&self.unit, seq, pin, success, actual),
            )
        });

        self.push_frame(UnitFrame::SwitchResult {
            pin,
            success,
            requested,
            actual,
            reason,
            seq,
            sig,
        });
    }

    fn send_identify(&mut self, now: u64) {
        self.last_identify = now;
        self.push_frame(UnitFrame::Identify {
            unit: self.unit.clone(),
            secret: self.secret.clone(),
        });
    }

    fn send_state_update(&mut self, now: u64, force: bool) {
        if !self.connected {
            return;
        }
        if !force && now.saturating_sub(self.last_state_sent) < self.config.state_debounce_ms {
            self.pending_state = true;
            return;
        }
        self.pending_state = false;
        self.last_state_sent = now;

        let switches: Vec<PinState> = self
            .slots
            .iter()
            .map(|slot| PinState {
                pin: slot.pin,
                state: slot.state,
            })
            .collect();

        // Coarse wall-clock base with a bump keeps report numbers strictly
        // increasing even for back-to-back forced sends.
        self.report_seq = core::cmp::max(now, self.report_seq + 1);

        let sig = (!self.secret.is_empty()).then(|| {
            signature::sign(
                &self.secret,
                &signature::state_update_canonical(&self.unit, self.report_seq, &switches),
            )
        });

        self.push_frame(UnitFrame::StateUpdate {
            seq: self.report_seq,
            switches,
            sig,
        });
    }

    fn send_heartbeat(&mut self, now: u64) {
        if !self.connected || now.saturating_sub(self.last_heartbeat) < self.config.heartbeat_ms {
            return;
        }
        self.last_heartbeat = now;
        self.push_frame(UnitFrame::Heartbeat {
            uptime: now.saturating_sub(self.boot_at) / 1000,
        });
    }

    fn persist(&mut self, now: u64, force: bool) {
        if !force
            && (!self.dirty || now.saturating_sub(self.last_persist) < self.config.persist_min_ms)
        {
            return;
        }

        let snapshot = PersistedConfig {
            switches: self.slots.iter().map(Slot::to_config).collect(),
            motion: self.motion,
        };

        match serde_json::to_string(&snapshot) {
            Ok(json) => match self.store.set_item(CONFIG_KEY, &json) {
                Ok(()) => {
                    self.dirty = false;
                    self.last_persist = now;
                }
                Err(e) => warn!("config store write failed: {:?}", e),
            },
            Err(e) => warn!("snapshot serialization failed: {}", e),
        }
    }

    fn push_frame(&mut self, frame: UnitFrame) {
        if !self.connected {
            return;
        }
        if self.outbound.len() >= MAX_OUTBOUND {
            warn!("outbound queue full, dropping oldest frame");
            self.outbound.pop_front();
        }
        self.outbound.push_back(frame);
    }

    fn output_level(&self, state: bool) -> bool {
        if self.config.relay_active_low { !state } else { state }
    }
}
