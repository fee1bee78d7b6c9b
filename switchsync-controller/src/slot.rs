use alloc::string::String;

use switchsync_api::models::{ManualConfig, SwitchConfig, SwitchKind};

/// One controllable output plus its optional wall-switch pairing.
#[derive(Debug)]
pub struct Slot {
    pub name: String,
    pub pin: u8,
    pub kind: SwitchKind,
    /// Logical state; the electrical level depends on relay polarity.
    pub state: bool,
    pub manual: Option<ManualInput>,
}

impl Slot {
    pub fn from_config(config: &SwitchConfig, initial_raw: Option<bool>) -> Self {
        Self {
            name: config.name.clone(),
            pin: config.pin,
            kind: config.kind,
            state: config.state,
            manual: config
                .manual
                .map(|manual| ManualInput::new(manual, initial_raw.unwrap_or(manual.active_low))),
        }
    }

    /// Snapshot for persistence; `state` records the last applied state so a
    /// power cycle resumes it without the server.
    pub fn to_config(&self) -> SwitchConfig {
        SwitchConfig {
            name: self.name.clone(),
            pin: self.pin,
            kind: self.kind,
            state: self.state,
            manual: self.manual.as_ref().map(|input| input.config),
        }
    }
}

/// Debounce state machine for one manual input.
///
/// A raw level change arms the window; only a level that holds for the full
/// window becomes the stable level.
#[derive(Debug)]
pub struct ManualInput {
    pub config: ManualConfig,
    last_raw: bool,
    last_change_at: u64,
    stable: bool,
    /// Debounced logical level after polarity mapping, used to detect the
    /// active edge for momentary inputs.
    pub last_active: bool,
}

impl ManualInput {
    pub fn new(config: ManualConfig, initial_raw: bool) -> Self {
        let mut input = Self {
            config,
            last_raw: initial_raw,
            last_change_at: 0,
            stable: initial_raw,
            last_active: false,
        };
        input.last_active = input.active_level(initial_raw);
        input
    }

    /// Feed one raw sample; returns the new stable level once it has held
    /// for `window` milliseconds.
    pub fn sample(&mut self, raw: bool, now: u64, window: u64) -> Option<bool> {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change_at = now;
        }

        if raw != self.stable && now.saturating_sub(self.last_change_at) >= window {
            self.stable = raw;
            return Some(raw);
        }

        None
    }

    /// Map an electrical level to the logical active flag.
    pub fn active_level(&self, level: bool) -> bool {
        if self.config.active_low { !level } else { level }
    }
}
