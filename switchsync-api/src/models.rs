use alloc::string::String;

use serde::{Deserialize, Serialize};

/// Category of load wired to a switch slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    Relay,
    Light,
    Fan,
    Outlet,
    Projector,
    Climate,
}

/// How a wall-switch input maps onto the slot state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ManualMode {
    /// The debounced input level is the desired state.
    Maintained,
    /// A debounced transition into the active level toggles the state.
    Momentary,
}

/// Wall-switch wiring for one slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualConfig {
    /// Input pin sampled by the controller loop.
    pub pin: u8,
    /// Active level after pull wiring; `true` means active-low.
    pub active_low: bool,
    pub mode: ManualMode,
}

/// One controllable output as pushed to a controller in `identified` and
/// `config_update` frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchConfig {
    pub name: String,
    /// Relay output pin.
    pub pin: u8,
    pub kind: SwitchKind,
    /// Logical state the slot should assume when the config is applied.
    pub state: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualConfig>,
}

/// Optional motion-sensor wiring pushed alongside the switch snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MotionConfig {
    pub pin: u8,
    /// Seconds of no motion before linked loads may be released.
    pub auto_off_secs: u16,
}

/// Reported state of one pin inside a `state_update` frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinState {
    pub pin: u8,
    pub state: bool,
}

/// Why a controller declined or failed to apply a command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Sequence number not newer than the last applied one for the pin.
    Stale,
    /// Pin is not part of the controller's current switch map.
    UnknownPin,
    /// Output driver reported an error while setting the level.
    Hardware,
    /// Command-apply queue was full; the command was dropped.
    Busy,
}

/// Admission mode reported back in the `identified` frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Secret checked, signed reports required.
    Enforced,
    /// Field-debug mode: mismatched secrets and unsigned reports are
    /// admitted with a warning.
    Permissive,
}
