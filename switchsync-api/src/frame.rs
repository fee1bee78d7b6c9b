use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::models::{FailureReason, GateMode, MotionConfig, PinState, SwitchConfig};

/// Frames sent by a controller unit to the server.
///
/// One JSON object per text frame, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitFrame {
    /// Admission request; must be the first frame on a fresh connection.
    Identify { unit: String, secret: String },
    /// Periodic or change-triggered snapshot of every slot.
    StateUpdate {
        seq: u64,
        switches: Vec<PinState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sig: Option<String>,
    },
    /// Authoritative outcome of a single `switch_command`.
    SwitchResult {
        pin: u8,
        success: bool,
        requested: bool,
        actual: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<FailureReason>,
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sig: Option<String>,
    },
    /// Liveness beacon; `uptime` is seconds since controller boot.
    Heartbeat { uptime: u64 },
}

/// Frames sent by the server to a controller unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Admission acknowledgement plus the current switch snapshot.
    Identified {
        mode: GateMode,
        switches: Vec<SwitchConfig>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        motion: Option<MotionConfig>,
    },
    /// Full topology push after an administrative edit.
    ConfigUpdate {
        switches: Vec<SwitchConfig>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        motion: Option<MotionConfig>,
    },
    /// Single sequenced output command.
    SwitchCommand { pin: u8, state: bool, seq: u64 },
    /// Receipt for a `state_update`; `changed` reports whether the server's
    /// record differed from the snapshot.
    StateAck { changed: bool },
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::models::{ManualConfig, ManualMode, SwitchKind};

    #[test]
    fn identify_frame_wire_shape() {
        let frame = UnitFrame::Identify {
            unit: "AA:BB:CC:DD:EE:FF".into(),
            secret: "s3cret".into(),
        };

        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"identify""#));
        assert!(json.contains(r#""unit":"AA:BB:CC:DD:EE:FF""#));

        let parsed: UnitFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn switch_command_round_trip() {
        let frame = ServerFrame::SwitchCommand {
            pin: 4,
            state: true,
            seq: 17,
        };

        let json = serde_json::to_string(&frame).unwrap();
        let parsed: ServerFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn switch_result_omits_empty_fields() {
        let frame = UnitFrame::SwitchResult {
            pin: 12,
            success: true,
            requested: true,
            actual: true,
            reason: None,
            seq: 3,
            sig: None,
        };

        let json = serde_json::to_string(&frame).unwrap();
        assert!(!json.contains("reason"));
        assert!(!json.contains("sig"));
    }

    #[test]
    fn stale_reason_uses_snake_case_tag() {
        let frame = UnitFrame::SwitchResult {
            pin: 5,
            success: false,
            requested: true,
            actual: false,
            reason: Some(FailureReason::Stale),
            seq: 9,
            sig: None,
        };

        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""reason":"stale""#));
    }

    #[test]
    fn identified_carries_manual_wiring() {
        let frame = ServerFrame::Identified {
            mode: GateMode::Enforced,
            switches: vec![SwitchConfig {
                name: "Front lights".into(),
                pin: 16,
                kind: SwitchKind::Light,
                state: false,
                manual: Some(ManualConfig {
                    pin: 34,
                    active_low: true,
                    mode: ManualMode::Momentary,
                }),
            }],
            motion: None,
        };

        let json = serde_json::to_string(&frame).unwrap();
        let parsed: ServerFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }
}
