#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod frame;
pub mod models;
pub mod protocols;
pub mod sequence;
pub mod signature;

pub use frame::{ServerFrame, UnitFrame};
pub use models::{
    FailureReason, GateMode, ManualConfig, ManualMode, MotionConfig, PinState, SwitchConfig,
    SwitchKind,
};
pub use sequence::{SeqCheck, Watermark};
