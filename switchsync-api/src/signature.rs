//! Keyed-hash signatures for report frames.
//!
//! Controllers sign `state_update` and `switch_result` frames with
//! HMAC-SHA256 over a canonical field ordering, keyed by the unit secret, so
//! state reports cannot be spoofed on shared networks. The signature is
//! transported as lowercase hex.

use alloc::string::String;
use core::fmt::Write;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::models::PinState;

type HmacSha256 = Hmac<Sha256>;

/// Canonical string covered by a `state_update` signature.
pub fn state_update_canonical(unit: &str, seq: u64, switches: &[PinState]) -> String {
    let mut canonical = String::new();
    let _ = write!(canonical, "{unit}|{seq}");
    for entry in switches {
        let _ = write!(
            canonical,
            "|{}:{}",
            entry.pin,
            if entry.state { 1 } else { 0 }
        );
    }
    canonical
}

/// Canonical string covered by a `switch_result` signature.
pub fn switch_result_canonical(unit: &str, seq: u64, pin: u8, success: bool, actual: bool) -> String {
    let mut canonical = String::new();
    let _ = write!(
        canonical,
        "{unit}|{seq}|{pin}|{}|{}",
        if success { 1 } else { 0 },
        if actual { 1 } else { 0 }
    );
    canonical
}

/// HMAC-SHA256 over `message`, hex encoded.
pub fn sign(secret: &str, message: &str) -> String {
    // HMAC accepts keys of any length; the error arm is unreachable.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(message.as_bytes());

    let digest = mac.finalize().into_bytes();
    let mut out = String::new();
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Check a transported signature against the expected canonical string.
pub fn verify(secret: &str, message: &str, sig: &str) -> bool {
    !sig.is_empty() && sign(secret, message) == sig
}
