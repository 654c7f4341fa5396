//! Secure comparison of two shared values.
//!
//! `SecureCompare(a, b)` leaves every participant holding a share of `1` exactly when `a < b`,
//! for operands below half the prime. The scheme rides on the least significant bit of
//! `z = 2(a - b) mod p`: for an odd modulus `z` is odd precisely when `a < b`. The protocol
//! masks `z` with the pre-distributed random key `r`, reveals `c = z + r mod p` (which the mask
//! hides), and recovers `lsb(z) = lsb(c) xor lsb(r) xor [c < r]` from the sticky bit shares of
//! `r`: the `[c < r]` term comes from the classic circuit over the public bits of `c` — shared
//! equality bits, a prefix-equality multiply chain and one multiply per zero bit of `c`.

pub mod state;
#[cfg(test)]
mod test;

pub use state::CompareState;

use crate::{linear, message::ProtocolType, multiplication, reconstruct, runtime::ProtocolManager};

/// Register the comparison responder factory and every protocol it composes.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::SecureCompare, state::build_responder);
    linear::register(manager);
    multiplication::register(manager);
    reconstruct::register(manager);
}
