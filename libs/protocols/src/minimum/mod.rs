//! Secure minimum of two shared values.
//!
//! Pure composition: `min(L, R) = R + beta * (L - R)` with `beta = [L < R]`. The difference and
//! the comparison run in parallel, then one multiplication scales the difference, then one
//! addition lands the result. No messages of its own, so there is no responder to register —
//! only the dependencies.

pub mod state;
#[cfg(test)]
mod test;

pub use state::MinState;

use crate::{comparison, linear, multiplication, runtime::ProtocolManager};

/// Register the protocols the minimum composes.
pub fn register(manager: &mut ProtocolManager) {
    comparison::register(manager);
    linear::register(manager);
    multiplication::register(manager);
}
