//! Share multiplication through a pre-distributed random mask.
//!
//! The local product of two degree-`t-1` shares lies on a degree-`2t-2` polynomial, so the
//! protocol first re-randomizes by adding the sticky mask share of `r`, collects all `n` masked
//! product shares at the initiator, reveals `a*b + r` — which the mask hides perfectly — and
//! lets every participant subtract its mask share again. The revealed scalar is a trivial
//! degree-0 sharing, so the result is back at degree `t-1`. Reconstructing the masked product
//! needs every one of the `n` shares; a threshold-sized subset is not enough for the doubled
//! degree.

pub mod state;
#[cfg(test)]
mod test;

pub use state::MultiplyState;

use crate::{message::ProtocolType, runtime::ProtocolManager};

/// Register the multiplication responder factory.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::SecureMultiply, state::build_responder);
}
