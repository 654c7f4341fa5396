//! Share distribution protocols.
//!
//! The scalar form is fire-and-forget: the initiator deals one share to every participant,
//! itself included, and completes as soon as its own self-delivered share is stored — no network
//! ACKs are awaited. The vector form distributes a whole vector under a `base[i]` naming scheme
//! and does wait for every participant's acknowledgment.

pub mod state;
#[cfg(test)]
mod test;

pub use state::{ShareDistributionState, VectorShareDistributionState};

use crate::runtime::ProtocolManager;

/// Register the distribution responder factories.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(
        crate::message::ProtocolType::ShareDistribution,
        state::build_responder,
    );
    manager.register_responder(
        crate::message::ProtocolType::VectorShareDistribution,
        state::build_vector_responder,
    );
}
