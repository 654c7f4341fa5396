//! All-to-all synchronization barrier.
//!
//! There is no initiator: every participant constructs its own instance under the common
//! protocol id derived from the caller-chosen barrier name, broadcasts a single signal to the
//! full participant set (itself included) and completes once all `n` signals are in. A signal
//! arriving before the local participant reaches the barrier parks in a passively spawned
//! responder, which `start_protocol` later activates.

pub mod state;

pub use state::BarrierState;

use crate::{
    message::{ProtocolId, ProtocolType},
    runtime::ProtocolManager,
};
use uuid::Uuid;

/// The common protocol id every participant derives from a barrier name.
pub fn barrier_id(name: &str) -> ProtocolId {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Register the barrier responder factory.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::Barrier, state::build_responder);
}
