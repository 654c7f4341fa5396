//! Cost contribution huddle.
//!
//! Every participant secret-shares a vector of contributions towards every other participant
//! and sends each node its bundle of shares. A recipient sums incoming contribution shares per
//! target; once it holds `n - 1` of them for a target (every sender except the target itself)
//! it stores the accumulated shares and tells that target it is ready. A node's own huddle
//! finishes when `n` ready signals addressed to it are in — its own reflexive one included.
//! Like the barrier, all instances share a name-derived protocol id and a bundle arriving early
//! parks in a passive responder.

pub mod state;

pub use state::HuddleState;

use crate::{
    message::{ProtocolId, ProtocolType, SecretId},
    runtime::ProtocolManager,
};
use basic_types::NodeId;
use uuid::Uuid;

/// The common protocol id every participant derives from a huddle name.
pub fn huddle_id(name: &str) -> ProtocolId {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// The id the accumulated shares for `target`'s `component`-th entry are stored under.
pub fn target_component_id(base: &str, target: NodeId, component: usize) -> SecretId {
    format!("{base}_{target}[{component}]")
}

/// Register the huddle responder factory.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::CostHuddle, state::build_responder);
}
