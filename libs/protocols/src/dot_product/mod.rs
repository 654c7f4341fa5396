//! Secure dot product of two shared vectors.
//!
//! One share multiplication per component runs in parallel; once every product is in place the
//! initiator broadcasts a fold request and each participant sums its local product shares into
//! a single result share. Duplicate fold acknowledgments are tolerated.

pub mod state;
#[cfg(test)]
mod test;

pub use state::DotProductState;

use crate::{message::ProtocolType, multiplication, runtime::ProtocolManager};

/// Register the dot product responder factory and the protocols it composes.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::SecureDotProduct, state::build_responder);
    multiplication::register(manager);
}
