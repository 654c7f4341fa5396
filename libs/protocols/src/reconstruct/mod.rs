//! Secret reconstruction protocol.
//!
//! The initiator asks every participant for its share, interpolates once all of them are in and
//! is the only node that learns the plaintext.

pub mod state;
#[cfg(test)]
mod test;

pub use state::ReconstructState;

use crate::{message::ProtocolType, runtime::ProtocolManager};

/// Register the reconstruction responder factory.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::ReconstructSecret, state::build_responder);
}
