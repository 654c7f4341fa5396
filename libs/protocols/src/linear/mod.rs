//! Linear share protocols: secure addition, subtraction and subtraction against a public value.
//!
//! All three share one state machine because a public constant is already a valid degree-0
//! sharing of itself: every participant resolves the two operands, applies the field operation
//! locally, stores the result and acknowledges. No shares cross the fabric.

pub mod state;
#[cfg(test)]
mod test;

pub use state::LinearState;

use crate::{message::ProtocolType, runtime::ProtocolManager};

/// Register the responder factories for the three linear protocol types.
pub fn register(manager: &mut ProtocolManager) {
    manager.register_responder(ProtocolType::SecureAdd, state::build_responder);
    manager.register_responder(ProtocolType::SecureSub, state::build_responder);
    manager.register_responder(ProtocolType::SecureKnownSub, state::build_responder);
}
