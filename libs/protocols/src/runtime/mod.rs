//! The per-node protocol runtime.
//!
//! One [ProtocolManager] lives on every node. It owns the node's share storage, routes each
//! inbound message to the protocol instance it belongs to, builds responders on demand through
//! the registered factories, and relays completion events to listeners and to the parent
//! instances of sub-protocols. Everything runs on a single execution stream: an instance makes
//! progress only while the manager is delivering it a message, an initialization call or a
//! sub-protocol completion.

mod context;
mod manager;
mod protocol;

pub use context::Context;
pub use manager::{ProtocolManager, StartOptions};
pub use protocol::{Protocol, ResponderBuilder};
