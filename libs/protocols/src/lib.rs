//! Secure multi-party computation protocols.
//!
//! Each node in the network hosts one [runtime::ProtocolManager] that routes inbound messages to
//! protocol instances, spawns responders on demand and supplies the shared infrastructure: the
//! [transport::Transport], the node's [storage::ShareStorage] and the field configuration. The
//! catalogue is split into leaf protocols that exchange messages directly and meta-protocols
//! that advance purely through the completion events of the protocols they compose.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::iterator_step_by_zero,
    clippy::invalid_regex,
    clippy::string_slice,
    clippy::unimplemented,
    clippy::todo
)]

pub mod barrier;
pub mod comparison;
pub mod distribution;
pub mod dot_product;
pub mod errors;
pub mod event;
pub mod extremum;
pub mod huddle;
pub mod linear;
pub mod message;
pub mod minimum;
pub mod multiplication;
pub mod reconstruct;
pub mod runtime;
pub mod setup;
pub mod storage;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod simulator;
