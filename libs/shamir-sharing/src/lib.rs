//! Shamir secret sharing over a runtime prime field.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::unimplemented,
    clippy::todo
)]

pub mod errors;
pub mod polynomial;
pub mod reconstruct;
pub mod share;

pub use errors::ShareError;
pub use polynomial::{BatchSharePolynomial, SharePolynomial};
pub use reconstruct::reconstruct;
pub use share::Share;

use basic_types::NodeId;
use rustc_hash::FxHashMap;

/// A mapping from node id to some sharing-related value, typically one share per node.
pub type NodeShares<T> = FxHashMap<NodeId, T>;
