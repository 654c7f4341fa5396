//! Errors raised by protocol instances and the runtime driving them.

use crate::message::{ProtocolId, ProtocolType, SecretId};
use basic_types::{jar::DuplicateContribution, NodeId};
use shamir_sharing::ShareError;
use thiserror::Error;

/// A fatal condition inside a protocol instance.
///
/// None of these are recovered locally: the instance that raises one is evicted and the error
/// surfaces to whoever drove the runtime. Higher layers may retry or compensate, the core does
/// not.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The protocol was started with parameters that cannot work.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A secret id required for a local computation is absent from storage.
    #[error("share {0:?} is not in storage")]
    MissingShare(SecretId),

    /// The same node signalled or acknowledged twice.
    #[error("duplicate signal from node {0}")]
    DuplicateSignal(NodeId),

    /// Share generation, combination or reconstruction failed.
    #[error(transparent)]
    Share(#[from] ShareError),

    /// A message arrived that this protocol cannot handle in its current phase.
    #[error("unexpected {0} message")]
    UnexpectedMessage(&'static str),
}

impl From<DuplicateContribution> for ProtocolError {
    fn from(error: DuplicateContribution) -> Self {
        Self::DuplicateSignal(error.0)
    }
}

/// An error surfaced by the protocol runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A message arrived for an unknown protocol type.
    #[error("no responder factory registered for protocol type {0}")]
    UnknownProtocolType(ProtocolType),

    /// A protocol instance failed fatally and was evicted.
    #[error("protocol {protocol_type} ({id}) failed: {source}")]
    ProtocolFailed {
        /// The id of the failed instance.
        id: ProtocolId,
        /// The type of the failed instance.
        protocol_type: ProtocolType,
        /// What went wrong.
        #[source]
        source: ProtocolError,
    },
}
