//! Completion events emitted by protocol instances.

use crate::message::{ProtocolId, ProtocolType, SecretId};

/// What a completed protocol produced.
///
/// Meta-protocols advance by pattern-matching these; hosting code observes them through the
/// listener attached when a protocol was started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolOutcome {
    /// Every participant stored its share of the named secret.
    SharesStored {
        /// The secret's storage id.
        secret_id: SecretId,
    },

    /// Every participant stored its shares of the named vector.
    VectorStored {
        /// The vector's base id.
        base_id: SecretId,
        /// The number of components.
        length: usize,
    },

    /// The initiator reconstructed the named secret.
    SecretRevealed {
        /// The secret's storage id.
        secret_id: SecretId,
        /// The reconstructed plaintext.
        value: u64,
    },

    /// All participants passed the barrier.
    Synchronized,

    /// The huddle finished for this node: every accumulated target reported ready.
    HuddleSettled {
        /// The base id accumulated shares were stored under.
        base_id: SecretId,
    },

    /// The running extreme value and index of an array scan are in place.
    ExtremumLocated {
        /// Where the extreme value's shares live.
        value_id: SecretId,
        /// Where the extreme index's shares live.
        index_id: SecretId,
    },

    /// The protocol failed; the runtime evicted it.
    Failed {
        /// A description of the failure.
        error: String,
    },
}

/// A completion event: which instance finished and what it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolEvent {
    /// The finished instance.
    pub protocol_id: ProtocolId,

    /// Its protocol type.
    pub protocol_type: ProtocolType,

    /// What it produced.
    pub outcome: ProtocolOutcome,
}

/// A callback invoked once when the protocol it was attached to completes.
pub type CompletionListener = Box<dyn FnMut(&ProtocolEvent)>;

// Consumes the outcome slot every protocol state keeps; completion is exactly "the slot is
// filled", so the runtime calls this once right after eviction.
pub(crate) fn take_outcome(outcome: &mut Option<ProtocolOutcome>) -> ProtocolOutcome {
    outcome
        .take()
        .unwrap_or(ProtocolOutcome::Failed { error: "outcome consumed before completion".into() })
}
