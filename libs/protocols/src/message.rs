//! The message envelope exchanged between protocol instances.

use basic_types::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Uniquely identifies one protocol instance across the whole network.
pub type ProtocolId = Uuid;

/// Names a secret-shared scalar within a node's storage.
///
/// Secret ids are opaque to the runtime; vector secrets use the `base[i]` convention for their
/// components.
pub type SecretId = String;

/// The protocol catalogue, used as the responder-factory registry key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolType {
    /// Scalar share distribution.
    ShareDistribution,
    /// Vector share distribution.
    VectorShareDistribution,
    /// Secret reconstruction towards the initiator.
    ReconstructSecret,
    /// Local share addition.
    SecureAdd,
    /// Local share subtraction.
    SecureSub,
    /// Local subtraction against a public constant.
    SecureKnownSub,
    /// Share multiplication through the pre-distributed random mask.
    SecureMultiply,
    /// All-to-all synchronization gate.
    Barrier,
    /// Cost contribution huddle.
    CostHuddle,
    /// Secure comparison of two shared values below half the prime.
    SecureCompare,
    /// Secure minimum of two shared values.
    SecureMin,
    /// Secure dot product of two shared vectors.
    SecureDotProduct,
    /// Secure minimum over a shared array.
    SecureFindMin,
    /// Secure maximum over a shared array.
    SecureFindMax,
}

impl Display for ProtocolType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ShareDistribution => "share-distribution",
            Self::VectorShareDistribution => "vector-share-distribution",
            Self::ReconstructSecret => "reconstruct-secret",
            Self::SecureAdd => "secure-add",
            Self::SecureSub => "secure-sub",
            Self::SecureKnownSub => "secure-known-sub",
            Self::SecureMultiply => "secure-multiply",
            Self::Barrier => "barrier",
            Self::CostHuddle => "cost-huddle",
            Self::SecureCompare => "secure-compare",
            Self::SecureMin => "secure-min",
            Self::SecureDotProduct => "secure-dot-product",
            Self::SecureFindMin => "secure-find-min",
            Self::SecureFindMax => "secure-find-max",
        };
        write!(f, "{name}")
    }
}

/// An operand of a linear operation: either a stored share or a public constant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// A secret-shared value, looked up in storage by id.
    Secret(SecretId),

    /// A public value, treated as a degree-0 sharing of itself.
    Public(u64),
}

/// The parameters of a local linear computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearRequest {
    /// The operation to apply.
    pub operation: LinearOperation,

    /// The left operand.
    pub left: Operand,

    /// The right operand.
    pub right: Operand,

    /// Where each participant stores its share of the result.
    pub output_id: SecretId,

    /// The storage tag for the result; `None` stores sticky.
    pub tag: Option<String>,
}

/// The linear operations participants can apply locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearOperation {
    /// Component-wise modular addition.
    Add,
    /// Component-wise modular subtraction.
    Sub,
}

/// The parameters of a share multiplication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplyRequest {
    /// The left operand's secret id.
    pub left_id: SecretId,

    /// The right operand's secret id.
    pub right_id: SecretId,

    /// Where each participant stores its share of the product.
    pub output_id: SecretId,

    /// The storage tag for the result; `None` stores sticky.
    pub tag: Option<String>,
}

/// One huddle contribution aimed at a specific target node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetContribution {
    /// The node this contribution is aimed at.
    pub target: NodeId,

    /// One share value per vector component.
    pub values: Vec<u64>,
}

/// The protocol-specific content of a message.
///
/// Exactly one enum for the whole catalogue keeps every handler an exhaustive match; the
/// envelope's [ProtocolType] is what the registry uses to build responders on demand, and the
/// payload itself carries whatever initialization parameters such a responder needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Payload {
    /// One node's share of a freshly distributed scalar secret.
    Distribution {
        /// The secret being distributed.
        secret_id: SecretId,
        /// The recipient's share value.
        value: u64,
        /// The storage tag; `None` stores sticky.
        tag: Option<String>,
    },

    /// One node's shares of a freshly distributed vector secret.
    VectorDistribution {
        /// The base id of the vector.
        base_id: SecretId,
        /// The recipient's share of each component.
        values: Vec<u64>,
        /// The storage tag; `None` stores sticky.
        tag: Option<String>,
    },

    /// Asks every participant for its share of a secret.
    ReconstructRequest {
        /// The secret to reconstruct.
        secret_id: SecretId,
        /// The storage tag under which the initiator keeps the result.
        tag: Option<String>,
    },

    /// One participant's share of a secret under reconstruction.
    ReconstructShare {
        /// The share value.
        value: u64,
    },

    /// Asks every participant to apply a linear operation locally.
    Linear {
        /// The computation to apply.
        request: LinearRequest,
    },

    /// Asks every participant to start a share multiplication.
    MultiplyRequest {
        /// The multiplication parameters.
        request: MultiplyRequest,
    },

    /// One participant's share of the masked product `a*b + r`.
    MaskedProduct {
        /// The share value.
        value: u64,
    },

    /// The revealed masked product, broadcast by the multiplication initiator.
    ProductReveal {
        /// The plaintext value of `a*b + r`.
        value: u64,
    },

    /// A barrier signal.
    BarrierSignal {
        /// The caller-chosen barrier name the common protocol id was derived from.
        name: String,
    },

    /// One sender's bundle of huddle contributions, one entry per target node.
    HuddleContribution {
        /// The base id accumulated results are stored under.
        base_id: SecretId,
        /// The number of components per contribution vector.
        dimension: usize,
        /// The storage tag for accumulated shares.
        tag: Option<String>,
        /// The contributions aimed at each target.
        bundles: Vec<TargetContribution>,
    },

    /// Tells a huddle target that the sender finished accumulating towards it.
    HuddleReady,

    /// Asks every participant to fold its local product shares into the dot product result.
    DotProductSum {
        /// The per-component product secret ids.
        product_ids: Vec<SecretId>,
        /// Where the folded result is stored.
        output_id: SecretId,
        /// The storage tag for the result.
        tag: Option<String>,
    },

    /// Distributes the revealed masked difference that seeds the comparison bit circuit.
    CompareSetup {
        /// The revealed value of `2(a-b) + r_key mod p`.
        revealed: u64,
        /// The base id comparison intermediates hang off.
        output_id: SecretId,
        /// The storage tag for intermediates and the result.
        tag: Option<String>,
    },

    /// Asks every participant to fold its comparison term shares into one value.
    CompareCombine,

    /// Asks every participant to derive and store its share of the comparison result.
    CompareFinalize,

    /// Seeds the running extreme value and index on every participant.
    FindInit {
        /// The base id of the shared array.
        base_id: SecretId,
        /// The first array position scanned.
        first: usize,
        /// Where the running extreme value lives.
        value_id: SecretId,
        /// Where the running extreme index lives.
        index_id: SecretId,
        /// The storage tag for both.
        tag: Option<String>,
    },

    /// A bare acknowledgment, counted by whichever initiator broadcast last.
    Ack,
}

impl Payload {
    /// A short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Distribution { .. } => "distribution",
            Self::VectorDistribution { .. } => "vector-distribution",
            Self::ReconstructRequest { .. } => "reconstruct-request",
            Self::ReconstructShare { .. } => "reconstruct-share",
            Self::Linear { .. } => "linear",
            Self::MultiplyRequest { .. } => "multiply-request",
            Self::MaskedProduct { .. } => "masked-product",
            Self::ProductReveal { .. } => "product-reveal",
            Self::BarrierSignal { .. } => "barrier-signal",
            Self::HuddleContribution { .. } => "huddle-contribution",
            Self::HuddleReady => "huddle-ready",
            Self::DotProductSum { .. } => "dot-product-sum",
            Self::CompareSetup { .. } => "compare-setup",
            Self::CompareCombine => "compare-combine",
            Self::CompareFinalize => "compare-finalize",
            Self::FindInit { .. } => "find-init",
            Self::Ack => "ack",
        }
    }
}

/// A message addressed to one protocol instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// The instance this message belongs to.
    pub protocol_id: ProtocolId,

    /// The protocol type, consulted when a responder must be built on demand.
    pub protocol_type: ProtocolType,

    /// The sending node; stamped by the fabric before delivery.
    pub sender: NodeId,

    /// Whether this message only acknowledges or finishes an exchange. Completion messages
    /// arriving for an evicted instance are dropped silently instead of spawning a responder.
    pub is_completion: bool,

    /// The protocol-specific content.
    pub payload: Payload,
}

impl ProtocolMessage {
    /// Construct a regular message.
    pub fn new(
        protocol_id: ProtocolId,
        protocol_type: ProtocolType,
        sender: NodeId,
        payload: Payload,
    ) -> Self {
        Self { protocol_id, protocol_type, sender, is_completion: false, payload }
    }

    /// Construct a completion message.
    pub fn completion(
        protocol_id: ProtocolId,
        protocol_type: ProtocolType,
        sender: NodeId,
        payload: Payload,
    ) -> Self {
        Self { protocol_id, protocol_type, sender, is_completion: true, payload }
    }
}
