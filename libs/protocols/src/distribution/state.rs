//! Distribution protocol state machines.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolOutcome},
    message::{Payload, ProtocolMessage, ProtocolType, SecretId},
    runtime::{Context, Protocol},
    storage::{component_id, Lifetime},
};
use basic_types::{NodeId, NodeJar};
use shamir_sharing::{BatchSharePolynomial, Share, SharePolynomial};

/// The distribution protocol state definitions.
pub mod states {
    use basic_types::{NodeId, NodeJar};

    /// The initiator-side state of a scalar distribution: the secret being dealt.
    pub struct Dealing {
        /// The plaintext secret.
        pub secret: u64,

        /// The sharing threshold.
        pub threshold: u32,

        /// Every node receiving a share, the initiator included.
        pub participants: Vec<NodeId>,
    }

    /// The initiator-side state of a vector distribution.
    pub struct DealingVector {
        /// The plaintext secrets.
        pub secrets: Vec<u64>,

        /// The sharing threshold.
        pub threshold: u32,

        /// Every node receiving shares, the initiator included.
        pub participants: Vec<NodeId>,

        /// Acknowledgments collected so far.
        pub acks: NodeJar<()>,
    }
}

/// Distributes shares of a single scalar secret.
pub struct ShareDistributionState {
    secret_id: SecretId,
    tag: Option<String>,
    dealing: Option<states::Dealing>,
    outcome: Option<ProtocolOutcome>,
}

impl ShareDistributionState {
    /// Construct the initiator for distributing `secret` under `secret_id`.
    pub fn new_initiator(
        secret_id: impl Into<SecretId>,
        secret: u64,
        threshold: u32,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            tag,
            dealing: Some(states::Dealing { secret, threshold, participants }),
            outcome: None,
        }
    }

    fn new_responder(secret_id: SecretId) -> Self {
        Self { secret_id, tag: None, dealing: None, outcome: None }
    }
}

impl Protocol for ShareDistributionState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::ShareDistribution
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(dealing) = &self.dealing else {
            return Ok(());
        };
        let node_count = dealing.participants.len();
        if node_count == 0 {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        if dealing.threshold < 1 || dealing.threshold as usize > node_count {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "threshold {} outside [1, {node_count}]",
                dealing.threshold
            )));
        }
        let polynomial = SharePolynomial::random(
            *ctx.field(),
            dealing.secret,
            dealing.threshold,
            &mut rand::thread_rng(),
        )?;
        for (node, share) in polynomial.shares_for(&dealing.participants)? {
            let payload = Payload::Distribution {
                secret_id: self.secret_id.clone(),
                value: share.value(),
                tag: self.tag.clone(),
            };
            ctx.unicast(node, payload);
        }
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::Distribution { secret_id, value, tag } => {
                let share = Share::new(ctx.node_id(), value, None);
                ctx.store(secret_id.clone(), share, Some(Lifetime::from_tag(tag)));
                // Fire-and-forget: storing the local share is all either role waits for.
                self.outcome = Some(ProtocolOutcome::SharesStored { secret_id });
                Ok(())
            }
            other => Err(ProtocolError::UnexpectedMessage(other.label())),
        }
    }

    fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    fn take_outcome(&mut self) -> ProtocolOutcome {
        take_outcome(&mut self.outcome)
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

/// Distributes shares of a vector of secrets under `base[i]` component ids.
pub struct VectorShareDistributionState {
    base_id: SecretId,
    tag: Option<String>,
    dealing: Option<states::DealingVector>,
    length: usize,
    outcome: Option<ProtocolOutcome>,
}

impl VectorShareDistributionState {
    /// Construct the initiator for distributing `secrets` under `base_id`.
    pub fn new_initiator(
        base_id: impl Into<SecretId>,
        secrets: Vec<u64>,
        threshold: u32,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        let acks = NodeJar::new(participants.len());
        Self {
            base_id: base_id.into(),
            tag,
            length: secrets.len(),
            dealing: Some(states::DealingVector { secrets, threshold, participants, acks }),
            outcome: None,
        }
    }

    fn new_responder(base_id: SecretId) -> Self {
        Self { base_id, tag: None, dealing: None, length: 0, outcome: None }
    }
}

impl Protocol for VectorShareDistributionState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::VectorShareDistribution
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(dealing) = &self.dealing else {
            return Ok(());
        };
        let node_count = dealing.participants.len();
        if node_count == 0 {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        if dealing.secrets.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty secret vector".into()));
        }
        if dealing.threshold < 1 || dealing.threshold as usize > node_count {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "threshold {} outside [1, {node_count}]",
                dealing.threshold
            )));
        }
        let batch = BatchSharePolynomial::random(
            *ctx.field(),
            &dealing.secrets,
            dealing.threshold,
            &mut rand::thread_rng(),
        )?;
        for node in &dealing.participants {
            let values = batch.shares_at(*node)?.iter().map(Share::value).collect();
            let payload = Payload::VectorDistribution {
                base_id: self.base_id.clone(),
                values,
                tag: self.tag.clone(),
            };
            ctx.unicast(*node, payload);
        }
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::VectorDistribution { base_id, values, tag } => {
                self.length = values.len();
                for (index, value) in values.into_iter().enumerate() {
                    let share = Share::new(ctx.node_id(), value, None);
                    ctx.store(
                        component_id(&base_id, index),
                        share,
                        Some(Lifetime::from_tag(tag.clone())),
                    );
                }
                ctx.unicast_completion(message.sender, Payload::Ack);
                if self.dealing.is_none() {
                    self.outcome =
                        Some(ProtocolOutcome::VectorStored { base_id, length: self.length });
                }
                Ok(())
            }
            Payload::Ack => {
                let Some(dealing) = &mut self.dealing else {
                    return Err(ProtocolError::UnexpectedMessage("ack"));
                };
                dealing.acks.add_element(message.sender, ())?;
                if dealing.acks.is_full() {
                    self.outcome = Some(ProtocolOutcome::VectorStored {
                        base_id: self.base_id.clone(),
                        length: self.length,
                    });
                }
                Ok(())
            }
            other => Err(ProtocolError::UnexpectedMessage(other.label())),
        }
    }

    fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    fn take_outcome(&mut self) -> ProtocolOutcome {
        take_outcome(&mut self.outcome)
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

/// Builds a scalar distribution responder from its first message.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::Distribution { secret_id, .. } => {
            Ok(Box::new(ShareDistributionState::new_responder(secret_id.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}

/// Builds a vector distribution responder from its first message.
pub(crate) fn build_vector_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::VectorDistribution { base_id, .. } => {
            Ok(Box::new(VectorShareDistributionState::new_responder(base_id.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
