//! Reconstruction protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolOutcome},
    message::{Payload, ProtocolMessage, ProtocolType, SecretId},
    runtime::{Context, Protocol},
    storage::Lifetime,
};
use basic_types::{NodeId, NodeJar};
use shamir_sharing::{reconstruct, Share};

/// The reconstruction protocol state definitions.
pub mod states {
    use basic_types::{NodeId, NodeJar};

    /// The initiator is collecting one share value per participant.
    pub struct Collecting {
        /// The share values received so far.
        pub shares: NodeJar<u64>,

        /// Every node asked for its share, the initiator included.
        pub participants: Vec<NodeId>,
    }
}

/// Reconstructs a secret towards the initiator.
///
/// Every participant answers the request with its share value; shares never carry their
/// plaintext witness over the fabric. The initiator interpolates over all `n` responses, stores
/// the result locally as a degree-0 constant share and reports the plaintext through its
/// completion event. A participant that lacks the share fails fatally on its own node.
pub struct ReconstructState {
    secret_id: SecretId,
    tag: Option<String>,
    collecting: Option<states::Collecting>,
    outcome: Option<ProtocolOutcome>,
}

impl ReconstructState {
    /// Construct the initiator for reconstructing `secret_id`.
    pub fn new_initiator(
        secret_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        let shares = NodeJar::new(participants.len());
        Self {
            secret_id: secret_id.into(),
            tag,
            collecting: Some(states::Collecting { shares, participants }),
            outcome: None,
        }
    }

    fn new_responder(secret_id: SecretId) -> Self {
        Self { secret_id, tag: None, collecting: None, outcome: None }
    }
}

impl Protocol for ReconstructState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::ReconstructSecret
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(collecting) = &self.collecting else {
            return Ok(());
        };
        if collecting.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        let payload = Payload::ReconstructRequest {
            secret_id: self.secret_id.clone(),
            tag: self.tag.clone(),
        };
        ctx.multicast(&collecting.participants, payload);
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::ReconstructRequest { secret_id, .. } => {
                let share = ctx.share(&secret_id)?;
                ctx.unicast_completion(
                    message.sender,
                    Payload::ReconstructShare { value: share.value() },
                );
                if self.collecting.is_none() {
                    self.outcome = Some(ProtocolOutcome::SharesStored { secret_id });
                }
                Ok(())
            }
            Payload::ReconstructShare { value } => {
                let Some(collecting) = &mut self.collecting else {
                    return Err(ProtocolError::UnexpectedMessage("reconstruct-share"));
                };
                collecting.shares.add_element(message.sender, value)?;
                if !collecting.shares.is_full() {
                    return Ok(());
                }
                let shares: Vec<_> = collecting
                    .shares
                    .elements()
                    .map(|(node, value)| Share::new(*node, *value, None))
                    .collect();
                let required = shares.len() as u32;
                let value = reconstruct(ctx.field(), &shares, required)?;
                let result = Share::constant(ctx.node_id(), value);
                ctx.store(
                    self.secret_id.clone(),
                    result,
                    Some(Lifetime::from_tag(self.tag.clone())),
                );
                self.outcome = Some(ProtocolOutcome::SecretRevealed {
                    secret_id: self.secret_id.clone(),
                    value,
                });
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

/// Builds a reconstruction responder from its first message.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::ReconstructRequest { secret_id, .. } => {
            Ok(Box::new(ReconstructState::new_responder(secret_id.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
