//! Multiplication protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolOutcome},
    message::{MultiplyRequest, Payload, ProtocolMessage, ProtocolType, SecretId},
    runtime::{Context, Protocol},
    setup::MASK_SECRET_ID,
    storage::Lifetime,
};
use basic_types::{NodeId, NodeJar};
use shamir_sharing::{reconstruct, Share};

/// The multiplication protocol state definitions.
pub mod states {
    use basic_types::{NodeId, NodeJar};

    /// The initiator is collecting every participant's share of the masked product.
    pub struct CollectingMasked {
        /// The masked product shares received so far.
        pub masked: NodeJar<u64>,

        /// Every participant, the initiator included.
        pub participants: Vec<NodeId>,
    }

    /// The initiator revealed the masked product and is waiting for acknowledgments.
    pub struct AwaitingAcks {
        /// Acknowledgments collected so far.
        pub acks: NodeJar<()>,
    }
}

enum DriverPhase {
    Collecting(states::CollectingMasked),
    Revealing(states::AwaitingAcks),
}

/// Multiplies two shared secrets using the sticky `r-secret` mask.
pub struct MultiplyState {
    request: MultiplyRequest,
    driver: Option<DriverPhase>,
    // Product of the operand witnesses; the multiply recomputes bookkeeping instead of
    // combining it linearly.
    witness: Option<u64>,
    outcome: Option<ProtocolOutcome>,
}

impl MultiplyState {
    /// Construct the initiator for `output = left * right`.
    pub fn new_initiator(
        left: impl Into<SecretId>,
        right: impl Into<SecretId>,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        let masked = NodeJar::new(participants.len());
        Self {
            request: MultiplyRequest {
                left_id: left.into(),
                right_id: right.into(),
                output_id: output_id.into(),
                tag,
            },
            driver: Some(DriverPhase::Collecting(states::CollectingMasked {
                masked,
                participants,
            })),
            witness: None,
            outcome: None,
        }
    }

    fn new_responder(request: MultiplyRequest) -> Self {
        Self { request, driver: None, witness: None, outcome: None }
    }
}

impl Protocol for MultiplyState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::SecureMultiply
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(DriverPhase::Collecting(collecting)) = &self.driver else {
            return Ok(());
        };
        if collecting.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        ctx.multicast(
            &collecting.participants,
            Payload::MultiplyRequest { request: self.request.clone() },
        );
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::MultiplyRequest { request } => {
                let left = ctx.share(&request.left_id)?;
                let right = ctx.share(&request.right_id)?;
                let mask = ctx.share(MASK_SECRET_ID)?;
                let field = ctx.field();
                let masked = field.add(field.mul(left.value(), right.value()), mask.value());
                self.witness = match (left.witness(), right.witness()) {
                    (Some(left), Some(right)) => Some(field.mul(left, right)),
                    _ => None,
                };
                ctx.unicast(message.sender, Payload::MaskedProduct { value: masked });
                Ok(())
            }
            Payload::MaskedProduct { value } => {
                let Some(DriverPhase::Collecting(collecting)) = &mut self.driver else {
                    return Err(ProtocolError::UnexpectedMessage("masked-product"));
                };
                collecting.masked.add_element(message.sender, value)?;
                if !collecting.masked.is_full() {
                    return Ok(());
                }
                let shares: Vec<_> = collecting
                    .masked
                    .elements()
                    .map(|(node, value)| Share::new(*node, *value, None))
                    .collect();
                // The masked product lies on a degree-2t-2 polynomial: all n shares go in.
                let required = shares.len() as u32;
                let revealed = reconstruct(ctx.field(), &shares, required)?;
                let participants = collecting.participants.clone();
                ctx.multicast(&participants, Payload::ProductReveal { value: revealed });
                let acks = NodeJar::new(participants.len());
                self.driver = Some(DriverPhase::Revealing(states::AwaitingAcks { acks }));
                Ok(())
            }
            Payload::ProductReveal { value } => {
                let mask = ctx.share(MASK_SECRET_ID)?;
                let unmasked = ctx.field().sub(value, mask.value());
                let share = Share::new(ctx.node_id(), unmasked, self.witness);
                ctx.store(
                    self.request.output_id.clone(),
                    share,
                    Some(Lifetime::from_tag(self.request.tag.clone())),
                );
                ctx.unicast_completion(message.sender, Payload::Ack);
                if self.driver.is_none() {
                    self.outcome = Some(ProtocolOutcome::SharesStored {
                        secret_id: self.request.output_id.clone(),
                    });
                }
                Ok(())
            }
            Payload::Ack => {
                let Some(DriverPhase::Revealing(revealing)) = &mut self.driver else {
                    return Err(ProtocolError::UnexpectedMessage("ack"));
                };
                revealing.acks.add_element(message.sender, ())?;
                if revealing.acks.is_full() {
                    self.outcome = Some(ProtocolOutcome::SharesStored {
                        secret_id: self.request.output_id.clone(),
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

/// Builds a multiplication responder from its first message.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::MultiplyRequest { request } => {
            Ok(Box::new(MultiplyState::new_responder(request.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
