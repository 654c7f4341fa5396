//! Linear protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolOutcome},
    message::{
        LinearOperation, LinearRequest, Operand, Payload, ProtocolMessage, ProtocolType, SecretId,
    },
    runtime::{Context, Protocol},
    storage::Lifetime,
};
use basic_types::{NodeId, NodeJar};
use shamir_sharing::Share;

/// The linear protocol state definitions.
pub mod states {
    use basic_types::{NodeId, NodeJar};

    /// The initiator is waiting for every participant's acknowledgment.
    pub struct AwaitingAcks {
        /// Acknowledgments collected so far.
        pub acks: NodeJar<()>,

        /// Every participant, the initiator included.
        pub participants: Vec<NodeId>,
    }
}

/// Applies a linear operation to two operands on every participant.
pub struct LinearState {
    protocol_type: ProtocolType,
    request: LinearRequest,
    driver: Option<states::AwaitingAcks>,
    outcome: Option<ProtocolOutcome>,
}

impl LinearState {
    /// Construct the initiator for `output = left + right`.
    pub fn add(
        left: impl Into<SecretId>,
        right: impl Into<SecretId>,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self::new_initiator(
            ProtocolType::SecureAdd,
            LinearRequest {
                operation: LinearOperation::Add,
                left: Operand::Secret(left.into()),
                right: Operand::Secret(right.into()),
                output_id: output_id.into(),
                tag,
            },
            participants,
        )
    }

    /// Construct the initiator for `output = left - right`.
    pub fn sub(
        left: impl Into<SecretId>,
        right: impl Into<SecretId>,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self::new_initiator(
            ProtocolType::SecureSub,
            LinearRequest {
                operation: LinearOperation::Sub,
                left: Operand::Secret(left.into()),
                right: Operand::Secret(right.into()),
                output_id: output_id.into(),
                tag,
            },
            participants,
        )
    }

    /// Construct the initiator for a subtraction where one operand is a public value:
    /// `output = known - secret` when `known_is_left`, `output = secret - known` otherwise.
    pub fn known_sub(
        known: u64,
        secret: impl Into<SecretId>,
        known_is_left: bool,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        let secret = Operand::Secret(secret.into());
        let known = Operand::Public(known);
        let (left, right) = if known_is_left { (known, secret) } else { (secret, known) };
        Self::new_initiator(
            ProtocolType::SecureKnownSub,
            LinearRequest {
                operation: LinearOperation::Sub,
                left,
                right,
                output_id: output_id.into(),
                tag,
            },
            participants,
        )
    }

    fn new_initiator(
        protocol_type: ProtocolType,
        request: LinearRequest,
        participants: Vec<NodeId>,
    ) -> Self {
        let acks = NodeJar::new(participants.len());
        Self {
            protocol_type,
            request,
            driver: Some(states::AwaitingAcks { acks, participants }),
            outcome: None,
        }
    }

    fn new_responder(protocol_type: ProtocolType, request: LinearRequest) -> Self {
        Self { protocol_type, request, driver: None, outcome: None }
    }

    fn resolve(ctx: &Context<'_>, operand: &Operand) -> Result<Share, ProtocolError> {
        match operand {
            Operand::Secret(id) => ctx.share(id),
            Operand::Public(value) => {
                Ok(Share::constant(ctx.node_id(), ctx.field().element(*value)))
            }
        }
    }
}

impl Protocol for LinearState {
    fn protocol_type(&self) -> ProtocolType {
        self.protocol_type
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(driver) = &self.driver else {
            return Ok(());
        };
        if driver.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        ctx.multicast(&driver.participants, Payload::Linear { request: self.request.clone() });
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::Linear { request } => {
                let left = Self::resolve(ctx, &request.left)?;
                let right = Self::resolve(ctx, &request.right)?;
                let field = *ctx.field();
                let result = match request.operation {
                    LinearOperation::Add => left.add(&right, &field)?,
                    LinearOperation::Sub => left.sub(&right, &field)?,
                };
                ctx.store(
                    request.output_id.clone(),
                    result,
                    Some(Lifetime::from_tag(request.tag.clone())),
                );
                ctx.unicast_completion(message.sender, Payload::Ack);
                if self.driver.is_none() {
                    self.outcome =
                        Some(ProtocolOutcome::SharesStored { secret_id: request.output_id });
                }
                Ok(())
            }
            Payload::Ack => {
                let Some(driver) = &mut self.driver else {
                    return Err(ProtocolError::UnexpectedMessage("ack"));
                };
                driver.acks.add_element(message.sender, ())?;
                if driver.acks.is_full() {
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

/// Builds a linear responder from its first message; the envelope's protocol type distinguishes
/// the three registered variants.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::Linear { request } => {
            Ok(Box::new(LinearState::new_responder(message.protocol_type, request.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
