//! Dot product protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolEvent, ProtocolOutcome},
    message::{Payload, ProtocolMessage, ProtocolType, SecretId},
    multiplication::MultiplyState,
    runtime::{Context, Protocol},
    storage::{component_id, Lifetime},
};
use basic_types::{NodeId, NodeJar};
use rustc_hash::FxHashSet;
use shamir_sharing::Share;

/// The dot product protocol state definitions.
pub mod states {
    use crate::message::ProtocolId;
    use basic_types::NodeJar;
    use rustc_hash::FxHashSet;

    /// The initiator is waiting for the per-component multiplications.
    pub struct Multiplying {
        /// The multiplication sub-protocols still running.
        pub pending: FxHashSet<ProtocolId>,
    }

    /// The initiator asked everyone to fold their product shares and is collecting
    /// acknowledgments.
    pub struct Summing {
        /// Acknowledgments collected so far.
        pub acks: NodeJar<()>,
    }
}

enum DriverPhase {
    Multiplying(states::Multiplying),
    Summing(states::Summing),
}

struct Driver {
    left_base: SecretId,
    right_base: SecretId,
    dimension: usize,
    participants: Vec<NodeId>,
    phase: DriverPhase,
}

/// Computes the dot product of two shared vectors into a single shared scalar.
pub struct DotProductState {
    output_id: SecretId,
    tag: Option<String>,
    product_ids: Vec<SecretId>,
    driver: Option<Driver>,
    outcome: Option<ProtocolOutcome>,
}

impl DotProductState {
    /// Construct the initiator for `output = sum_i left[i] * right[i]`.
    pub fn new_initiator(
        left_base: impl Into<SecretId>,
        right_base: impl Into<SecretId>,
        dimension: usize,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self {
            output_id: output_id.into(),
            tag,
            product_ids: Vec::new(),
            driver: Some(Driver {
                left_base: left_base.into(),
                right_base: right_base.into(),
                dimension,
                participants,
                phase: DriverPhase::Multiplying(states::Multiplying {
                    pending: FxHashSet::default(),
                }),
            }),
            outcome: None,
        }
    }

    fn new_responder(product_ids: Vec<SecretId>, output_id: SecretId, tag: Option<String>) -> Self {
        Self { output_id, tag, product_ids, driver: None, outcome: None }
    }
}

impl Protocol for DotProductState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::SecureDotProduct
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(driver) = &mut self.driver else {
            return Ok(());
        };
        if driver.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        if driver.dimension == 0 {
            return Err(ProtocolError::InvalidConfiguration("vector size 0".into()));
        }
        let product_base = format!("{}.prod", self.output_id);
        let mut pending = FxHashSet::default();
        for index in 0..driver.dimension {
            let product_id = component_id(&product_base, index);
            let multiply = MultiplyState::new_initiator(
                component_id(&driver.left_base, index),
                component_id(&driver.right_base, index),
                product_id.clone(),
                self.tag.clone(),
                driver.participants.clone(),
            );
            pending.insert(ctx.start_subprotocol(Box::new(multiply)));
            self.product_ids.push(product_id);
        }
        driver.phase = DriverPhase::Multiplying(states::Multiplying { pending });
        Ok(())
    }

    fn handle_completion(
        &mut self,
        ctx: &mut Context<'_>,
        event: &ProtocolEvent,
    ) -> Result<(), ProtocolError> {
        let Some(driver) = &mut self.driver else {
            return Ok(());
        };
        let DriverPhase::Multiplying(multiplying) = &mut driver.phase else {
            return Ok(());
        };
        multiplying.pending.remove(&event.protocol_id);
        if !multiplying.pending.is_empty() {
            return Ok(());
        }
        let payload = Payload::DotProductSum {
            product_ids: self.product_ids.clone(),
            output_id: self.output_id.clone(),
            tag: self.tag.clone(),
        };
        ctx.multicast(&driver.participants, payload);
        let acks = NodeJar::new(driver.participants.len());
        driver.phase = DriverPhase::Summing(states::Summing { acks });
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::DotProductSum { product_ids, output_id, tag } => {
                let field = *ctx.field();
                let mut value = 0u64;
                let mut witness = Some(0u64);
                for id in &product_ids {
                    let share = ctx.share(id)?;
                    value = field.add(value, share.value());
                    witness = match (witness, share.witness()) {
                        (Some(sum), Some(next)) => Some(field.add(sum, next)),
                        _ => None,
                    };
                }
                let share = Share::new(ctx.node_id(), value, witness);
                ctx.store(output_id.clone(), share, Some(Lifetime::from_tag(tag)));
                ctx.unicast_completion(message.sender, Payload::Ack);
                if self.driver.is_none() {
                    self.outcome = Some(ProtocolOutcome::SharesStored { secret_id: output_id });
                }
                Ok(())
            }
            Payload::Ack => {
                let Some(driver) = &mut self.driver else {
                    return Err(ProtocolError::UnexpectedMessage("ack"));
                };
                let DriverPhase::Summing(summing) = &mut driver.phase else {
                    return Err(ProtocolError::UnexpectedMessage("ack"));
                };
                if summing.acks.contains(message.sender) {
                    // The fabric promises no duplication, but a tolerant count costs nothing.
                    tracing::warn!(sender = %message.sender, "ignoring duplicate dot product ack");
                    return Ok(());
                }
                summing.acks.add_element(message.sender, ())?;
                if summing.acks.is_full() {
                    self.outcome = Some(ProtocolOutcome::SharesStored {
                        secret_id: self.output_id.clone(),
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

/// Builds a dot product responder from the fold request.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::DotProductSum { product_ids, output_id, tag } => Ok(Box::new(
            DotProductState::new_responder(product_ids.clone(), output_id.clone(), tag.clone()),
        )),
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
