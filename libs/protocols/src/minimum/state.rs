//! Minimum protocol state machine.

use crate::{
    comparison::CompareState,
    errors::ProtocolError,
    event::{take_outcome, ProtocolEvent, ProtocolOutcome},
    linear::LinearState,
    message::{ProtocolMessage, ProtocolType, SecretId},
    multiplication::MultiplyState,
    runtime::{Context, Protocol},
};
use basic_types::NodeId;

/// The minimum protocol state definitions.
pub mod states {
    /// The phases of the minimum composition.
    pub enum Phase {
        /// The difference and the comparison are running in parallel.
        Comparing {
            /// How many of the two are still outstanding.
            remaining: u8,
        },

        /// `beta * (L - R)` is running.
        Scaling,

        /// `R + scaled` is running.
        Adding,
    }
}

use states::Phase;

/// Computes `min(left, right)` into the output id on every participant.
pub struct MinState {
    left_id: SecretId,
    right_id: SecretId,
    output_id: SecretId,
    tag: Option<String>,
    participants: Vec<NodeId>,
    phase: Phase,
    outcome: Option<ProtocolOutcome>,
}

fn diff_id(output_id: &str) -> SecretId {
    format!("{output_id}.delta")
}

fn flag_id(output_id: &str) -> SecretId {
    format!("{output_id}.flag")
}

fn scaled_id(output_id: &str) -> SecretId {
    format!("{output_id}.scaled")
}

impl MinState {
    /// Construct the initiator for `output = min(left, right)`.
    pub fn new_initiator(
        left: impl Into<SecretId>,
        right: impl Into<SecretId>,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self {
            left_id: left.into(),
            right_id: right.into(),
            output_id: output_id.into(),
            tag,
            participants,
            phase: Phase::Comparing { remaining: 2 },
            outcome: None,
        }
    }
}

impl Protocol for MinState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::SecureMin
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        if self.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        let subtract = LinearState::sub(
            self.left_id.clone(),
            self.right_id.clone(),
            diff_id(&self.output_id),
            self.tag.clone(),
            self.participants.clone(),
        );
        let compare = CompareState::new_initiator(
            self.left_id.clone(),
            self.right_id.clone(),
            flag_id(&self.output_id),
            self.tag.clone(),
            self.participants.clone(),
        );
        ctx.start_subprotocol(Box::new(subtract));
        ctx.start_subprotocol(Box::new(compare));
        self.phase = Phase::Comparing { remaining: 2 };
        Ok(())
    }

    fn handle_completion(
        &mut self,
        ctx: &mut Context<'_>,
        _event: &ProtocolEvent,
    ) -> Result<(), ProtocolError> {
        let wait = match &mut self.phase {
            Phase::Comparing { remaining } => {
                *remaining -= 1;
                *remaining > 0
            }
            Phase::Scaling | Phase::Adding => false,
        };
        if wait {
            return Ok(());
        }
        match &self.phase {
            Phase::Comparing { .. } => {
                let multiply = MultiplyState::new_initiator(
                    flag_id(&self.output_id),
                    diff_id(&self.output_id),
                    scaled_id(&self.output_id),
                    self.tag.clone(),
                    self.participants.clone(),
                );
                ctx.start_subprotocol(Box::new(multiply));
                self.phase = Phase::Scaling;
            }
            Phase::Scaling => {
                let add = LinearState::add(
                    self.right_id.clone(),
                    scaled_id(&self.output_id),
                    self.output_id.clone(),
                    self.tag.clone(),
                    self.participants.clone(),
                );
                ctx.start_subprotocol(Box::new(add));
                self.phase = Phase::Adding;
            }
            Phase::Adding => {
                self.outcome =
                    Some(ProtocolOutcome::SharesStored { secret_id: self.output_id.clone() });
            }
        }
        Ok(())
    }

    fn handle_message(
        &mut self,
        _ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        Err(ProtocolError::UnexpectedMessage(message.payload.label()))
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
