//! Barrier protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolOutcome},
    message::{Payload, ProtocolMessage, ProtocolType},
    runtime::{Context, Protocol},
};
use basic_types::{NodeId, NodeJar};

/// One participant's side of a named barrier.
pub struct BarrierState {
    name: String,
    // Whether the local participant has reached the barrier. Passively spawned responders stay
    // inactive until start_protocol activates them.
    active: bool,
    signalled: bool,
    participants: Vec<NodeId>,
    signals: NodeJar<()>,
    outcome: Option<ProtocolOutcome>,
}

impl BarrierState {
    /// Construct the local participant's instance; starting it broadcasts the signal.
    pub fn new(name: impl Into<String>, participants: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            active: true,
            signalled: false,
            participants,
            signals: NodeJar::default(),
            outcome: None,
        }
    }

    fn new_responder(name: String) -> Self {
        Self {
            name,
            active: false,
            signalled: false,
            participants: Vec::new(),
            signals: NodeJar::default(),
            outcome: None,
        }
    }

    fn signal(&mut self, ctx: &Context<'_>) {
        if self.signalled {
            return;
        }
        self.signalled = true;
        ctx.multicast(&self.participants, Payload::BarrierSignal { name: self.name.clone() });
    }
}

impl Protocol for BarrierState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::Barrier
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        if self.participants.is_empty() {
            self.participants = ctx.network_participants();
        }
        if self.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        self.signals = NodeJar::new(self.participants.len());
        if self.active {
            self.signal(ctx);
        }
        Ok(())
    }

    fn activate(
        &mut self,
        ctx: &mut Context<'_>,
        _starter: Box<dyn Protocol>,
    ) -> Result<(), ProtocolError> {
        // A barrier instance carries no caller-side state, so the starter is dropped and the
        // passively counting instance just signals.
        self.active = true;
        self.signal(ctx);
        Ok(())
    }

    fn handle_message(
        &mut self,
        _ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::BarrierSignal { .. } => {
                self.signals
                    .add_element(message.sender, ())
                    .map_err(|_| ProtocolError::DuplicateSignal(message.sender))?;
                if self.signals.is_full() {
                    self.outcome = Some(ProtocolOutcome::Synchronized);
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

/// Builds a passive barrier responder from an early signal.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::BarrierSignal { name } => Ok(Box::new(BarrierState::new_responder(name.clone()))),
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
