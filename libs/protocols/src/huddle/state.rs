//! Huddle protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolOutcome},
    huddle::target_component_id,
    message::{Payload, ProtocolMessage, ProtocolType, SecretId, TargetContribution},
    runtime::{Context, Protocol},
    storage::Lifetime,
};
use basic_types::{NodeId, NodeJar};
use rustc_hash::FxHashMap;
use shamir_sharing::{BatchSharePolynomial, Share};

/// The huddle protocol state definitions.
pub mod states {
    /// The running sums a recipient keeps for one target node.
    pub struct TargetAccumulator {
        /// Component-wise sums of the contribution shares received so far.
        pub sums: Vec<u64>,

        /// How many senders have contributed towards this target.
        pub senders: usize,
    }
}

/// One participant's side of a cost contribution huddle.
pub struct HuddleState {
    base_id: SecretId,
    dimension: usize,
    tag: Option<String>,
    threshold: u32,
    // Plaintext contribution vectors towards each other participant; empty on passive
    // responders, which only accumulate.
    contributions: Vec<(NodeId, Vec<u64>)>,
    active: bool,
    sent: bool,
    participants: Vec<NodeId>,
    accumulators: FxHashMap<NodeId, states::TargetAccumulator>,
    ready: NodeJar<()>,
    outcome: Option<ProtocolOutcome>,
}

impl HuddleState {
    /// Construct the local participant's instance with its contributions towards every other
    /// participant.
    pub fn new(
        base_id: impl Into<SecretId>,
        dimension: usize,
        threshold: u32,
        contributions: Vec<(NodeId, Vec<u64>)>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self {
            base_id: base_id.into(),
            dimension,
            tag,
            threshold,
            contributions,
            active: true,
            sent: false,
            participants,
            accumulators: FxHashMap::default(),
            ready: NodeJar::default(),
            outcome: None,
        }
    }

    fn new_responder(base_id: SecretId, dimension: usize, tag: Option<String>) -> Self {
        Self {
            base_id,
            dimension,
            tag,
            threshold: 0,
            contributions: Vec::new(),
            active: false,
            sent: false,
            participants: Vec::new(),
            accumulators: FxHashMap::default(),
            ready: NodeJar::default(),
            outcome: None,
        }
    }

    fn send_bundles(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        if self.sent {
            return Ok(());
        }
        let node_count = self.participants.len();
        if node_count < 2 {
            return Err(ProtocolError::InvalidConfiguration(
                "a huddle needs at least two participants".into(),
            ));
        }
        if self.dimension == 0 {
            return Err(ProtocolError::InvalidConfiguration("contribution vector size 0".into()));
        }
        if self.threshold < 1 || self.threshold as usize > node_count {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "threshold {} outside [1, {node_count}]",
                self.threshold
            )));
        }
        let mut bundles: FxHashMap<NodeId, Vec<TargetContribution>> = FxHashMap::default();
        for (target, values) in &self.contributions {
            if *target == ctx.node_id() || !self.participants.contains(target) {
                return Err(ProtocolError::InvalidConfiguration(format!(
                    "contribution target {target} is not another participant"
                )));
            }
            if values.len() != self.dimension {
                return Err(ProtocolError::InvalidConfiguration(format!(
                    "contribution towards {target} has {} components, expected {}",
                    values.len(),
                    self.dimension
                )));
            }
            let batch = BatchSharePolynomial::random(
                *ctx.field(),
                values,
                self.threshold,
                &mut rand::thread_rng(),
            )?;
            for recipient in &self.participants {
                let values = batch.shares_at(*recipient)?.iter().map(Share::value).collect();
                bundles
                    .entry(*recipient)
                    .or_default()
                    .push(TargetContribution { target: *target, values });
            }
        }
        for recipient in self.participants.clone() {
            let payload = Payload::HuddleContribution {
                base_id: self.base_id.clone(),
                dimension: self.dimension,
                tag: self.tag.clone(),
                bundles: bundles.remove(&recipient).unwrap_or_default(),
            };
            ctx.unicast(recipient, payload);
        }
        self.sent = true;
        Ok(())
    }
}

impl Protocol for HuddleState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::CostHuddle
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        if self.participants.is_empty() {
            self.participants = ctx.network_participants();
        }
        self.ready = NodeJar::new(self.participants.len());
        if self.active {
            self.send_bundles(ctx)?;
        }
        Ok(())
    }

    fn activate(
        &mut self,
        ctx: &mut Context<'_>,
        starter: Box<dyn Protocol>,
    ) -> Result<(), ProtocolError> {
        // A passive responder was built from a peer's bundle and lacks the local node's
        // contributions; absorb them from the instance the caller tried to start.
        if let Ok(starter) = starter.into_any().downcast::<HuddleState>() {
            self.contributions = starter.contributions;
            self.threshold = starter.threshold;
            self.tag = starter.tag;
        }
        self.active = true;
        self.send_bundles(ctx)
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::HuddleContribution { dimension, bundles, .. } => {
                if dimension != self.dimension {
                    return Err(ProtocolError::InvalidConfiguration(format!(
                        "contribution dimension {dimension} does not match {}",
                        self.dimension
                    )));
                }
                let expected_senders = self.participants.len().saturating_sub(1);
                let field = *ctx.field();
                for TargetContribution { target, values } in bundles {
                    if values.len() != self.dimension {
                        return Err(ProtocolError::UnexpectedMessage("huddle-contribution"));
                    }
                    let accumulator =
                        self.accumulators.entry(target).or_insert(states::TargetAccumulator {
                            sums: vec![0; dimension],
                            senders: 0,
                        });
                    for (sum, value) in accumulator.sums.iter_mut().zip(values) {
                        *sum = field.add(*sum, value);
                    }
                    accumulator.senders += 1;
                    if accumulator.senders == expected_senders {
                        for (component, sum) in accumulator.sums.iter().enumerate() {
                            let share = Share::new(ctx.node_id(), *sum, None);
                            ctx.store(
                                target_component_id(&self.base_id, target, component),
                                share,
                                Some(Lifetime::from_tag(self.tag.clone())),
                            );
                        }
                        ctx.unicast_completion(target, Payload::HuddleReady);
                    }
                }
                Ok(())
            }
            Payload::HuddleReady => {
                self.ready.add_element(message.sender, ())?;
                if self.ready.is_full() {
                    self.outcome =
                        Some(ProtocolOutcome::HuddleSettled { base_id: self.base_id.clone() });
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

/// Builds a passive huddle responder from an early contribution bundle.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::HuddleContribution { base_id, dimension, tag, .. } => {
            Ok(Box::new(HuddleState::new_responder(base_id.clone(), *dimension, tag.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
