//! Extremum scan state machine.

use crate::{
    comparison::CompareState,
    errors::ProtocolError,
    event::{take_outcome, ProtocolEvent, ProtocolOutcome},
    linear::LinearState,
    message::{Payload, ProtocolMessage, ProtocolType, SecretId},
    multiplication::MultiplyState,
    runtime::{Context, Protocol},
    storage::{component_id, Lifetime},
};
use basic_types::{NodeId, NodeJar};
use shamir_sharing::Share;

/// Whether the scan keeps the smaller or the larger element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Keep the minimum; ties keep the earlier index.
    Min,

    /// Keep the maximum; ties keep the earlier index.
    Max,
}

/// The extremum protocol state definitions.
pub mod states {
    use basic_types::NodeJar;

    /// The waves the scan driver walks through.
    pub enum Wave {
        /// Every participant is seeding the running value and index.
        Seeding {
            /// Acknowledgments collected so far.
            acks: NodeJar<()>,
        },

        /// The comparison and the two deltas are running.
        Comparing {
            /// How many of the three are still outstanding.
            remaining: u8,
        },

        /// The two scalings by the comparison bit are running.
        Scaling {
            /// How many of the two are still outstanding.
            remaining: u8,
        },

        /// The two in-place additions are running.
        Updating {
            /// How many of the two are still outstanding.
            remaining: u8,
        },
    }
}

use states::Wave;

struct Driver {
    base_id: SecretId,
    first: usize,
    last: usize,
    participants: Vec<NodeId>,
    position: usize,
    wave: Wave,
}

/// Locates the extreme element of a shared array, leaving shares of the extreme value and of
/// an index achieving it under the caller's ids.
pub struct ExtremumState {
    direction: Direction,
    value_id: SecretId,
    index_id: SecretId,
    tag: Option<String>,
    driver: Option<Driver>,
    outcome: Option<ProtocolOutcome>,
}

fn flag_id(value_id: &str) -> SecretId {
    format!("{value_id}.flag")
}

fn value_delta_id(value_id: &str) -> SecretId {
    format!("{value_id}.dv")
}

fn index_delta_id(value_id: &str) -> SecretId {
    format!("{value_id}.dk")
}

fn value_gain_id(value_id: &str) -> SecretId {
    format!("{value_id}.gv")
}

fn index_gain_id(value_id: &str) -> SecretId {
    format!("{value_id}.gk")
}

impl ExtremumState {
    /// Construct the initiator scanning `base[first..=last]` for its minimum.
    pub fn new_find_min(
        base_id: impl Into<SecretId>,
        first: usize,
        last: usize,
        value_id: impl Into<SecretId>,
        index_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self::new_initiator(Direction::Min, base_id, first, last, value_id, index_id, tag, participants)
    }

    /// Construct the initiator scanning `base[first..=last]` for its maximum.
    pub fn new_find_max(
        base_id: impl Into<SecretId>,
        first: usize,
        last: usize,
        value_id: impl Into<SecretId>,
        index_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self::new_initiator(Direction::Max, base_id, first, last, value_id, index_id, tag, participants)
    }

    #[allow(clippy::too_many_arguments)]
    fn new_initiator(
        direction: Direction,
        base_id: impl Into<SecretId>,
        first: usize,
        last: usize,
        value_id: impl Into<SecretId>,
        index_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        let acks = NodeJar::new(participants.len());
        Self {
            direction,
            value_id: value_id.into(),
            index_id: index_id.into(),
            tag,
            driver: Some(Driver {
                base_id: base_id.into(),
                first,
                last,
                participants,
                position: first,
                wave: Wave::Seeding { acks },
            }),
            outcome: None,
        }
    }

    fn new_responder(direction: Direction, value_id: SecretId, index_id: SecretId) -> Self {
        Self { direction, value_id, index_id, tag: None, driver: None, outcome: None }
    }

    // Starts the compare + delta wave for the element at `position`.
    fn start_comparing(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(driver) = &mut self.driver else {
            return Ok(());
        };
        let element_id = component_id(&driver.base_id, driver.position);
        // The flag must be 1 exactly when the candidate beats the running value, strictly, so
        // ties keep the earlier index: min compares candidate < running, max the reverse.
        let (compare_left, compare_right) = match self.direction {
            Direction::Min => (element_id.clone(), self.value_id.clone()),
            Direction::Max => (self.value_id.clone(), element_id.clone()),
        };
        let compare = CompareState::new_initiator(
            compare_left,
            compare_right,
            flag_id(&self.value_id),
            self.tag.clone(),
            driver.participants.clone(),
        );
        let value_delta = LinearState::sub(
            element_id,
            self.value_id.clone(),
            value_delta_id(&self.value_id),
            self.tag.clone(),
            driver.participants.clone(),
        );
        let index_delta = LinearState::known_sub(
            driver.position as u64,
            self.index_id.clone(),
            true,
            index_delta_id(&self.value_id),
            self.tag.clone(),
            driver.participants.clone(),
        );
        ctx.start_subprotocol(Box::new(compare));
        ctx.start_subprotocol(Box::new(value_delta));
        ctx.start_subprotocol(Box::new(index_delta));
        driver.wave = Wave::Comparing { remaining: 3 };
        Ok(())
    }

    fn start_scaling(&mut self, ctx: &mut Context<'_>) {
        let Some(driver) = &mut self.driver else {
            return;
        };
        let value_gain = MultiplyState::new_initiator(
            flag_id(&self.value_id),
            value_delta_id(&self.value_id),
            value_gain_id(&self.value_id),
            self.tag.clone(),
            driver.participants.clone(),
        );
        let index_gain = MultiplyState::new_initiator(
            flag_id(&self.value_id),
            index_delta_id(&self.value_id),
            index_gain_id(&self.value_id),
            self.tag.clone(),
            driver.participants.clone(),
        );
        ctx.start_subprotocol(Box::new(value_gain));
        ctx.start_subprotocol(Box::new(index_gain));
        driver.wave = Wave::Scaling { remaining: 2 };
    }

    // The two additions write straight back to the running ids, which is how every participant
    // sees the update.
    fn start_updating(&mut self, ctx: &mut Context<'_>) {
        let Some(driver) = &mut self.driver else {
            return;
        };
        let fold_value = LinearState::add(
            self.value_id.clone(),
            value_gain_id(&self.value_id),
            self.value_id.clone(),
            self.tag.clone(),
            driver.participants.clone(),
        );
        let fold_index = LinearState::add(
            self.index_id.clone(),
            index_gain_id(&self.value_id),
            self.index_id.clone(),
            self.tag.clone(),
            driver.participants.clone(),
        );
        ctx.start_subprotocol(Box::new(fold_value));
        ctx.start_subprotocol(Box::new(fold_index));
        driver.wave = Wave::Updating { remaining: 2 };
    }

    fn finish(&mut self) {
        self.outcome = Some(ProtocolOutcome::ExtremumLocated {
            value_id: self.value_id.clone(),
            index_id: self.index_id.clone(),
        });
    }
}

impl Protocol for ExtremumState {
    fn protocol_type(&self) -> ProtocolType {
        match self.direction {
            Direction::Min => ProtocolType::SecureFindMin,
            Direction::Max => ProtocolType::SecureFindMax,
        }
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(driver) = &self.driver else {
            return Ok(());
        };
        if driver.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        if driver.first > driver.last {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "scan range [{}, {}] is empty",
                driver.first, driver.last
            )));
        }
        let payload = Payload::FindInit {
            base_id: driver.base_id.clone(),
            first: driver.first,
            value_id: self.value_id.clone(),
            index_id: self.index_id.clone(),
            tag: self.tag.clone(),
        };
        ctx.multicast(&driver.participants, payload);
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::FindInit { base_id, first, value_id, index_id, tag } => {
                let seed = ctx.share(&component_id(&base_id, first))?;
                ctx.store(value_id.clone(), seed, Some(Lifetime::from_tag(tag.clone())));
                let index_seed = Share::new(
                    ctx.node_id(),
                    ctx.field().element(first as u64),
                    Some(first as u64),
                );
                ctx.store(index_id.clone(), index_seed, Some(Lifetime::from_tag(tag)));
                ctx.unicast_completion(message.sender, Payload::Ack);
                if self.driver.is_none() {
                    self.outcome =
                        Some(ProtocolOutcome::ExtremumLocated { value_id, index_id });
                }
                Ok(())
            }
            Payload::Ack => {
                let seeded = {
                    let Some(driver) = &mut self.driver else {
                        return Err(ProtocolError::UnexpectedMessage("ack"));
                    };
                    let Wave::Seeding { acks } = &mut driver.wave else {
                        return Err(ProtocolError::UnexpectedMessage("ack"));
                    };
                    acks.add_element(message.sender, ())?;
                    if !acks.is_full() {
                        return Ok(());
                    }
                    if driver.first == driver.last {
                        // A single-element range is already resolved by the copy wave.
                        None
                    } else {
                        driver.position = driver.first + 1;
                        Some(())
                    }
                };
                match seeded {
                    None => {
                        self.finish();
                        Ok(())
                    }
                    Some(()) => self.start_comparing(ctx),
                }
            }
            other => Err(ProtocolError::UnexpectedMessage(other.label())),
        }
    }

    fn handle_completion(
        &mut self,
        ctx: &mut Context<'_>,
        _event: &ProtocolEvent,
    ) -> Result<(), ProtocolError> {
        enum Step {
            Wait,
            Scale,
            Update,
            Advance,
            Finish,
        }
        let step = {
            let Some(driver) = &mut self.driver else {
                return Ok(());
            };
            match &mut driver.wave {
                Wave::Seeding { .. } => Step::Wait,
                Wave::Comparing { remaining } => {
                    *remaining -= 1;
                    if *remaining == 0 { Step::Scale } else { Step::Wait }
                }
                Wave::Scaling { remaining } => {
                    *remaining -= 1;
                    if *remaining == 0 { Step::Update } else { Step::Wait }
                }
                Wave::Updating { remaining } => {
                    *remaining -= 1;
                    if *remaining > 0 {
                        Step::Wait
                    } else if driver.position == driver.last {
                        Step::Finish
                    } else {
                        driver.position += 1;
                        Step::Advance
                    }
                }
            }
        };
        match step {
            Step::Wait => Ok(()),
            Step::Scale => {
                self.start_scaling(ctx);
                Ok(())
            }
            Step::Update => {
                self.start_updating(ctx);
                Ok(())
            }
            Step::Advance => self.start_comparing(ctx),
            Step::Finish => {
                self.finish();
                Ok(())
            }
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

/// Builds an extremum responder from the seeding broadcast.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    let direction = match message.protocol_type {
        ProtocolType::SecureFindMax => Direction::Max,
        _ => Direction::Min,
    };
    match &message.payload {
        Payload::FindInit { value_id, index_id, .. } => Ok(Box::new(ExtremumState::new_responder(
            direction,
            value_id.clone(),
            index_id.clone(),
        ))),
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
