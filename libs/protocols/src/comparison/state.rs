//! Comparison protocol state machine.

use crate::{
    errors::ProtocolError,
    event::{take_outcome, ProtocolEvent, ProtocolOutcome},
    linear::LinearState,
    message::{Payload, ProtocolMessage, ProtocolType, SecretId},
    multiplication::MultiplyState,
    reconstruct::ReconstructState,
    runtime::{Context, Protocol},
    setup::{key_bit_id, KEY_SECRET_ID},
    storage::Lifetime,
};
use basic_types::{NodeId, NodeJar};
use itertools::Itertools;
use rustc_hash::FxHashSet;
use shamir_sharing::Share;

/// The comparison protocol state definitions.
pub mod states {
    use crate::message::ProtocolId;
    use basic_types::NodeJar;
    use rustc_hash::FxHashSet;

    /// The phases the comparison initiator walks through, one sub-protocol wave at a time.
    pub enum DriverPhase {
        /// Computing `diff = a - b`.
        Difference {
            /// The running subtraction.
            sub: ProtocolId,
        },

        /// Computing `z = diff + diff`.
        Doubling {
            /// The running addition.
            sub: ProtocolId,
        },

        /// Computing `w = z + r_key`.
        Masking {
            /// The running addition.
            sub: ProtocolId,
        },

        /// Revealing `c = w` to the initiator.
        Revealing {
            /// The running reconstruction.
            sub: ProtocolId,
        },

        /// Every participant is deriving its equality-bit shares from the broadcast `c`.
        Setup {
            /// Acknowledgments collected so far.
            acks: NodeJar<()>,
        },

        /// The prefix-equality multiply chain is running.
        Prefix {
            /// The bit position whose prefix product is being produced.
            producing: u32,
            /// The running multiplication.
            sub: ProtocolId,
        },

        /// One multiplication per zero bit of `c` is running.
        Terms {
            /// The multiplications still outstanding.
            pending: FxHashSet<ProtocolId>,
        },

        /// Every participant is folding its term shares.
        Combining {
            /// Acknowledgments collected so far.
            acks: NodeJar<()>,
        },

        /// Computing `lsb(r) * terms` for the final exclusive-or.
        Parity {
            /// The running multiplication.
            sub: ProtocolId,
        },

        /// Every participant is deriving and storing its result share.
        Finalizing {
            /// Acknowledgments collected so far.
            acks: NodeJar<()>,
        },
    }
}

use states::DriverPhase;

struct Driver {
    left_id: SecretId,
    right_id: SecretId,
    participants: Vec<NodeId>,
    phase: DriverPhase,
}

/// Compares two shared values, leaving shares of the strict less-than bit under the output id.
pub struct CompareState {
    output_id: SecretId,
    tag: Option<String>,
    // The revealed masked value; every participant remembers it between the setup, combine and
    // finalize steps.
    revealed: Option<u64>,
    driver: Option<Driver>,
    outcome: Option<ProtocolOutcome>,
}

fn diff_id(output_id: &str) -> SecretId {
    format!("{output_id}.diff")
}

fn doubled_id(output_id: &str) -> SecretId {
    format!("{output_id}.doubled")
}

fn masked_id(output_id: &str) -> SecretId {
    format!("{output_id}.masked")
}

fn eq_id(output_id: &str, bit: u32) -> SecretId {
    format!("{output_id}.eq[{bit}]")
}

fn prefix_id(output_id: &str, bit: u32) -> SecretId {
    format!("{output_id}.pp[{bit}]")
}

fn term_id(output_id: &str, bit: u32) -> SecretId {
    format!("{output_id}.term[{bit}]")
}

fn terms_sum_id(output_id: &str) -> SecretId {
    format!("{output_id}.terms")
}

fn parity_id(output_id: &str) -> SecretId {
    format!("{output_id}.parity")
}

impl CompareState {
    /// Construct the initiator for `output = [left < right]`.
    pub fn new_initiator(
        left: impl Into<SecretId>,
        right: impl Into<SecretId>,
        output_id: impl Into<SecretId>,
        tag: Option<String>,
        participants: Vec<NodeId>,
    ) -> Self {
        Self {
            output_id: output_id.into(),
            tag,
            revealed: None,
            driver: Some(Driver {
                left_id: left.into(),
                right_id: right.into(),
                participants,
                phase: DriverPhase::Setup { acks: NodeJar::default() },
            }),
            outcome: None,
        }
    }

    fn new_responder(output_id: SecretId, tag: Option<String>) -> Self {
        Self { output_id, tag, revealed: None, driver: None, outcome: None }
    }

    // Starts the prefix chain after every participant acknowledged the setup broadcast. For a
    // single-bit field there is nothing to chain and the term wave starts directly.
    fn begin_bit_circuit(
        ctx: &mut Context<'_>,
        output_id: &str,
        tag: &Option<String>,
        participants: &[NodeId],
        revealed: u64,
        bits: u32,
    ) -> DriverPhase {
        if bits < 2 {
            return Self::begin_terms(ctx, output_id, tag, participants, revealed, bits);
        }
        let producing = bits - 2;
        let multiply = MultiplyState::new_initiator(
            prefix_id(output_id, bits - 1),
            eq_id(output_id, bits - 1),
            prefix_id(output_id, producing),
            tag.clone(),
            participants.to_vec(),
        );
        let sub = ctx.start_subprotocol(Box::new(multiply));
        DriverPhase::Prefix { producing, sub }
    }

    // Starts one multiplication per zero bit of the revealed value. With no zero bits the term
    // sum is empty and the combine broadcast goes out immediately.
    fn begin_terms(
        ctx: &mut Context<'_>,
        output_id: &str,
        tag: &Option<String>,
        participants: &[NodeId],
        revealed: u64,
        bits: u32,
    ) -> DriverPhase {
        let zero_bits = (0..bits).filter(|bit| (revealed >> bit) & 1 == 0).collect_vec();
        if zero_bits.is_empty() {
            ctx.multicast(participants, Payload::CompareCombine);
            return DriverPhase::Combining { acks: NodeJar::new(participants.len()) };
        }
        let mut pending = FxHashSet::default();
        for bit in zero_bits {
            let multiply = MultiplyState::new_initiator(
                key_bit_id(bit),
                prefix_id(output_id, bit),
                term_id(output_id, bit),
                tag.clone(),
                participants.to_vec(),
            );
            pending.insert(ctx.start_subprotocol(Box::new(multiply)));
        }
        DriverPhase::Terms { pending }
    }

    // Participant side of the setup broadcast: derive shares of the per-bit equality
    // `eq[i] = (c_i == r_i)` — linear because the bits of `c` are public — and seed the empty
    // prefix product with the constant 1.
    fn apply_setup(&mut self, ctx: &mut Context<'_>, revealed: u64) -> Result<(), ProtocolError> {
        self.revealed = Some(revealed);
        let field = *ctx.field();
        let bits = field.bits();
        let one = Share::constant(ctx.node_id(), 1);
        for bit in 0..bits {
            let key_bit = ctx.share(&key_bit_id(bit))?;
            let eq = if (revealed >> bit) & 1 == 1 { key_bit } else { one.sub(&key_bit, &field)? };
            ctx.store(
                eq_id(&self.output_id, bit),
                eq,
                Some(Lifetime::from_tag(self.tag.clone())),
            );
        }
        ctx.store(
            prefix_id(&self.output_id, bits - 1),
            one,
            Some(Lifetime::from_tag(self.tag.clone())),
        );
        Ok(())
    }

    // Participant side of the combine broadcast: fold the term shares for the zero bits of `c`
    // into one share of `[c < r]`.
    fn apply_combine(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let revealed =
            self.revealed.ok_or(ProtocolError::UnexpectedMessage("compare-combine"))?;
        let field = *ctx.field();
        let bits = field.bits();
        let mut sum: Option<Share> = None;
        for bit in (0..bits).filter(|bit| (revealed >> bit) & 1 == 0) {
            let term = ctx.share(&term_id(&self.output_id, bit))?;
            sum = Some(match sum {
                Some(sum) => sum.add(&term, &field)?,
                None => term,
            });
        }
        let sum = sum.unwrap_or_else(|| Share::constant(ctx.node_id(), 0));
        ctx.store(
            terms_sum_id(&self.output_id),
            sum,
            Some(Lifetime::from_tag(self.tag.clone())),
        );
        Ok(())
    }

    // Participant side of the finalize broadcast: two exclusive-ors over shared bits.
    // `v = lsb(r) xor [c < r]` needs the parity product; xor against the public `lsb(c)` is a
    // plain complement.
    fn apply_finalize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let revealed =
            self.revealed.ok_or(ProtocolError::UnexpectedMessage("compare-finalize"))?;
        let field = *ctx.field();
        let key_lsb = ctx.share(&key_bit_id(0))?;
        let terms = ctx.share(&terms_sum_id(&self.output_id))?;
        let parity = ctx.share(&parity_id(&self.output_id))?;
        let xor = field.sub(
            field.add(key_lsb.value(), terms.value()),
            field.mul(2, parity.value()),
        );
        let result = if revealed & 1 == 1 { field.sub(1, xor) } else { xor };
        ctx.store(
            self.output_id.clone(),
            Share::new(ctx.node_id(), result, None),
            Some(Lifetime::from_tag(self.tag.clone())),
        );
        Ok(())
    }
}

impl Protocol for CompareState {
    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::SecureCompare
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
        let Some(driver) = &mut self.driver else {
            return Ok(());
        };
        if driver.participants.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        let subtract = LinearState::sub(
            driver.left_id.clone(),
            driver.right_id.clone(),
            diff_id(&self.output_id),
            self.tag.clone(),
            driver.participants.clone(),
        );
        let sub = ctx.start_subprotocol(Box::new(subtract));
        driver.phase = DriverPhase::Difference { sub };
        Ok(())
    }

    fn handle_completion(
        &mut self,
        ctx: &mut Context<'_>,
        event: &ProtocolEvent,
    ) -> Result<(), ProtocolError> {
        let output_id = self.output_id.clone();
        let tag = self.tag.clone();
        let revealed = self.revealed;
        let bits = ctx.field().bits();
        let Some(driver) = &mut self.driver else {
            return Ok(());
        };
        let participants = driver.participants.clone();

        // The term wave is the only phase with more than one sub-protocol in flight.
        let terms_left = match &mut driver.phase {
            DriverPhase::Terms { pending } => {
                pending.remove(&event.protocol_id);
                Some(pending.len())
            }
            _ => None,
        };
        match terms_left {
            Some(0) => {
                ctx.multicast(&participants, Payload::CompareCombine);
                driver.phase = DriverPhase::Combining { acks: NodeJar::new(participants.len()) };
                return Ok(());
            }
            Some(_) => return Ok(()),
            None => {}
        }

        let next = match &driver.phase {
            DriverPhase::Difference { sub } if *sub == event.protocol_id => {
                let add = LinearState::add(
                    diff_id(&output_id),
                    diff_id(&output_id),
                    doubled_id(&output_id),
                    tag.clone(),
                    participants.clone(),
                );
                Some(DriverPhase::Doubling { sub: ctx.start_subprotocol(Box::new(add)) })
            }
            DriverPhase::Doubling { sub } if *sub == event.protocol_id => {
                let add = LinearState::add(
                    doubled_id(&output_id),
                    KEY_SECRET_ID,
                    masked_id(&output_id),
                    tag.clone(),
                    participants.clone(),
                );
                Some(DriverPhase::Masking { sub: ctx.start_subprotocol(Box::new(add)) })
            }
            DriverPhase::Masking { sub } if *sub == event.protocol_id => {
                let reveal = ReconstructState::new_initiator(
                    masked_id(&output_id),
                    tag.clone(),
                    participants.clone(),
                );
                Some(DriverPhase::Revealing { sub: ctx.start_subprotocol(Box::new(reveal)) })
            }
            DriverPhase::Revealing { sub } if *sub == event.protocol_id => {
                let ProtocolOutcome::SecretRevealed { value, .. } = &event.outcome else {
                    return Err(ProtocolError::UnexpectedMessage("secret-revealed"));
                };
                ctx.multicast(
                    &participants,
                    Payload::CompareSetup {
                        revealed: *value,
                        output_id: output_id.clone(),
                        tag: tag.clone(),
                    },
                );
                Some(DriverPhase::Setup { acks: NodeJar::new(participants.len()) })
            }
            DriverPhase::Parity { sub } if *sub == event.protocol_id => {
                ctx.multicast(&participants, Payload::CompareFinalize);
                Some(DriverPhase::Finalizing { acks: NodeJar::new(participants.len()) })
            }
            DriverPhase::Prefix { producing, sub } if *sub == event.protocol_id => {
                let producing = *producing;
                if producing == 0 {
                    let revealed =
                        revealed.ok_or(ProtocolError::UnexpectedMessage("prefix-product"))?;
                    Some(Self::begin_terms(ctx, &output_id, &tag, &participants, revealed, bits))
                } else {
                    let multiply = MultiplyState::new_initiator(
                        prefix_id(&output_id, producing),
                        eq_id(&output_id, producing),
                        prefix_id(&output_id, producing - 1),
                        tag.clone(),
                        participants.clone(),
                    );
                    Some(DriverPhase::Prefix {
                        producing: producing - 1,
                        sub: ctx.start_subprotocol(Box::new(multiply)),
                    })
                }
            }
            _ => None,
        };
        if let Some(next) = next {
            driver.phase = next;
        }
        Ok(())
    }

    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        match message.payload {
            Payload::CompareSetup { revealed, .. } => {
                self.apply_setup(ctx, revealed)?;
                ctx.unicast_completion(message.sender, Payload::Ack);
                Ok(())
            }
            Payload::CompareCombine => {
                self.apply_combine(ctx)?;
                ctx.unicast_completion(message.sender, Payload::Ack);
                Ok(())
            }
            Payload::CompareFinalize => {
                self.apply_finalize(ctx)?;
                ctx.unicast_completion(message.sender, Payload::Ack);
                if self.driver.is_none() {
                    self.outcome = Some(ProtocolOutcome::SharesStored {
                        secret_id: self.output_id.clone(),
                    });
                }
                Ok(())
            }
            Payload::Ack => {
                let output_id = self.output_id.clone();
                let tag = self.tag.clone();
                let revealed = self.revealed;
                let bits = ctx.field().bits();
                let Some(driver) = &mut self.driver else {
                    return Err(ProtocolError::UnexpectedMessage("ack"));
                };
                let participants = driver.participants.clone();
                let full = match &mut driver.phase {
                    DriverPhase::Setup { acks }
                    | DriverPhase::Combining { acks }
                    | DriverPhase::Finalizing { acks } => {
                        acks.add_element(message.sender, ())?;
                        acks.is_full()
                    }
                    _ => return Err(ProtocolError::UnexpectedMessage("ack")),
                };
                if !full {
                    return Ok(());
                }
                let next = match &driver.phase {
                    DriverPhase::Setup { .. } => {
                        let revealed =
                            revealed.ok_or(ProtocolError::UnexpectedMessage("ack"))?;
                        Some(Self::begin_bit_circuit(
                            ctx,
                            &output_id,
                            &tag,
                            &participants,
                            revealed,
                            bits,
                        ))
                    }
                    DriverPhase::Combining { .. } => {
                        let multiply = MultiplyState::new_initiator(
                            key_bit_id(0),
                            terms_sum_id(&output_id),
                            parity_id(&output_id),
                            tag.clone(),
                            participants.clone(),
                        );
                        Some(DriverPhase::Parity { sub: ctx.start_subprotocol(Box::new(multiply)) })
                    }
                    DriverPhase::Finalizing { .. } => {
                        self.outcome =
                            Some(ProtocolOutcome::SharesStored { secret_id: output_id.clone() });
                        None
                    }
                    _ => None,
                };
                if let Some(next) = next {
                    driver.phase = next;
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

/// Builds a comparison responder from the setup broadcast.
pub(crate) fn build_responder(
    message: &ProtocolMessage,
) -> Result<Box<dyn Protocol>, ProtocolError> {
    match &message.payload {
        Payload::CompareSetup { output_id, tag, .. } => {
            Ok(Box::new(CompareState::new_responder(output_id.clone(), tag.clone())))
        }
        other => Err(ProtocolError::UnexpectedMessage(other.label())),
    }
}
