//! End-to-end tests for the reconstruction protocol.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    distribution::ShareDistributionState,
    event::ProtocolOutcome,
    reconstruct::ReconstructState,
    simulator::Cluster,
};
use basic_types::NodeId;
use math_lib::PrimeField;

const PRIME: u64 = 2147483647;

fn cluster(size: u32) -> Cluster {
    Cluster::new(size, PrimeField::new(PRIME).unwrap())
}

#[test]
fn only_the_initiator_learns_the_secret() {
    let mut cluster = cluster(7);
    let participants = cluster.participants();
    let initiator = NodeId::new(3);

    let distribute =
        ShareDistributionState::new_initiator("secret", 31337, 4, None, participants.clone());
    cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    cluster.run_to_completion(100).unwrap();

    let reveal = ReconstructState::new_initiator("secret", None, participants);
    cluster.start(initiator, Box::new(reveal)).unwrap();
    cluster.run_to_completion(100).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].outcome,
        ProtocolOutcome::SecretRevealed { secret_id: "secret".into(), value: 31337 }
    );

    // The initiator keeps the plaintext as a constant share; other nodes keep their original
    // polynomial shares and learn nothing new.
    let kept = cluster.storage(initiator).unwrap().get("secret").unwrap();
    assert_eq!(kept.value(), 31337);
    assert_eq!(kept.witness(), Some(31337));
}

#[test]
fn reconstructing_an_unknown_secret_fails_fatally() {
    let mut cluster = cluster(3);
    let participants = cluster.participants();
    let reveal = ReconstructState::new_initiator("missing", None, participants);
    // The initiator's own self-delivered request already trips the missing-share error.
    assert!(cluster.start(NodeId::new(1), Box::new(reveal)).is_err());
}
