//! End-to-end tests for the comparison protocol.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    comparison::CompareState,
    distribution::ShareDistributionState,
    event::ProtocolOutcome,
    simulator::Cluster,
};
use basic_types::NodeId;
use math_lib::PrimeField;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rstest::rstest;

// A Mersenne prime keeps the bit circuit small enough for tests while still exercising every
// phase of the protocol.
const PRIME: u64 = 8191;

fn prepared_cluster(left: u64, right: u64, seed: u64) -> Cluster {
    let mut cluster = Cluster::new(5, PrimeField::new(PRIME).unwrap());
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    cluster.install_preprocessing(2, &mut rng).unwrap();
    let participants = cluster.participants();
    for (id, value) in [("a", left), ("b", right)] {
        let distribute =
            ShareDistributionState::new_initiator(id, value, 2, None, participants.clone());
        cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    }
    cluster.run_to_completion(100).unwrap();
    cluster
}

#[rstest]
#[case(5, 9, 1)]
#[case(9, 5, 0)]
#[case(7, 7, 0)]
#[case(0, 1, 1)]
#[case(0, 0, 0)]
#[case(4094, 4095, 1)]
#[case(4095, 4094, 0)]
#[case(1, 4095, 1)]
fn comparison_yields_the_strict_less_than_bit(
    #[case] left: u64,
    #[case] right: u64,
    #[case] expected: u64,
) {
    // Different seeds exercise different masks, including ones bigger than the operands.
    let mut cluster = prepared_cluster(left, right, left * 8191 + right);
    let participants = cluster.participants();
    let initiator = NodeId::new(1);

    let compare =
        CompareState::new_initiator("a", "b", "lt", Some("cmp".into()), participants);
    cluster.start(initiator, Box::new(compare)).unwrap();
    cluster.run_to_completion(10_000).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, ProtocolOutcome::SharesStored { secret_id: "lt".into() });
    assert_eq!(cluster.reveal("lt").unwrap(), expected, "[{left} < {right}]");
}

#[test]
fn intermediates_are_tagged_for_cleanup() {
    let mut cluster = prepared_cluster(3, 8, 99);
    let participants = cluster.participants();

    let compare = CompareState::new_initiator("a", "b", "lt", Some("cmp".into()), participants);
    cluster.start(NodeId::new(1), Box::new(compare)).unwrap();
    cluster.run_to_completion(10_000).unwrap();
    assert_eq!(cluster.reveal("lt").unwrap(), 1);

    // Purging the round tag drops the circuit intermediates but keeps the sticky key material.
    let manager = cluster.manager_mut(NodeId::new(2)).unwrap();
    manager.storage_mut().clear_by_tag("cmp");
    let storage = manager.storage();
    assert!(storage.get("lt").is_none());
    assert!(storage.get("r-key").is_some());
    assert!(storage.get("r-secret").is_some());
}
