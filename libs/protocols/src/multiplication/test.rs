//! End-to-end tests for the multiplication protocol.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    distribution::ShareDistributionState,
    event::ProtocolOutcome,
    multiplication::MultiplyState,
    simulator::Cluster,
};
use basic_types::NodeId;
use math_lib::PrimeField;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rstest::rstest;

const PRIME: u64 = 2147483647;

fn prepared_cluster(left: u64, right: u64) -> Cluster {
    let mut cluster = Cluster::new(10, PrimeField::new(PRIME).unwrap());
    let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
    cluster.install_preprocessing(5, &mut rng).unwrap();
    let participants = cluster.participants();
    for (id, value) in [("a", left), ("b", right)] {
        let distribute =
            ShareDistributionState::new_initiator(id, value, 5, None, participants.clone());
        cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    }
    cluster.run_to_completion(100).unwrap();
    cluster
}

#[rstest]
#[case(42, 58, 2436)]
#[case(0, 31337, 0)]
#[case(65536, 65536, 4294967296 % PRIME)]
fn multiplication_matches_the_plaintext_product(
    #[case] left: u64,
    #[case] right: u64,
    #[case] expected: u64,
) {
    let mut cluster = prepared_cluster(left, right);
    let participants = cluster.participants();
    let initiator = NodeId::new(2);

    let multiply = MultiplyState::new_initiator("a", "b", "c", Some("round-1".into()), participants);
    cluster.start(initiator, Box::new(multiply)).unwrap();
    cluster.run_to_completion(1000).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, ProtocolOutcome::SharesStored { secret_id: "c".into() });
    assert_eq!(cluster.reveal("c").unwrap(), expected);
}

#[test]
fn multiplication_without_the_mask_is_fatal() {
    let mut cluster = Cluster::new(5, PrimeField::new(PRIME).unwrap());
    let participants = cluster.participants();
    for (id, value) in [("a", 3), ("b", 4)] {
        let distribute =
            ShareDistributionState::new_initiator(id, value, 2, None, participants.clone());
        cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    }
    cluster.run_to_completion(100).unwrap();

    // No dealer ran, so the sticky r-secret mask is absent everywhere.
    let multiply = MultiplyState::new_initiator("a", "b", "c", None, participants);
    assert!(cluster.start(NodeId::new(1), Box::new(multiply)).is_err());
}
