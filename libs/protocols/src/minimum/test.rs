//! End-to-end tests for the secure minimum.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    distribution::ShareDistributionState,
    event::ProtocolOutcome,
    minimum::MinState,
    simulator::Cluster,
};
use basic_types::NodeId;
use math_lib::PrimeField;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rstest::rstest;

const PRIME: u64 = 8191;

#[rstest]
#[case(17, 3, 3)]
#[case(3, 17, 3)]
#[case(7, 7, 7)]
#[case(0, 4095, 0)]
fn minimum_matches_the_plaintext(#[case] left: u64, #[case] right: u64, #[case] expected: u64) {
    let mut cluster = Cluster::new(5, PrimeField::new(PRIME).unwrap());
    let mut rng = ChaCha20Rng::seed_from_u64(left ^ (right << 16));
    cluster.install_preprocessing(2, &mut rng).unwrap();
    let participants = cluster.participants();
    for (id, value) in [("l", left), ("r", right)] {
        let distribute =
            ShareDistributionState::new_initiator(id, value, 2, None, participants.clone());
        cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    }
    cluster.run_to_completion(100).unwrap();

    let initiator = NodeId::new(3);
    let min = MinState::new_initiator("l", "r", "min", Some("min".into()), participants);
    cluster.start(initiator, Box::new(min)).unwrap();
    cluster.run_to_completion(10_000).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, ProtocolOutcome::SharesStored { secret_id: "min".into() });
    assert_eq!(cluster.reveal("min").unwrap(), expected);
}
