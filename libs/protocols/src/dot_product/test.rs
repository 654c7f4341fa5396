//! End-to-end tests for the secure dot product.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    distribution::VectorShareDistributionState,
    event::ProtocolOutcome,
    dot_product::DotProductState,
    simulator::Cluster,
};
use basic_types::NodeId;
use math_lib::PrimeField;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const PRIME: u64 = 2147483647;

#[test]
fn dot_product_matches_the_plaintext() {
    let mut cluster = Cluster::new(10, PrimeField::new(PRIME).unwrap());
    let mut rng = ChaCha20Rng::seed_from_u64(0xd07);
    cluster.install_preprocessing(5, &mut rng).unwrap();
    let participants = cluster.participants();
    for (id, values) in [("a", vec![1, 2, 3]), ("b", vec![4, 5, 6])] {
        let distribute = VectorShareDistributionState::new_initiator(
            id,
            values,
            5,
            None,
            participants.clone(),
        );
        cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    }
    cluster.run_to_completion(100).unwrap();

    let initiator = NodeId::new(1);
    let dot = DotProductState::new_initiator("a", "b", 3, "dot", Some("round".into()), participants);
    cluster.start(initiator, Box::new(dot)).unwrap();
    cluster.run_to_completion(1000).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, ProtocolOutcome::SharesStored { secret_id: "dot".into() });
    // 1*4 + 2*5 + 3*6.
    assert_eq!(cluster.reveal("dot").unwrap(), 32);
}

#[test]
fn an_empty_vector_is_rejected() {
    let mut cluster = Cluster::new(3, PrimeField::new(PRIME).unwrap());
    let participants = cluster.participants();
    let dot = DotProductState::new_initiator("a", "b", 0, "dot", None, participants);
    assert!(cluster.start(NodeId::new(1), Box::new(dot)).is_err());
}
