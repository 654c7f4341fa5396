//! End-to-end tests for the distribution protocols.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    distribution::{ShareDistributionState, VectorShareDistributionState},
    event::ProtocolOutcome,
    simulator::Cluster,
    storage::{component_id, Lifetime},
};
use basic_types::NodeId;
use math_lib::PrimeField;

const PRIME: u64 = 2147483647;

fn cluster(size: u32) -> Cluster {
    Cluster::new(size, PrimeField::new(PRIME).unwrap())
}

#[test]
fn scalar_distribution_completes_within_the_start_call() {
    let mut cluster = cluster(10);
    let participants = cluster.participants();
    let initiator = NodeId::new(1);

    let instance =
        ShareDistributionState::new_initiator("secret-a", 12345, 5, None, participants);
    cluster.start(initiator, Box::new(instance)).unwrap();

    // Fire-and-forget: the initiator's listener fires before any network round runs.
    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].outcome,
        ProtocolOutcome::SharesStored { secret_id: "secret-a".into() }
    );

    cluster.run_to_completion(100).unwrap();
    for node in cluster.participants() {
        let share = cluster.storage(node).unwrap().get("secret-a").expect("share missing");
        assert_eq!(share.index(), node);
    }
    assert_eq!(cluster.reveal("secret-a").unwrap(), 12345);
}

#[test]
fn scalar_distribution_respects_the_storage_tag() {
    let mut cluster = cluster(4);
    let participants = cluster.participants();

    let tagged = ShareDistributionState::new_initiator(
        "tagged",
        7,
        2,
        Some("round-1".into()),
        participants.clone(),
    );
    let sticky = ShareDistributionState::new_initiator("sticky", 8, 2, None, participants);
    cluster.start(NodeId::new(1), Box::new(tagged)).unwrap();
    cluster.start(NodeId::new(1), Box::new(sticky)).unwrap();
    cluster.run_to_completion(100).unwrap();

    let storage = cluster.storage(NodeId::new(2)).unwrap();
    assert_eq!(
        storage.get_info("tagged").unwrap().lifetime,
        Lifetime::Tagged("round-1".into())
    );
    assert_eq!(storage.get_info("sticky").unwrap().lifetime, Lifetime::Sticky);
}

#[test]
fn scalar_distribution_rejects_a_bad_threshold() {
    let mut cluster = cluster(3);
    let participants = cluster.participants();
    let instance = ShareDistributionState::new_initiator("bad", 1, 4, None, participants);
    assert!(cluster.start(NodeId::new(1), Box::new(instance)).is_err());
}

#[test]
fn vector_distribution_waits_for_every_ack() {
    let mut cluster = cluster(5);
    let participants = cluster.participants();
    let initiator = NodeId::new(2);

    let instance = VectorShareDistributionState::new_initiator(
        "arr",
        vec![17, 3, 11, 3, 9],
        2,
        Some("scan".into()),
        participants,
    );
    cluster.start(initiator, Box::new(instance)).unwrap();

    // Unlike the scalar form, nothing completes until the ACKs travel.
    assert!(cluster.events(initiator).unwrap().is_empty());
    cluster.run_to_completion(100).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].outcome,
        ProtocolOutcome::VectorStored { base_id: "arr".into(), length: 5 }
    );
    for (index, expected) in [17u64, 3, 11, 3, 9].into_iter().enumerate() {
        assert_eq!(cluster.reveal(&component_id("arr", index)).unwrap(), expected);
    }
}

#[test]
fn vector_distribution_rejects_an_empty_vector() {
    let mut cluster = cluster(3);
    let participants = cluster.participants();
    let instance =
        VectorShareDistributionState::new_initiator("empty", Vec::new(), 2, None, participants);
    assert!(cluster.start(NodeId::new(1), Box::new(instance)).is_err());
}
