//! End-to-end tests for the linear protocols.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    distribution::ShareDistributionState,
    event::ProtocolOutcome,
    linear::LinearState,
    simulator::Cluster,
};
use basic_types::NodeId;
use math_lib::PrimeField;
use rstest::rstest;

const PRIME: u64 = 2147483647;

fn cluster_with_secrets(pairs: &[(&str, u64)]) -> Cluster {
    let mut cluster = Cluster::new(10, PrimeField::new(PRIME).unwrap());
    let participants = cluster.participants();
    for (id, value) in pairs {
        let distribute = ShareDistributionState::new_initiator(
            *id,
            *value,
            5,
            None,
            participants.clone(),
        );
        cluster.start(NodeId::new(1), Box::new(distribute)).unwrap();
    }
    cluster.run_to_completion(100).unwrap();
    cluster
}

#[test]
fn secure_add_matches_the_plaintext_sum() {
    let mut cluster = cluster_with_secrets(&[("a", 12345), ("b", 67890)]);
    let participants = cluster.participants();
    let initiator = NodeId::new(1);

    let add = LinearState::add("a", "b", "c", Some("round-1".into()), participants);
    cluster.start(initiator, Box::new(add)).unwrap();
    cluster.run_to_completion(100).unwrap();

    let events = cluster.events(initiator).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, ProtocolOutcome::SharesStored { secret_id: "c".into() });
    assert_eq!(cluster.reveal("c").unwrap(), 80235);
}

#[test]
fn secure_sub_wraps_in_the_field() {
    let mut cluster = cluster_with_secrets(&[("a", 5), ("b", 12)]);
    let participants = cluster.participants();

    let sub = LinearState::sub("a", "b", "c", None, participants);
    cluster.start(NodeId::new(4), Box::new(sub)).unwrap();
    cluster.run_to_completion(100).unwrap();

    assert_eq!(cluster.reveal("c").unwrap(), PRIME - 7);
}

#[rstest]
#[case(true, 100, 58)]
#[case(false, 100, PRIME - 58)]
fn known_sub_obeys_the_direction_flag(
    #[case] known_is_left: bool,
    #[case] known: u64,
    #[case] expected: u64,
) {
    let mut cluster = cluster_with_secrets(&[("s", 42)]);
    let participants = cluster.participants();

    let sub = LinearState::known_sub(known, "s", known_is_left, "out", None, participants);
    cluster.start(NodeId::new(2), Box::new(sub)).unwrap();
    cluster.run_to_completion(100).unwrap();

    assert_eq!(cluster.reveal("out").unwrap(), expected);
}

#[test]
fn linearity_holds_share_by_share() {
    let mut cluster = cluster_with_secrets(&[("a", 1000), ("b", 234)]);
    let participants = cluster.participants();
    let field = *cluster.field();

    let add = LinearState::add("a", "b", "c", None, participants);
    cluster.start(NodeId::new(1), Box::new(add)).unwrap();
    cluster.run_to_completion(100).unwrap();

    // Each node's result share is exactly the field sum of its operand shares.
    for node in cluster.participants() {
        let storage = cluster.storage(node).unwrap();
        let a = storage.get("a").unwrap().value();
        let b = storage.get("b").unwrap().value();
        let c = storage.get("c").unwrap().value();
        assert_eq!(c, field.add(a, b));
    }
}

#[test]
fn missing_operand_is_fatal() {
    let mut cluster = cluster_with_secrets(&[("a", 1)]);
    let participants = cluster.participants();
    let add = LinearState::add("a", "nope", "c", None, participants);
    assert!(cluster.start(NodeId::new(1), Box::new(add)).is_err());
}
