//! In-process protocol cluster for end-to-end tests.
//!
//! This is not a network: it is a router that moves each round's outbound messages into the
//! target node's runtime, preserving per sender-receiver FIFO order, until no messages remain
//! in flight. A round cap turns a stalled protocol into a test failure instead of a hang. Every
//! node is a full single-threaded runtime with its own storage, so the protocols under test run
//! exactly the code a real deployment would.

use crate::{
    barrier, comparison, distribution, dot_product, extremum, huddle, linear, minimum,
    multiplication, reconstruct,
    event::ProtocolEvent,
    message::{ProtocolMessage, SecretId},
    runtime::{Protocol, ProtocolManager, StartOptions},
    setup::Dealer,
    storage::{Lifetime, ShareStorage},
    transport::{LocalSink, Transport},
};
use anyhow::{anyhow, bail, Result};
use basic_types::NodeId;
use itertools::Itertools;
use math_lib::PrimeField;
use rand::Rng;
use shamir_sharing::{reconstruct as reconstruct_shares, Share};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

/// Register every responder factory in the catalogue.
pub fn register_catalogue(manager: &mut ProtocolManager) {
    distribution::register(manager);
    reconstruct::register(manager);
    linear::register(manager);
    multiplication::register(manager);
    barrier::register(manager);
    huddle::register(manager);
    comparison::register(manager);
    minimum::register(manager);
    dot_product::register(manager);
    extremum::register(manager);
}

/// The simulated fabric endpoint of one node.
pub struct SimEndpoint {
    local: NodeId,
    neighbors: Vec<NodeId>,
    participants: Vec<NodeId>,
    sink: RefCell<Option<LocalSink>>,
    outbox: RefCell<VecDeque<(NodeId, ProtocolMessage)>>,
}

impl SimEndpoint {
    fn new(local: NodeId, all: &[NodeId]) -> Self {
        let neighbors = all.iter().copied().filter(|node| *node != local).collect_vec();
        Self {
            local,
            neighbors,
            participants: all.to_vec(),
            sink: RefCell::new(None),
            outbox: RefCell::new(VecDeque::new()),
        }
    }

    fn drain_outbox(&self) -> Vec<(NodeId, ProtocolMessage)> {
        self.outbox.borrow_mut().drain(..).collect()
    }
}

impl Transport for SimEndpoint {
    fn local_id(&self) -> NodeId {
        self.local
    }

    fn send(&self, message: ProtocolMessage, recipient: NodeId) {
        if recipient == self.local {
            if let Some(sink) = self.sink.borrow().as_ref() {
                sink.borrow_mut().push_back(message);
                return;
            }
        }
        self.outbox.borrow_mut().push_back((recipient, message));
    }

    fn neighbors(&self) -> Vec<NodeId> {
        self.neighbors.clone()
    }

    fn participants(&self) -> Vec<NodeId> {
        self.participants.clone()
    }

    fn install_local_sink(&self, sink: LocalSink) {
        *self.sink.borrow_mut() = Some(sink);
    }
}

struct SimNode {
    manager: ProtocolManager,
    endpoint: Rc<SimEndpoint>,
    events: Rc<RefCell<Vec<ProtocolEvent>>>,
}

/// A cluster of in-process nodes sharing one simulated fabric.
pub struct Cluster {
    field: PrimeField,
    nodes: Vec<SimNode>,
}

impl Cluster {
    /// Build a cluster of `size` nodes with ids `1..=size`, every responder factory
    /// registered.
    pub fn new(size: u32, field: PrimeField) -> Self {
        let all = (1..=size).map(NodeId::new).collect_vec();
        let nodes = all
            .iter()
            .map(|node| {
                let endpoint = Rc::new(SimEndpoint::new(*node, &all));
                let mut manager =
                    ProtocolManager::new(*node, field, endpoint.clone() as Rc<dyn Transport>);
                register_catalogue(&mut manager);
                SimNode { manager, endpoint, events: Rc::new(RefCell::new(Vec::new())) }
            })
            .collect();
        Self { field, nodes }
    }

    /// The field the cluster computes in.
    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    /// Every node id in the cluster.
    pub fn participants(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.manager.node_id()).collect()
    }

    fn node(&self, id: NodeId) -> Result<&SimNode> {
        self.nodes
            .iter()
            .find(|node| node.manager.node_id() == id)
            .ok_or_else(|| anyhow!("node {id} is not part of the cluster"))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SimNode> {
        self.nodes
            .iter_mut()
            .find(|node| node.manager.node_id() == id)
            .ok_or_else(|| anyhow!("node {id} is not part of the cluster"))
    }

    /// The runtime of one node.
    pub fn manager_mut(&mut self, id: NodeId) -> Result<&mut ProtocolManager> {
        Ok(&mut self.node_mut(id)?.manager)
    }

    /// The share storage of one node.
    pub fn storage(&self, id: NodeId) -> Result<&ShareStorage> {
        Ok(self.node(id)?.manager.storage())
    }

    /// The completion events one node observed for the protocols started through
    /// [start][Cluster::start].
    pub fn events(&self, id: NodeId) -> Result<Vec<ProtocolEvent>> {
        Ok(self.node(id)?.events.borrow().clone())
    }

    /// Install the dealer's sticky preprocessing material on every node.
    pub fn install_preprocessing<R: Rng + ?Sized>(
        &mut self,
        threshold: u32,
        rng: &mut R,
    ) -> Result<()> {
        let dealer = Dealer::new(self.field, threshold, &self.participants())?;
        for (node, bundle) in dealer.preprocess(rng)? {
            let storage = self.manager_mut(node)?.storage_mut();
            for (id, share) in bundle {
                storage.put(id, share, Some(Lifetime::Sticky));
            }
        }
        Ok(())
    }

    /// Install one share on one node out of band.
    pub fn install_share(
        &mut self,
        node: NodeId,
        id: impl Into<SecretId>,
        share: Share,
        lifetime: Option<Lifetime>,
    ) -> Result<()> {
        self.manager_mut(node)?.storage_mut().put(id, share, lifetime);
        Ok(())
    }

    /// Start a protocol on one node with an event-recording listener attached.
    pub fn start(&mut self, node: NodeId, instance: Box<dyn Protocol>) -> Result<uuid::Uuid> {
        self.start_with_options(node, instance, StartOptions::new())
    }

    /// Start a protocol under an explicit id, as barrier and huddle participants do.
    pub fn start_with_id(
        &mut self,
        node: NodeId,
        instance: Box<dyn Protocol>,
        id: uuid::Uuid,
    ) -> Result<uuid::Uuid> {
        self.start_with_options(node, instance, StartOptions::new().with_protocol_id(id))
    }

    fn start_with_options(
        &mut self,
        node: NodeId,
        instance: Box<dyn Protocol>,
        options: StartOptions,
    ) -> Result<uuid::Uuid> {
        let sim_node = self.node_mut(node)?;
        let events = sim_node.events.clone();
        let options =
            options.with_listener(Box::new(move |event| events.borrow_mut().push(event.clone())));
        Ok(sim_node.manager.start_protocol(instance, options)?)
    }

    /// Route in-flight messages until the fabric is quiet.
    ///
    /// Each round drains every node's outbox and delivers in order, which preserves the per
    /// sender-receiver FIFO guarantee protocols rely on. Exceeding `max_rounds` means some
    /// protocol is stalled.
    pub fn run_to_completion(&mut self, max_rounds: usize) -> Result<()> {
        for _ in 0..max_rounds {
            let mut in_flight = Vec::new();
            for node in &self.nodes {
                let sender = node.manager.node_id();
                for (recipient, message) in node.endpoint.drain_outbox() {
                    in_flight.push((sender, recipient, message));
                }
            }
            if in_flight.is_empty() {
                return Ok(());
            }
            for (sender, recipient, message) in in_flight {
                self.node_mut(recipient)?.manager.handle_incoming_message(message, sender)?;
            }
        }
        bail!("fabric still busy after {max_rounds} rounds");
    }

    /// Gather every node's share of a secret and reconstruct it, for assertions.
    pub fn reveal(&self, secret_id: &str) -> Result<u64> {
        let shares = self
            .nodes
            .iter()
            .map(|node| {
                node.manager
                    .storage()
                    .get(secret_id)
                    .cloned()
                    .ok_or_else(|| anyhow!("node {} has no share of {secret_id}", node.manager.node_id()))
            })
            .collect::<Result<Vec<_>>>()?;
        let required = shares.len() as u32;
        Ok(reconstruct_shares(&self.field, &shares, required)?)
    }
}
