//! The infrastructure handed to a protocol instance for the duration of one call.

use crate::{
    errors::ProtocolError,
    message::{Payload, ProtocolId, ProtocolMessage, ProtocolType},
    runtime::Protocol,
    storage::{Lifetime, ShareStorage},
    transport::Transport,
};
use basic_types::NodeId;
use math_lib::PrimeField;
use shamir_sharing::Share;
use uuid::Uuid;

/// Work a protocol instance queued for the manager to apply after the current call returns.
pub(crate) enum Action {
    /// Start a sub-protocol under the given id, parented to the emitting instance.
    Start {
        /// The pre-assigned id of the sub-protocol.
        id: ProtocolId,
        /// The initiator instance to register.
        instance: Box<dyn Protocol>,
    },
}

/// Everything a protocol instance may touch while handling a call: the node's identity and
/// field, the transport, the share storage, and a queue for starting sub-protocols.
pub struct Context<'a> {
    pub(crate) node_id: NodeId,
    pub(crate) protocol_id: ProtocolId,
    pub(crate) protocol_type: ProtocolType,
    pub(crate) field: PrimeField,
    pub(crate) transport: &'a dyn Transport,
    pub(crate) storage: &'a mut ShareStorage,
    pub(crate) actions: &'a mut Vec<Action>,
}

impl<'a> Context<'a> {
    /// This node's id, which is also the index of every share it stores.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The id of the instance being called.
    pub fn protocol_id(&self) -> ProtocolId {
        self.protocol_id
    }

    /// The field every share lives in.
    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    /// The full participant set known to the transport.
    pub fn network_participants(&self) -> Vec<NodeId> {
        self.transport.participants()
    }

    /// The node's share storage.
    pub fn storage(&mut self) -> &mut ShareStorage {
        self.storage
    }

    /// Fetch a copy of a stored share, failing with the fatal
    /// [MissingShare][ProtocolError::MissingShare] if it is absent.
    pub fn share(&self, id: &str) -> Result<Share, ProtocolError> {
        self.storage.get(id).cloned().ok_or_else(|| ProtocolError::MissingShare(id.into()))
    }

    /// Store a share under the given id.
    pub fn store(&mut self, id: impl Into<String>, share: Share, lifetime: Option<Lifetime>) {
        self.storage.put(id, share, lifetime);
    }

    /// Send a payload to a single node under this instance's id.
    pub fn unicast(&self, recipient: NodeId, payload: Payload) {
        self.transport.send(self.message(payload, false), recipient);
    }

    /// Send a completion-flagged payload to a single node under this instance's id.
    pub fn unicast_completion(&self, recipient: NodeId, payload: Payload) {
        self.transport.send(self.message(payload, true), recipient);
    }

    /// Send a payload to each of the given nodes under this instance's id.
    pub fn multicast(&self, recipients: &[NodeId], payload: Payload) {
        self.transport.multicast(self.message(payload, false), recipients);
    }

    /// Queue a sub-protocol start, returning the id it will run under.
    ///
    /// The manager registers and initializes the instance after the current call returns, with
    /// this instance recorded as its parent: the sub-protocol's completion event comes back
    /// through [Protocol::handle_completion].
    pub fn start_subprotocol(&mut self, instance: Box<dyn Protocol>) -> ProtocolId {
        let id = Uuid::new_v4();
        self.actions.push(Action::Start { id, instance });
        id
    }

    fn message(&self, payload: Payload, is_completion: bool) -> ProtocolMessage {
        ProtocolMessage {
            protocol_id: self.protocol_id,
            protocol_type: self.protocol_type,
            sender: self.node_id,
            is_completion,
            payload,
        }
    }
}
