//! The message transport abstraction.

use crate::message::ProtocolMessage;
use basic_types::NodeId;
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

/// The queue a transport parks self-addressed messages on.
///
/// The runtime installs one of these when it binds a transport and drains it before returning
/// from `start_protocol` or `handle_incoming_message`, so a message a protocol sends to its own
/// node travels the exact same code path as a remote one and is still processed within the same
/// call. This uniform send path is what lets every initiator broadcast to the full participant
/// set, itself included.
pub type LocalSink = Rc<RefCell<VecDeque<ProtocolMessage>>>;

/// A framework-agnostic unicast/multicast message fabric.
///
/// Implementations are assumed to deliver reliably and in order per sender-receiver pair,
/// without duplication and without any latency bound.
pub trait Transport {
    /// This node's id.
    fn local_id(&self) -> NodeId;

    /// Send a message to a single node.
    ///
    /// A message addressed to [local_id][Transport::local_id] goes to the installed local sink
    /// instead of the external fabric.
    fn send(&self, message: ProtocolMessage, recipient: NodeId);

    /// Send a message to each of the given nodes.
    fn multicast(&self, message: ProtocolMessage, recipients: &[NodeId]) {
        for recipient in recipients {
            self.send(message.clone(), *recipient);
        }
    }

    /// Send a message to every neighbor.
    fn broadcast(&self, message: ProtocolMessage) {
        self.multicast(message, &self.neighbors());
    }

    /// The reachable node ids, not including this node.
    fn neighbors(&self) -> Vec<NodeId>;

    /// The full participant set: the neighbors plus this node. Implementations should cache
    /// this.
    fn participants(&self) -> Vec<NodeId>;

    /// Install the queue self-addressed messages are parked on.
    fn install_local_sink(&self, sink: LocalSink);
}
