//! The per-node protocol lifecycle manager.

use crate::{
    errors::{ProtocolError, RuntimeError},
    event::{CompletionListener, ProtocolEvent, ProtocolOutcome},
    message::{ProtocolId, ProtocolMessage, ProtocolType},
    runtime::{
        context::{Action, Context},
        Protocol, ResponderBuilder,
    },
    storage::ShareStorage,
    transport::{LocalSink, Transport},
};
use basic_types::NodeId;
use math_lib::PrimeField;
use rustc_hash::FxHashMap;
use std::{cell::RefCell, collections::VecDeque, rc::Rc};
use uuid::Uuid;

struct ActiveProtocol {
    instance: Box<dyn Protocol>,
    parent: Option<ProtocolId>,
    listener: Option<CompletionListener>,
}

/// Options for starting a protocol.
#[derive(Default)]
pub struct StartOptions {
    protocol_id: Option<ProtocolId>,
    listener: Option<CompletionListener>,
}

impl StartOptions {
    /// Start under a fresh random protocol id with no listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start under an explicit protocol id, as the barrier and huddle do with their
    /// name-derived common ids.
    pub fn with_protocol_id(mut self, id: ProtocolId) -> Self {
        self.protocol_id = Some(id);
        self
    }

    /// Attach a completion listener.
    pub fn with_listener(mut self, listener: CompletionListener) -> Self {
        self.listener = Some(listener);
        self
    }
}

/// Routes messages to protocol instances and manages their lifecycle on one node.
pub struct ProtocolManager {
    node_id: NodeId,
    field: PrimeField,
    transport: Rc<dyn Transport>,
    storage: ShareStorage,
    active: FxHashMap<ProtocolId, ActiveProtocol>,
    responders: FxHashMap<ProtocolType, ResponderBuilder>,
    loopback: LocalSink,
    pending: VecDeque<(ProtocolId, Action)>,
}

impl ProtocolManager {
    /// Construct a manager bound to the given transport.
    ///
    /// Binding installs the local sink, so from here on any self-addressed send lands back in
    /// this manager.
    pub fn new(node_id: NodeId, field: PrimeField, transport: Rc<dyn Transport>) -> Self {
        let loopback: LocalSink = Rc::new(RefCell::new(VecDeque::new()));
        transport.install_local_sink(loopback.clone());
        Self {
            node_id,
            field,
            transport,
            storage: ShareStorage::new(),
            active: FxHashMap::default(),
            responders: FxHashMap::default(),
            loopback,
            pending: VecDeque::new(),
        }
    }

    /// This node's id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The field this node computes in.
    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    /// The node's share storage.
    pub fn storage(&self) -> &ShareStorage {
        &self.storage
    }

    /// Mutable access to the node's share storage, for out-of-band installation such as the
    /// dealer's pre-distributed material.
    pub fn storage_mut(&mut self) -> &mut ShareStorage {
        &mut self.storage
    }

    /// Register the responder factory for a protocol type.
    ///
    /// Registration is idempotent: a second registration for the same type is a no-op, so
    /// meta-protocols can register their dependencies transitively without coordination.
    pub fn register_responder(&mut self, protocol_type: ProtocolType, builder: ResponderBuilder) {
        self.responders.entry(protocol_type).or_insert(builder);
    }

    /// Whether a protocol id is currently active.
    pub fn is_active(&self, id: &ProtocolId) -> bool {
        self.active.contains_key(id)
    }

    /// The number of active protocol instances.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Start a protocol instance.
    ///
    /// The instance is inserted into the active map *before* its initialization runs, so any
    /// self-addressed message it synthesizes finds it; those messages are also processed before
    /// this call returns. If an explicit id is already active — a responder spawned passively by
    /// an early peer message — the existing instance is activated instead and `instance` is
    /// dropped.
    pub fn start_protocol(
        &mut self,
        instance: Box<dyn Protocol>,
        options: StartOptions,
    ) -> Result<ProtocolId, RuntimeError> {
        let id = options.protocol_id.unwrap_or_else(Uuid::new_v4);
        if let Some(entry) = self.active.get_mut(&id) {
            tracing::debug!(protocol_id = %id, "activating passively spawned instance");
            if let Some(listener) = options.listener {
                entry.listener = Some(listener);
            }
            self.call_instance(id, |existing, ctx| existing.activate(ctx, instance))?;
        } else {
            tracing::debug!(
                protocol_id = %id,
                protocol_type = %instance.protocol_type(),
                "starting protocol"
            );
            self.active
                .insert(id, ActiveProtocol { instance, parent: None, listener: options.listener });
            self.call_instance(id, |instance, ctx| instance.initialize(ctx))?;
        }
        self.settle(id)?;
        self.run_scheduled()?;
        Ok(id)
    }

    /// Handle one message arriving from the fabric.
    ///
    /// Unknown protocol ids spawn a responder through the factory registered for the message's
    /// type, unless the message is completion-flagged, in which case it is a stale ACK for an
    /// evicted instance and is dropped silently.
    pub fn handle_incoming_message(
        &mut self,
        mut message: ProtocolMessage,
        sender: NodeId,
    ) -> Result<(), RuntimeError> {
        message.sender = sender;
        self.deliver(message)?;
        self.run_scheduled()
    }

    /// Remove a protocol instance, returning whether it existed.
    pub fn remove_protocol(&mut self, id: &ProtocolId) -> bool {
        self.active.remove(id).is_some()
    }

    /// Evict every instance that already reports complete.
    pub fn clear_completed_protocols(&mut self) {
        self.active.retain(|_, entry| !entry.instance.is_complete());
    }

    /// Evict every instance, stalled ones included.
    pub fn clear_all_protocols(&mut self) {
        self.active.clear();
    }

    fn deliver(&mut self, message: ProtocolMessage) -> Result<(), RuntimeError> {
        let id = message.protocol_id;
        if !self.active.contains_key(&id) {
            if message.is_completion {
                tracing::debug!(
                    protocol_id = %id,
                    payload = message.payload.label(),
                    "dropping stale completion message"
                );
                return Ok(());
            }
            let builder = self
                .responders
                .get(&message.protocol_type)
                .copied()
                .ok_or(RuntimeError::UnknownProtocolType(message.protocol_type))?;
            let instance = builder(&message).map_err(|source| RuntimeError::ProtocolFailed {
                id,
                protocol_type: message.protocol_type,
                source,
            })?;
            tracing::debug!(
                protocol_id = %id,
                protocol_type = %message.protocol_type,
                "spawning responder"
            );
            self.active.insert(id, ActiveProtocol { instance, parent: None, listener: None });
            self.call_instance(id, |instance, ctx| instance.initialize(ctx))?;
        }
        if self.active.contains_key(&id) {
            self.call_instance(id, |instance, ctx| instance.handle_message(ctx, message))?;
            self.settle(id)?;
        }
        Ok(())
    }

    // Applies queued sub-protocol starts and drains the loopback sink until both are empty.
    fn run_scheduled(&mut self) -> Result<(), RuntimeError> {
        loop {
            if let Some((parent, action)) = self.pending.pop_front() {
                match action {
                    Action::Start { id, instance } => {
                        tracing::debug!(
                            protocol_id = %id,
                            protocol_type = %instance.protocol_type(),
                            parent = %parent,
                            "starting sub-protocol"
                        );
                        self.active.insert(
                            id,
                            ActiveProtocol { instance, parent: Some(parent), listener: None },
                        );
                        self.call_instance(id, |instance, ctx| instance.initialize(ctx))?;
                        self.settle(id)?;
                    }
                }
                continue;
            }
            let next = self.loopback.borrow_mut().pop_front();
            match next {
                Some(message) => self.deliver(message)?,
                None => return Ok(()),
            }
        }
    }

    // Runs one call on an instance, collecting the work it queues. On failure the instance is
    // evicted and the error is wrapped with its identity.
    fn call_instance<F>(&mut self, id: ProtocolId, call: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(&mut dyn Protocol, &mut Context<'_>) -> Result<(), ProtocolError>,
    {
        let Some(entry) = self.active.get_mut(&id) else {
            return Ok(());
        };
        let protocol_type = entry.instance.protocol_type();
        let mut actions = Vec::new();
        let mut ctx = Context {
            node_id: self.node_id,
            protocol_id: id,
            protocol_type,
            field: self.field,
            transport: self.transport.as_ref(),
            storage: &mut self.storage,
            actions: &mut actions,
        };
        let result = call(entry.instance.as_mut(), &mut ctx);
        match result {
            Ok(()) => {
                self.pending.extend(actions.into_iter().map(|action| (id, action)));
                Ok(())
            }
            Err(source) => Err(self.fail(id, protocol_type, source)),
        }
    }

    // Evicts a failed instance, notifies its listener and reports type, id and cause.
    fn fail(
        &mut self,
        id: ProtocolId,
        protocol_type: ProtocolType,
        source: ProtocolError,
    ) -> RuntimeError {
        if let Some(mut entry) = self.active.remove(&id) {
            if let Some(listener) = entry.listener.as_mut() {
                let event = ProtocolEvent {
                    protocol_id: id,
                    protocol_type,
                    outcome: ProtocolOutcome::Failed { error: source.to_string() },
                };
                listener(&event);
            }
        }
        tracing::debug!(protocol_id = %id, protocol_type = %protocol_type, error = %source, "protocol failed");
        RuntimeError::ProtocolFailed { id, protocol_type, source }
    }

    // Evicts a complete instance and routes its completion event to its listener and parent.
    fn settle(&mut self, id: ProtocolId) -> Result<(), RuntimeError> {
        let complete = match self.active.get(&id) {
            Some(entry) => entry.instance.is_complete(),
            None => false,
        };
        if !complete {
            return Ok(());
        }
        let Some(mut entry) = self.active.remove(&id) else {
            return Ok(());
        };
        let event = ProtocolEvent {
            protocol_id: id,
            protocol_type: entry.instance.protocol_type(),
            outcome: entry.instance.take_outcome(),
        };
        tracing::debug!(protocol_id = %id, protocol_type = %event.protocol_type, "protocol complete");
        if let Some(listener) = entry.listener.as_mut() {
            listener(&event);
        }
        if let Some(parent) = entry.parent {
            if self.active.contains_key(&parent) {
                self.call_instance(parent, |instance, ctx| instance.handle_completion(ctx, &event))?;
                self.settle(parent)?;
            }
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::ProtocolOutcome,
        message::Payload,
        runtime::Context,
        transport::LocalSink,
    };
    use shamir_sharing::Share;
    use std::cell::RefCell;

    // A transport for a network of one: self-sends loop back, everything else vanishes.
    struct LoneTransport {
        local: NodeId,
        sink: RefCell<Option<LocalSink>>,
    }

    impl Transport for LoneTransport {
        fn local_id(&self) -> NodeId {
            self.local
        }

        fn send(&self, message: ProtocolMessage, recipient: NodeId) {
            if recipient == self.local {
                if let Some(sink) = self.sink.borrow().as_ref() {
                    sink.borrow_mut().push_back(message);
                }
            }
        }

        fn neighbors(&self) -> Vec<NodeId> {
            Vec::new()
        }

        fn participants(&self) -> Vec<NodeId> {
            vec![self.local]
        }

        fn install_local_sink(&self, sink: LocalSink) {
            *self.sink.borrow_mut() = Some(sink);
        }
    }

    fn manager() -> ProtocolManager {
        let local = NodeId::new(1);
        let transport = Rc::new(LoneTransport { local, sink: RefCell::new(None) });
        let field = PrimeField::new(2147483647).unwrap();
        ProtocolManager::new(local, field, transport)
    }

    fn signal_message(id: ProtocolId) -> ProtocolMessage {
        ProtocolMessage::new(
            id,
            ProtocolType::Barrier,
            NodeId::new(2),
            Payload::BarrierSignal { name: "probe".into() },
        )
    }

    // Stores a marker share during initialization and finishes on the first message.
    struct Marker {
        id: &'static str,
        done: bool,
    }

    impl Protocol for Marker {
        fn protocol_type(&self) -> ProtocolType {
            ProtocolType::Barrier
        }

        fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
            ctx.store(self.id, Share::constant(ctx.node_id(), 1), None);
            Ok(())
        }

        fn handle_message(
            &mut self,
            _ctx: &mut Context<'_>,
            _message: ProtocolMessage,
        ) -> Result<(), ProtocolError> {
            self.done = true;
            Ok(())
        }

        fn is_complete(&self) -> bool {
            self.done
        }

        fn take_outcome(&mut self) -> ProtocolOutcome {
            ProtocolOutcome::Synchronized
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    }

    fn build_first(_: &ProtocolMessage) -> Result<Box<dyn Protocol>, ProtocolError> {
        Ok(Box::new(Marker { id: "first", done: false }))
    }

    fn build_second(_: &ProtocolMessage) -> Result<Box<dyn Protocol>, ProtocolError> {
        Ok(Box::new(Marker { id: "second", done: false }))
    }

    // Sends itself a message during initialization and completes when it comes back.
    struct SelfPing {
        outcome: Option<ProtocolOutcome>,
    }

    impl Protocol for SelfPing {
        fn protocol_type(&self) -> ProtocolType {
            ProtocolType::Barrier
        }

        fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
            ctx.unicast(ctx.node_id(), Payload::BarrierSignal { name: "ping".into() });
            Ok(())
        }

        fn handle_message(
            &mut self,
            _ctx: &mut Context<'_>,
            _message: ProtocolMessage,
        ) -> Result<(), ProtocolError> {
            self.outcome = Some(ProtocolOutcome::Synchronized);
            Ok(())
        }

        fn is_complete(&self) -> bool {
            self.outcome.is_some()
        }

        fn take_outcome(&mut self) -> ProtocolOutcome {
            self.outcome.take().unwrap()
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    }

    struct Idle;

    impl Protocol for Idle {
        fn protocol_type(&self) -> ProtocolType {
            ProtocolType::Barrier
        }

        fn initialize(&mut self, _ctx: &mut Context<'_>) -> Result<(), ProtocolError> {
            Ok(())
        }

        fn handle_message(
            &mut self,
            _ctx: &mut Context<'_>,
            _message: ProtocolMessage,
        ) -> Result<(), ProtocolError> {
            Ok(())
        }

        fn is_complete(&self) -> bool {
            false
        }

        fn take_outcome(&mut self) -> ProtocolOutcome {
            ProtocolOutcome::Synchronized
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    }

    #[test]
    fn responder_registration_is_idempotent() {
        let mut manager = manager();
        manager.register_responder(ProtocolType::Barrier, build_first);
        manager.register_responder(ProtocolType::Barrier, build_second);

        manager.handle_incoming_message(signal_message(Uuid::new_v4()), NodeId::new(2)).unwrap();
        assert!(manager.storage().get("first").is_some());
        assert!(manager.storage().get("second").is_none());
    }

    #[test]
    fn stale_completion_messages_are_dropped_silently() {
        let mut manager = manager();
        manager.register_responder(ProtocolType::Barrier, build_first);

        let mut stale = signal_message(Uuid::new_v4());
        stale.is_completion = true;
        manager.handle_incoming_message(stale, NodeId::new(2)).unwrap();
        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.storage().count(), 0);
    }

    #[test]
    fn unknown_protocol_types_are_an_error() {
        let mut manager = manager();
        let error =
            manager.handle_incoming_message(signal_message(Uuid::new_v4()), NodeId::new(2));
        assert!(matches!(error, Err(RuntimeError::UnknownProtocolType(ProtocolType::Barrier))));
    }

    #[test]
    fn self_messages_are_processed_before_start_returns() {
        let mut manager = manager();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = fired.clone();
        let options = StartOptions::new()
            .with_listener(Box::new(move |event| sink.borrow_mut().push(event.outcome.clone())));

        manager.start_protocol(Box::new(SelfPing { outcome: None }), options).unwrap();
        assert_eq!(manager.active_count(), 0);
        assert_eq!(fired.borrow().as_slice(), &[ProtocolOutcome::Synchronized]);
    }

    #[test]
    fn maintenance_calls_evict_instances() {
        let mut manager = manager();
        let id = manager.start_protocol(Box::new(Idle), StartOptions::new()).unwrap();
        assert_eq!(manager.active_count(), 1);
        assert!(manager.is_active(&id));

        assert!(manager.remove_protocol(&id));
        assert!(!manager.remove_protocol(&id));

        manager.start_protocol(Box::new(Idle), StartOptions::new()).unwrap();
        manager.clear_completed_protocols();
        assert_eq!(manager.active_count(), 1);
        manager.clear_all_protocols();
        assert_eq!(manager.active_count(), 0);
    }
}
