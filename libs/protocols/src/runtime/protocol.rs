//! The contract between the runtime and a protocol instance.

use crate::{
    errors::ProtocolError,
    event::{ProtocolEvent, ProtocolOutcome},
    message::{ProtocolMessage, ProtocolType},
    runtime::Context,
};

/// One protocol instance: either an initiator built by the caller or a responder built on
/// demand from the first message that mentions an unknown protocol id.
///
/// Both roles are variants of the same state machine, selected by construction path, and both
/// react to the same message types over the same storage and transport. Instances never call
/// back into the runtime; they send through the [Context] and return, and anything else they
/// want started is queued on the context and applied by the manager afterwards.
pub trait Protocol {
    /// The protocol type of this instance.
    fn protocol_type(&self) -> ProtocolType;

    /// Called once right after the instance is registered in the active map.
    ///
    /// Registration happens first so a self-addressed message synthesized here finds its own
    /// instance when the runtime drains the local sink.
    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<(), ProtocolError>;

    /// Called when `start_protocol` targets a protocol id that is already active.
    ///
    /// Only protocols whose instances can be spawned passively by an early peer message (the
    /// barrier and the huddle) support this; everything else treats it as a configuration
    /// error. `starter` is the instance the caller tried to start: a passive responder that
    /// has been counting peer messages absorbs the caller-side state it was built without
    /// (downcast through [into_any][Protocol::into_any]).
    fn activate(
        &mut self,
        ctx: &mut Context<'_>,
        starter: Box<dyn Protocol>,
    ) -> Result<(), ProtocolError> {
        let _ = (ctx, starter);
        Err(ProtocolError::InvalidConfiguration("protocol id is already active".into()))
    }

    /// Convert into [Any][std::any::Any], which is what lets an activation hand the starter's
    /// typed state to the instance that was spawned passively.
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any>;

    /// Handle one inbound message.
    fn handle_message(
        &mut self,
        ctx: &mut Context<'_>,
        message: ProtocolMessage,
    ) -> Result<(), ProtocolError>;

    /// Handle the completion of a sub-protocol this instance started.
    fn handle_completion(
        &mut self,
        ctx: &mut Context<'_>,
        event: &ProtocolEvent,
    ) -> Result<(), ProtocolError> {
        let _ = (ctx, event);
        Ok(())
    }

    /// Whether this instance has finished. Checked by the manager after every call; complete
    /// instances are evicted from the active map.
    fn is_complete(&self) -> bool;

    /// Consume the outcome of a complete instance. Called exactly once, after
    /// [is_complete][Protocol::is_complete] turns true.
    fn take_outcome(&mut self) -> ProtocolOutcome;
}

/// Builds a responder instance from the first message addressed to an unknown protocol id.
///
/// Each protocol registers its own builder, which lets a meta-protocol pull in everything it
/// depends on without the runtime knowing any protocol-specific types. The message's payload
/// carries whatever initialization parameters the responder needs.
pub type ResponderBuilder = fn(&ProtocolMessage) -> Result<Box<dyn Protocol>, ProtocolError>;
