use crate::envelope::{Envelope, Role};
use crate::error::Result;

/// Response computation for one recognized envelope shape.
pub type Handler = Box<dyn Fn(&Envelope) -> Result<Option<Envelope>> + Send + Sync>;

/// An independent unit of behavior that consumes and may produce envelopes.
///
/// Contract: `receive` must append the inbound envelope to the private
/// history *before* computing a response, so receipt is recorded even when
/// the computation fails. The history append is never rolled back.
/// An unrecognized envelope shape is "nothing to do" (`Ok(None)`), not an
/// error; a failing computation propagates to the router unmodified.
pub trait Participant: Send {
    /// Unique name; registration key in the router.
    fn identity(&self) -> &str;

    /// Every envelope this participant has received, in receipt order.
    fn history(&self) -> &[Envelope];

    /// Consume an envelope and optionally produce a response.
    fn receive(&mut self, envelope: &Envelope) -> Result<Option<Envelope>>;
}

/// What an envelope must look like for a handler to fire.
///
/// A closed set of dispatch keys replacing open-ended matching on raw
/// payload shapes: a participant recognizes envelopes by origin role, by
/// payload action, or by sender identity, and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Envelope carries this origin role.
    Role(Role),
    /// Payload carries this `action` field.
    Action(String),
    /// Envelope was produced by this participant.
    Sender(String),
}

impl Trigger {
    fn matches(&self, envelope: &Envelope) -> bool {
        match self {
            Self::Role(role) => envelope.role == *role,
            Self::Action(action) => envelope.action() == Some(action.as_str()),
            Self::Sender(sender) => envelope.sender == *sender,
        }
    }
}

/// A participant driven by an explicit table of triggers and handlers.
///
/// Handlers are registered at construction and checked in registration
/// order; the first matching trigger wins. An envelope matching no trigger
/// produces no response. Any domain data a handler needs (catalogs,
/// distance tables) is captured by its closure at construction time.
pub struct HandlerParticipant {
    identity: String,
    history: Vec<Envelope>,
    handlers: Vec<(Trigger, Handler)>,
}

impl HandlerParticipant {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            history: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Register a handler for a trigger.
    pub fn on(mut self, trigger: Trigger, handler: Handler) -> Self {
        self.handlers.push((trigger, handler));
        self
    }

    /// Register a handler for envelopes with a given origin role.
    pub fn on_role(
        self,
        role: Role,
        handler: impl Fn(&Envelope) -> Result<Option<Envelope>> + Send + Sync + 'static,
    ) -> Self {
        self.on(Trigger::Role(role), Box::new(handler))
    }

    /// Register a handler for envelopes with a given payload action.
    pub fn on_action(
        self,
        action: impl Into<String>,
        handler: impl Fn(&Envelope) -> Result<Option<Envelope>> + Send + Sync + 'static,
    ) -> Self {
        self.on(Trigger::Action(action.into()), Box::new(handler))
    }

    /// Register a handler for envelopes from a given sender.
    pub fn on_sender(
        self,
        sender: impl Into<String>,
        handler: impl Fn(&Envelope) -> Result<Option<Envelope>> + Send + Sync + 'static,
    ) -> Self {
        self.on(Trigger::Sender(sender.into()), Box::new(handler))
    }
}

impl Participant for HandlerParticipant {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn history(&self) -> &[Envelope] {
        &self.history
    }

    fn receive(&mut self, envelope: &Envelope) -> Result<Option<Envelope>> {
        // Receipt is recorded before the computation runs and survives
        // a failing handler.
        self.history.push(envelope.clone());

        for (trigger, handler) in &self.handlers {
            if trigger.matches(envelope) {
                return handler(envelope);
            }
        }
        Ok(None)
    }
}
