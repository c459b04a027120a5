use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use weft_core::envelope::{Envelope, Recipient};
use weft_core::error::Result;
use weft_core::observe::{NoopObserver, SpanObserver, SpanStatus};
use weft_core::participant::Participant;

/// Central delivery component: registry of participants plus a log of all
/// traffic.
///
/// The registry preserves registration order, which is the broadcast
/// delivery order, so runs are deterministic and total. The log records
/// every envelope that passes through `send` (both the one sent and any
/// generated responses), append-only and duplicate-free by id.
pub struct Router {
    participants: Vec<Box<dyn Participant>>,
    log: Vec<Envelope>,
    seen: HashSet<String>,
    observer: Arc<dyn SpanObserver>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            participants: Vec::new(),
            log: Vec::new(),
            seen: HashSet::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach a span observer wrapping each send and each receive.
    pub fn with_observer(mut self, observer: Arc<dyn SpanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Register a participant, keyed by identity.
    ///
    /// Re-registering an existing identity overwrites the prior entry in
    /// place (last write wins, original broadcast position kept).
    pub fn register(&mut self, participant: Box<dyn Participant>) {
        let identity = participant.identity();
        debug!(identity = %identity, "Participant registered");
        match self
            .participants
            .iter()
            .position(|p| p.identity() == identity)
        {
            Some(idx) => self.participants[idx] = participant,
            None => self.participants.push(participant),
        }
    }

    /// Look up a registered participant by identity.
    pub fn participant(&self, identity: &str) -> Option<&dyn Participant> {
        self.participants
            .iter()
            .find(|p| p.identity() == identity)
            .map(|p| p.as_ref())
    }

    /// All traffic that has passed through `send`, in insertion order.
    pub fn log(&self) -> &[Envelope] {
        &self.log
    }

    /// Deliver an envelope and collect generated responses.
    ///
    /// Direct sends to an unregistered identity are a silent no-op:
    /// a misrouted address must not crash the whole run. Broadcasts visit
    /// every registered participant except the sender, in registration
    /// order, and fail fast: a failing `receive` aborts the remaining
    /// deliveries and propagates, leaving the earlier deliveries (and
    /// their history appends) in place.
    pub fn send(&mut self, envelope: &Envelope) -> Result<Vec<Envelope>> {
        self.record(envelope);

        let span = self.observer.begin_span(
            "router.send",
            &[
                ("message.id", envelope.id.clone()),
                ("message.from", envelope.sender.clone()),
                ("message.to", envelope.recipient.to_string()),
            ],
        );

        let result = self.dispatch(envelope);
        match &result {
            Ok(responses) => self.observer.end_span(
                span,
                SpanStatus::Ok,
                &[("responses", responses.len().to_string())],
            ),
            Err(e) => self.observer.end_span(span, SpanStatus::error(e), &[]),
        }
        result
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Vec<Envelope>> {
        let mut responses = Vec::new();

        match &envelope.recipient {
            Recipient::Participant { identity } => {
                let target = self
                    .participants
                    .iter()
                    .position(|p| p.identity() == identity);
                match target {
                    Some(idx) => {
                        if let Some(response) = self.deliver(idx, envelope)? {
                            responses.push(response);
                        }
                    }
                    None => {
                        warn!(recipient = %identity, id = %envelope.id, "Unroutable recipient, dropping envelope");
                    }
                }
            }
            Recipient::Broadcast => {
                for idx in 0..self.participants.len() {
                    if self.participants[idx].identity() == envelope.sender {
                        continue;
                    }
                    if let Some(response) = self.deliver(idx, envelope)? {
                        responses.push(response);
                    }
                }
            }
        }

        Ok(responses)
    }

    /// Deliver to one participant, logging any response.
    fn deliver(&mut self, idx: usize, envelope: &Envelope) -> Result<Option<Envelope>> {
        let identity = self.participants[idx].identity().to_string();
        let span = self.observer.begin_span(
            &format!("participant.{}.receive", identity),
            &[("input.message_id", envelope.id.clone())],
        );

        match self.participants[idx].receive(envelope) {
            Ok(Some(response)) => {
                self.observer.end_span(
                    span,
                    SpanStatus::Ok,
                    &[("output.message_id", response.id.clone())],
                );
                debug!(from = %identity, id = %response.id, "Response generated");
                self.record(&response);
                Ok(Some(response))
            }
            Ok(None) => {
                self.observer.end_span(span, SpanStatus::Ok, &[]);
                Ok(None)
            }
            Err(e) => {
                self.observer.end_span(span, SpanStatus::error(&e), &[]);
                Err(e)
            }
        }
    }

    fn record(&mut self, envelope: &Envelope) {
        if self.seen.insert(envelope.id.clone()) {
            self.log.push(envelope.clone());
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
