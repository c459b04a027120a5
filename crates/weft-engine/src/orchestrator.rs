use std::sync::Arc;

use tracing::{debug, info, warn};

use weft_core::config::{BusConfig, GraphConfig};
use weft_core::envelope::{Envelope, Payload, Role};
use weft_core::error::{Result, WeftError};
use weft_core::observe::{NoopObserver, SpanObserver, SpanStatus};

use crate::graph::{Context, Graph};
use crate::router::Router;

/// The `(role, action)` combination marking a run's terminal envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalMarker {
    pub role: Role,
    pub action: String,
}

impl TerminalMarker {
    pub fn new(role: Role, action: impl Into<String>) -> Self {
        Self {
            role,
            action: action.into(),
        }
    }

    fn matches(&self, envelope: &Envelope) -> bool {
        envelope.role == self.role && envelope.action() == Some(self.action.as_str())
    }
}

impl Default for TerminalMarker {
    fn default() -> Self {
        Self::new(Role::Assistant, "final_result")
    }
}

/// Outcome of a top-level run.
///
/// A missing artifact is a distinct outcome, not an error: the run itself
/// completed, it just produced nothing terminal.
#[derive(Debug)]
pub enum RunOutcome {
    Complete {
        artifact: serde_json::Value,
        trace: Vec<String>,
    },
    NoResult {
        trace: Vec<String>,
    },
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn artifact(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Complete { artifact, .. } => Some(artifact),
            Self::NoResult { .. } => None,
        }
    }

    pub fn trace(&self) -> &[String] {
        match self {
            Self::Complete { trace, .. } | Self::NoResult { trace } => trace,
        }
    }
}

/// Drives a router full of participants from raw input to a terminal
/// envelope.
///
/// The initial envelope is addressed to the entry participant; responses
/// drain breadth-first (every response of one round is sent before the
/// results of those sends form the next round) until a round comes back
/// empty. The artifact is the payload of the most recent logged envelope
/// matching the terminal marker.
pub struct BusOrchestrator {
    router: Router,
    entry: String,
    terminal: TerminalMarker,
    max_rounds: usize,
    observer: Arc<dyn SpanObserver>,
}

impl BusOrchestrator {
    pub fn new(router: Router, entry: impl Into<String>) -> Self {
        Self {
            router,
            entry: entry.into(),
            terminal: TerminalMarker::default(),
            max_rounds: 64,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build from config.
    pub fn from_config(router: Router, config: &BusConfig) -> Self {
        Self::new(router, config.entry.clone())
            .with_terminal(TerminalMarker::new(
                Role::Assistant,
                config.terminal_action.clone(),
            ))
            .with_max_rounds(config.max_rounds)
    }

    pub fn with_terminal(mut self, terminal: TerminalMarker) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Attach a span observer for the enclosing run span.
    pub fn with_observer(mut self, observer: Arc<dyn SpanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run the bus to completion on raw input.
    pub fn run(&mut self, input: impl Into<Payload>) -> Result<RunOutcome> {
        let span = self
            .observer
            .begin_span("run", &[("mode", "bus".into()), ("entry", self.entry.clone())]);

        let result = self.drive(input.into());
        match &result {
            Ok(outcome) => self.observer.end_span(
                span,
                SpanStatus::Ok,
                &[("complete", outcome.is_complete().to_string())],
            ),
            Err(e) => self.observer.end_span(span, SpanStatus::error(e), &[]),
        }
        result
    }

    fn drive(&mut self, input: Payload) -> Result<RunOutcome> {
        let initial = Envelope::external(self.entry.clone(), input);
        info!(entry = %self.entry, id = %initial.id, "Bus run started");

        let mut round = self.router.send(&initial)?;
        let mut rounds = 0usize;

        while !round.is_empty() {
            rounds += 1;
            if rounds > self.max_rounds {
                return Err(WeftError::RoundLimit(self.max_rounds));
            }
            debug!(round = rounds, responses = round.len(), "Draining round");

            let mut next = Vec::new();
            for response in &round {
                next.extend(self.router.send(response)?);
            }
            round = next;
        }

        let trace: Vec<String> = self.router.log().iter().map(|e| e.to_string()).collect();

        // Most recent terminal envelope wins.
        let artifact = self
            .router
            .log()
            .iter()
            .rev()
            .find(|e| self.terminal.matches(e))
            .map(|e| e.payload.to_value());

        match artifact {
            Some(artifact) => {
                info!(rounds, "Bus run complete");
                Ok(RunOutcome::Complete { artifact, trace })
            }
            None => {
                warn!(rounds, action = %self.terminal.action, "No result produced");
                Ok(RunOutcome::NoResult { trace })
            }
        }
    }
}

/// Drives a graph from raw input to a designated artifact field.
pub struct GraphOrchestrator {
    graph: Graph,
    artifact_field: String,
    declared_fields: Vec<String>,
    observer: Arc<dyn SpanObserver>,
}

impl GraphOrchestrator {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            artifact_field: "final_output".to_string(),
            declared_fields: Vec::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build from config.
    pub fn from_config(mut graph: Graph, config: &GraphConfig) -> Self {
        graph.set_revisit_limit(config.revisit_limit_opt());
        Self::new(graph)
            .with_artifact_field(config.artifact_field.clone())
            .with_declared_fields(config.declared_fields.clone())
    }

    pub fn with_artifact_field(mut self, field: impl Into<String>) -> Self {
        self.artifact_field = field.into();
        self
    }

    /// Fields seeded as empty defaults in the initial context.
    pub fn with_declared_fields(mut self, fields: Vec<String>) -> Self {
        self.declared_fields = fields;
        self
    }

    /// Attach a span observer for the enclosing run span.
    pub fn with_observer(mut self, observer: Arc<dyn SpanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run the graph to completion on raw input.
    pub fn run(&self, input: &str) -> Result<RunOutcome> {
        let span = self.observer.begin_span(
            "run",
            &[
                ("mode", "graph".into()),
                ("entry", self.graph.entry().to_string()),
            ],
        );

        let result = self.drive(input);
        match &result {
            Ok(outcome) => self.observer.end_span(
                span,
                SpanStatus::Ok,
                &[("complete", outcome.is_complete().to_string())],
            ),
            Err(e) => self.observer.end_span(span, SpanStatus::error(e), &[]),
        }
        result
    }

    fn drive(&self, input: &str) -> Result<RunOutcome> {
        let mut context = Context::new();
        // Declared defaults first: listing `raw_input` among the declared
        // fields must not null out the actual input.
        for field in &self.declared_fields {
            context.set(field.clone(), serde_json::Value::Null);
        }
        context.set_str("raw_input", input);

        info!(entry = %self.graph.entry(), "Graph run started");
        let run = self.graph.run(context)?;

        let artifact = run
            .context
            .get(&self.artifact_field)
            .filter(|v| !is_empty_value(v))
            .cloned();

        match artifact {
            Some(artifact) => {
                info!(steps = run.visited.len(), "Graph run complete");
                Ok(RunOutcome::Complete {
                    artifact,
                    trace: run.trace,
                })
            }
            None => {
                warn!(field = %self.artifact_field, "No result produced");
                Ok(RunOutcome::NoResult { trace: run.trace })
            }
        }
    }
}

/// An artifact field that is null or an empty string counts as unpopulated.
fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}
