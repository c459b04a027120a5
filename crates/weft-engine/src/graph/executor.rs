use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use weft_core::error::{Result, WeftError};
use weft_core::observe::{NoopObserver, SpanObserver, SpanStatus};

use super::context::Context;
use super::step::Step;

/// Decision function for a conditional edge: maps the current context to a
/// routing label.
pub type DecideFn = Box<dyn Fn(&Context) -> String + Send + Sync>;

struct ConditionalEdge {
    decide: DecideFn,
    routes: HashMap<String, String>,
}

/// One visited step in a run report.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: String,
    pub elapsed_ms: u64,
}

/// Result of executing an entire graph.
#[derive(Debug)]
pub struct GraphRun {
    /// The final context after the terminal step.
    pub context: Context,
    /// Trace lines accumulated from every step, in execution order.
    pub trace: Vec<String>,
    /// Visited steps in execution order.
    pub visited: Vec<StepRecord>,
}

/// Executor over named steps connected by fixed and conditional edges.
///
/// Built via [`GraphBuilder`], which validates that the entry and every
/// referenced successor name a registered step. Traversal starts at the
/// entry and ends at the first step with no outgoing edge. Cycles are
/// structurally permitted; an unbounded cycle is a caller configuration
/// error, surfaced through the optional revisit limit rather than
/// detected by the engine.
pub struct Graph {
    steps: HashMap<String, Step>,
    fixed_edges: HashMap<String, String>,
    conditional_edges: HashMap<String, ConditionalEdge>,
    entry: String,
    revisit_limit: Option<usize>,
    observer: Arc<dyn SpanObserver>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph").field("entry", &self.entry).finish()
    }
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Override the revisit limit after construction. `None` disables.
    pub fn set_revisit_limit(&mut self, limit: Option<usize>) {
        self.revisit_limit = limit;
    }

    /// Thread a context through the graph until a terminal step.
    ///
    /// Each step's update is merged by plain per-field overwrite; trace
    /// lines are appended to the run trace. The successor is chosen from
    /// the conditional table when one exists for the current step
    /// (conditional wins over fixed), and a decision label absent from
    /// the table is a fatal configuration error, never a silent fallback.
    pub fn run(&self, initial_context: Context) -> Result<GraphRun> {
        let mut context = initial_context;
        let mut trace = Vec::new();
        let mut visited: Vec<StepRecord> = Vec::new();
        let mut visit_counts: HashMap<String, usize> = HashMap::new();
        let mut current = self.entry.clone();

        loop {
            if let Some(limit) = self.revisit_limit {
                let count = visit_counts.entry(current.clone()).or_insert(0);
                *count += 1;
                if *count > limit {
                    return Err(WeftError::RevisitLimit {
                        step: current,
                        limit,
                    });
                }
            }

            // The builder validated every reachable name; this guards
            // graphs assembled through future paths that skip it.
            let step = self
                .steps
                .get(&current)
                .ok_or_else(|| WeftError::UnknownStep(current.clone()))?;

            info!(step = %current, "Executing graph step");
            let span = self
                .observer
                .begin_span(&format!("step.{}", current), &[]);

            let started = Instant::now();
            let update = match step.evaluate(&context) {
                Ok(update) => {
                    self.observer.end_span(span, SpanStatus::Ok, &[]);
                    update
                }
                Err(e) => {
                    self.observer.end_span(span, SpanStatus::error(&e), &[]);
                    return Err(e);
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            context.apply(&update);
            trace.extend(update.trace.iter().cloned());
            visited.push(StepRecord {
                step: current.clone(),
                elapsed_ms,
            });
            debug!(step = %current, elapsed_ms, "Step complete");

            // Conditional edges take precedence over fixed edges: explicit
            // branching intent overrides default linear wiring.
            if let Some(edge) = self.conditional_edges.get(&current) {
                let label = (edge.decide)(&context);
                match edge.routes.get(&label) {
                    Some(next) => {
                        debug!(step = %current, label = %label, next = %next, "Conditional edge taken");
                        current = next.clone();
                    }
                    None => {
                        return Err(WeftError::UnmappedLabel {
                            step: current,
                            label,
                        });
                    }
                }
            } else if let Some(next) = self.fixed_edges.get(&current) {
                current = next.clone();
            } else {
                debug!(step = %current, "No outgoing edges, graph complete");
                break;
            }
        }

        Ok(GraphRun {
            context,
            trace,
            visited,
        })
    }
}

/// Builder for [`Graph`].
pub struct GraphBuilder {
    steps: HashMap<String, Step>,
    fixed_edges: HashMap<String, String>,
    conditional_edges: HashMap<String, ConditionalEdge>,
    entry: Option<String>,
    revisit_limit: Option<usize>,
    observer: Arc<dyn SpanObserver>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
            fixed_edges: HashMap::new(),
            conditional_edges: HashMap::new(),
            entry: None,
            revisit_limit: Some(25),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Register a named step.
    pub fn step(
        mut self,
        name: impl Into<String>,
        run: impl Fn(&Context) -> Result<super::context::StepUpdate> + Send + Sync + 'static,
    ) -> Self {
        let step = Step::new(name, run);
        self.steps.insert(step.name.clone(), step);
        self
    }

    /// Add a fixed edge: `from`'s single successor is `to`.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.fixed_edges.insert(from.into(), to.into());
        self
    }

    /// Add a conditional edge: after `from`, the decision function picks a
    /// label which the routing table maps to a successor.
    pub fn conditional<I, K, V>(
        mut self,
        from: impl Into<String>,
        decide: impl Fn(&Context) -> String + Send + Sync + 'static,
        routes: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.conditional_edges.insert(
            from.into(),
            ConditionalEdge {
                decide: Box::new(decide),
                routes: routes
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            },
        );
        self
    }

    /// Set the step where traversal begins.
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Cap how many times a single step may be visited. `None` disables.
    pub fn revisit_limit(mut self, limit: Option<usize>) -> Self {
        self.revisit_limit = limit;
        self
    }

    /// Attach a span observer wrapping each step evaluation.
    pub fn observer(mut self, observer: Arc<dyn SpanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate the edge tables and produce a runnable graph.
    ///
    /// Every successor referenced by a fixed edge or a conditional routing
    /// table, every edge source, and the entry must name a registered
    /// step.
    pub fn build(self) -> Result<Graph> {
        let entry = self
            .entry
            .ok_or_else(|| WeftError::Config("graph has no entry step".into()))?;
        if !self.steps.contains_key(&entry) {
            return Err(WeftError::UnknownStep(entry));
        }
        for (from, to) in &self.fixed_edges {
            if !self.steps.contains_key(from) {
                return Err(WeftError::UnknownStep(from.clone()));
            }
            if !self.steps.contains_key(to) {
                return Err(WeftError::UnknownStep(to.clone()));
            }
        }
        for (from, edge) in &self.conditional_edges {
            if !self.steps.contains_key(from) {
                return Err(WeftError::UnknownStep(from.clone()));
            }
            for to in edge.routes.values() {
                if !self.steps.contains_key(to) {
                    return Err(WeftError::UnknownStep(to.clone()));
                }
            }
        }

        Ok(Graph {
            steps: self.steps,
            fixed_edges: self.fixed_edges,
            conditional_edges: self.conditional_edges,
            entry,
            revisit_limit: self.revisit_limit,
            observer: self.observer,
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
