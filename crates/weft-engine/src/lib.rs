pub mod graph;
pub mod orchestrator;
pub mod router;

pub use graph::{Context, Graph, GraphBuilder, GraphRun, StepRecord, StepUpdate};
pub use orchestrator::{BusOrchestrator, GraphOrchestrator, RunOutcome, TerminalMarker};
pub use router::Router;
