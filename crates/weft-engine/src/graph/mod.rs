//! Graph execution engine: named steps threaded by a shared context.
//!
//! A pipeline is a set of named `Step`s connected by fixed edges (one
//! successor) or conditional edges (a decision function plus a table
//! mapping labels to successors). The `Graph` walks from an entry step,
//! merging each step's partial update into the context, until it reaches
//! a step with no successor.

pub mod context;
pub mod executor;
pub mod step;

pub use context::{Context, StepUpdate};
pub use executor::{Graph, GraphBuilder, GraphRun, StepRecord};
pub use step::Step;
