use weft_core::error::Result;

use super::context::{Context, StepUpdate};

/// Body of a step: a pure function of the current context.
pub type StepFn = Box<dyn Fn(&Context) -> Result<StepUpdate> + Send + Sync>;

/// A named processing step in the graph.
pub struct Step {
    pub(crate) name: String,
    run: StepFn,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&Context) -> Result<StepUpdate> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the step against a context snapshot.
    pub fn evaluate(&self, context: &Context) -> Result<StepUpdate> {
        (self.run)(context)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}
