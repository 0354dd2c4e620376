// crm_core/src/pipeline/definition.rs

//! Construction of [`RecordPipeline`].

use std::sync::Arc;

use super::step::{RecordStep, SkipCondition, StepDef};

/// An ordered list of named steps over a record draft `T`.
pub struct RecordPipeline<T: Send + 'static> {
  pub(crate) name: &'static str,
  pub(crate) steps: Vec<StepDef<T>>,
}

impl<T: Send + 'static> RecordPipeline<T> {
  pub fn new(name: &'static str) -> Self {
    Self { name, steps: Vec::new() }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Appends an unconditional step.
  pub fn step(self, name: &str, handler: impl RecordStep<T> + 'static) -> Self {
    self.push(name, None, Box::new(handler))
  }

  /// Appends a step that is skipped whenever `skip_if` holds for the draft.
  pub fn step_unless(
    self,
    name: &str,
    skip_if: impl Fn(&T) -> bool + Send + Sync + 'static,
    handler: impl RecordStep<T> + 'static,
  ) -> Self {
    self.push(name, Some(Arc::new(skip_if)), Box::new(handler))
  }

  fn push(mut self, name: &str, skip_if: Option<SkipCondition<T>>, handler: Box<dyn RecordStep<T>>) -> Self {
    self.ensure_step_not_exists(name);
    self.steps.push(StepDef {
      name: name.to_string(),
      skip_if,
      handler,
    });
    self
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Pipeline setup error: step '{}' already exists in pipeline '{}'.",
        step_name, self.name
      );
    }
  }
}

impl<T: Send + 'static> std::fmt::Debug for RecordPipeline<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RecordPipeline")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .finish()
  }
}
