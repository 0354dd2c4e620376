// crm_core/src/pipeline/step.rs

//! A single step of a record pipeline.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CrmResult;
use crate::store::UnitOfWork;

/// Evaluated against the draft before the step runs. `true` skips the step.
pub type SkipCondition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

/// The work done by one named step.
#[async_trait]
pub trait RecordStep<T: Send>: Send + Sync {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut T) -> CrmResult<()>;
}

pub struct StepDef<T: Send + 'static> {
  pub name: String,
  pub skip_if: Option<SkipCondition<T>>,
  pub(crate) handler: Box<dyn RecordStep<T>>,
}

// The handler and the skip closure have no useful Debug output.
impl<T: Send + 'static> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
