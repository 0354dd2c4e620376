// crm_core/src/pipeline/execution.rs

//! `RecordPipeline::run()`: executes the steps against one draft.

use tracing::{event, Instrument, Level};

use crate::error::CrmResult;
use crate::pipeline::definition::RecordPipeline;
use crate::store::UnitOfWork;

impl<T: Send + 'static> RecordPipeline<T> {
  /// Runs every non-skipped step in order. The first error is returned as is
  /// and no later step runs.
  pub async fn run(&self, uow: &mut dyn UnitOfWork, draft: &mut T) -> CrmResult<()> {
    event!(Level::TRACE, pipeline = self.name, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(&*draft) {
          event!(Level::INFO, step_name = %step_def.name, step_index = step_idx, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let step_span = tracing::debug_span!(
        "record_pipeline_step",
        pipeline = self.name,
        step_name = %step_def.name,
        step_index = step_idx
      );
      let outcome = step_def
        .handler
        .apply(&mut *uow, &mut *draft)
        .instrument(step_span)
        .await;

      if let Err(e) = outcome {
        if e.is_fatal() {
          event!(Level::ERROR, step_name = %step_def.name, error = %e, "Step failed: store fault.");
        } else {
          event!(Level::WARN, step_name = %step_def.name, error = %e, "Step rejected the record.");
        }
        return Err(e);
      }
    }

    event!(Level::TRACE, pipeline = self.name, "Pipeline execution completed.");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::error::{CrmError, CrmResult, ErrorKind};
  use crate::pipeline::{RecordPipeline, RecordStep};
  use crate::store::{MemoryStore, Store, UnitOfWork};
  use async_trait::async_trait;

  #[derive(Default)]
  struct Trace {
    ran: Vec<&'static str>,
    skip_second: bool,
  }

  struct Mark(&'static str);

  #[async_trait]
  impl RecordStep<Trace> for Mark {
    async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut Trace) -> CrmResult<()> {
      draft.ran.push(self.0);
      Ok(())
    }
  }

  struct Fail;

  #[async_trait]
  impl RecordStep<Trace> for Fail {
    async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut Trace) -> CrmResult<()> {
      draft.ran.push("fail");
      Err(CrmError::EmptyProductSet)
    }
  }

  fn pipeline() -> RecordPipeline<Trace> {
    RecordPipeline::new("trace")
      .step("first", Mark("first"))
      .step_unless("second", |t: &Trace| t.skip_second, Mark("second"))
      .step("third", Mark("third"))
  }

  #[tokio::test]
  async fn runs_steps_in_order_and_honours_skip_if() {
    let store = MemoryStore::new();
    let mut uow = store.begin().await.unwrap();

    let mut all = Trace::default();
    pipeline().run(uow.as_mut(), &mut all).await.unwrap();
    assert_eq!(all.ran, vec!["first", "second", "third"]);

    let mut skipping = Trace {
      skip_second: true,
      ..Trace::default()
    };
    pipeline().run(uow.as_mut(), &mut skipping).await.unwrap();
    assert_eq!(skipping.ran, vec!["first", "third"]);
  }

  #[tokio::test]
  async fn first_failure_stops_the_record() {
    let store = MemoryStore::new();
    let mut uow = store.begin().await.unwrap();
    let p = RecordPipeline::new("failing")
      .step("first", Mark("first"))
      .step("fail", Fail)
      .step("second", Mark("second"));

    let mut draft = Trace::default();
    let err = p.run(uow.as_mut(), &mut draft).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyProductSet);
    assert_eq!(draft.ran, vec!["first", "fail"]);
  }

  #[test]
  #[should_panic(expected = "already exists")]
  fn duplicate_step_names_are_rejected() {
    let _ = RecordPipeline::<Trace>::new("dup").step("a", Mark("a")).step("a", Mark("a"));
  }
}
