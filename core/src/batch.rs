// crm_core/src/batch.rs

//! Batch Mutation Coordinator.
//!
//! All records of a batch share one unit of work. A record that fails
//! validation or uniqueness is reported and skipped; the unit of work is still
//! committed at the end. Only a store fault aborts the batch, in which case
//! the unit of work is rolled back and nothing of the batch persists.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{CrmResult, RecordError};
use crate::intake::{customer_pipeline, CustomerDraft};
use crate::model::Customer;
use crate::pipeline::RecordPipeline;
use crate::store::Store;

#[derive(Debug)]
pub struct BatchOutcome {
  pub batch_id: Uuid,
  /// In the order the records succeeded.
  pub created: Vec<Customer>,
  /// In the order the failing records were processed.
  pub errors: Vec<RecordError>,
}

impl BatchOutcome {
  fn empty(batch_id: Uuid) -> Self {
    Self {
      batch_id,
      created: Vec::new(),
      errors: Vec::new(),
    }
  }

  /// Number of records the batch was given.
  pub fn processed(&self) -> usize {
    self.created.len() + self.errors.len()
  }

  /// Human-readable error list, one line per failed record.
  pub fn messages(&self) -> Vec<String> {
    self.errors.iter().map(ToString::to_string).collect()
  }

  pub fn summary(&self) -> BatchSummary {
    BatchSummary {
      batch_id: self.batch_id,
      created: self.created.len(),
      failed: self.errors.len(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
  pub batch_id: Uuid,
  pub created: usize,
  pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct BatchCoordinator {
  pipeline: Arc<RecordPipeline<CustomerDraft>>,
}

impl Default for BatchCoordinator {
  fn default() -> Self {
    Self::new(Arc::new(customer_pipeline()))
  }
}

impl BatchCoordinator {
  pub fn new(pipeline: Arc<RecordPipeline<CustomerDraft>>) -> Self {
    Self { pipeline }
  }

  /// Creates customers from raw key-value records. Runs to completion over
  /// every record; `Err` means the store failed and the batch was discarded.
  pub async fn bulk_create_customers(&self, store: &dyn Store, records: Vec<Value>) -> CrmResult<BatchOutcome> {
    let batch_id = Uuid::new_v4();
    let span = info_span!("bulk_create_customers", %batch_id, records = records.len());
    self.run_batch(store, batch_id, records).instrument(span).await
  }

  async fn run_batch(&self, store: &dyn Store, batch_id: Uuid, records: Vec<Value>) -> CrmResult<BatchOutcome> {
    let mut outcome = BatchOutcome::empty(batch_id);
    if records.is_empty() {
      info!("Empty batch, nothing to do.");
      return Ok(outcome);
    }

    let mut uow = store.begin().await?;

    for (index, raw) in records.into_iter().enumerate() {
      let mut draft = CustomerDraft::new(raw);
      let result = self
        .pipeline
        .run(uow.as_mut(), &mut draft)
        .instrument(info_span!("record", index))
        .await;

      match (result, draft.created.take()) {
        (Ok(()), Some(customer)) => outcome.created.push(customer),
        (Ok(()), None) => {
          warn!(index, "Pipeline finished without creating a customer.");
        }
        (Err(e), _) if e.is_fatal() => {
          error!(index, error = %e, "Store failed mid-batch, rolling back.");
          if let Err(rollback_err) = uow.rollback().await {
            warn!(error = %rollback_err, "Rollback after store failure also failed.");
          }
          return Err(e);
        }
        (Err(e), _) => {
          let email = draft.raw_email();
          outcome.errors.push(RecordError { index, email, error: e });
        }
      }
    }

    uow.commit().await?;
    info!(
      created = outcome.created.len(),
      failed = outcome.errors.len(),
      "Batch committed."
    );
    Ok(outcome)
  }
}
