// crm_core/src/intake/customer.rs

use async_trait::async_trait;
use serde_json::Value;

use super::raw_field;
use crate::error::{CrmError, CrmResult, FieldRole};
use crate::model::{Customer, NewCustomer};
use crate::pipeline::{RecordPipeline, RecordStep};
use crate::store::UnitOfWork;
use crate::uniqueness::UniquenessChecker;
use crate::validation;

/// One candidate customer moving through the pipeline.
#[derive(Debug, Clone)]
pub struct CustomerDraft {
  pub raw: Value,
  pub name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub created: Option<Customer>,
}

impl CustomerDraft {
  pub fn new(raw: Value) -> Self {
    Self {
      raw,
      name: None,
      email: None,
      phone: None,
      created: None,
    }
  }

  /// Best-effort email for error context, available even before validation.
  pub fn raw_email(&self) -> Option<String> {
    self
      .email
      .clone()
      .or_else(|| raw_field(&self.raw, "email").as_str().map(|s| s.trim().to_string()))
      .filter(|s| !s.is_empty())
  }

  fn validated(&self) -> CrmResult<NewCustomer> {
    Ok(NewCustomer {
      name: self.name.clone().ok_or(CrmError::MissingField { field: FieldRole::Name })?,
      email: self.email.clone().ok_or(CrmError::MissingField { field: FieldRole::Email })?,
      phone: self.phone.clone(),
    })
  }
}

/// Reads name, email and phone; name and email must be present.
struct RequireFields;

#[async_trait]
impl RecordStep<CustomerDraft> for RequireFields {
  async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut CustomerDraft) -> CrmResult<()> {
    let name = validation::required_text(FieldRole::Name, raw_field(&draft.raw, "name"))?;
    let email = validation::required_text(FieldRole::Email, raw_field(&draft.raw, "email"))?;
    validation::validate_email(&email)?;
    let phone = validation::optional_text(FieldRole::Phone, raw_field(&draft.raw, "phone"))?;
    draft.name = Some(name);
    draft.email = Some(email);
    draft.phone = phone;
    Ok(())
  }
}

struct ValidatePhone;

#[async_trait]
impl RecordStep<CustomerDraft> for ValidatePhone {
  async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut CustomerDraft) -> CrmResult<()> {
    match &draft.phone {
      Some(phone) => validation::validate_phone(phone),
      None => Ok(()),
    }
  }
}

#[async_trait]
impl RecordStep<CustomerDraft> for UniquenessChecker {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut CustomerDraft) -> CrmResult<()> {
    let email = draft.email.as_deref().ok_or(CrmError::MissingField { field: FieldRole::Email })?;
    self.ensure_available(uow, email).await
  }
}

struct Persist;

#[async_trait]
impl RecordStep<CustomerDraft> for Persist {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut CustomerDraft) -> CrmResult<()> {
    let new = draft.validated()?;
    draft.created = Some(uow.create_customer(new).await?);
    Ok(())
  }
}

/// require_fields → validate_phone (only when a phone was given) →
/// check_uniqueness → persist
pub fn customer_pipeline() -> RecordPipeline<CustomerDraft> {
  RecordPipeline::new("customer")
    .step("require_fields", RequireFields)
    .step_unless("validate_phone", |d: &CustomerDraft| d.phone.is_none(), ValidatePhone)
    .step("check_uniqueness", UniquenessChecker)
    .step("persist", Persist)
}
