// crm_core/src/error.rs
use anyhow::Error as AnyhowError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::model::EntityKind;

/// The role a single input value plays. Validation failures name the role so
/// callers can point at the offending field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
  Name,
  Email,
  Phone,
  Price,
  Stock,
  /// An order's snapshot total.
  Total,
}

impl FieldRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      FieldRole::Name => "name",
      FieldRole::Email => "email",
      FieldRole::Phone => "phone",
      FieldRole::Price => "price",
      FieldRole::Stock => "stock",
      FieldRole::Total => "total_amount",
    }
  }
}

impl fmt::Display for FieldRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum CrmError {
  #[error("{field} is required")]
  MissingField { field: FieldRole },

  #[error("invalid {field} format: {message}")]
  InvalidFormat { field: FieldRole, message: String },

  #[error("invalid {field}: {message}")]
  InvalidValue { field: FieldRole, message: String },

  #[error("email already exists: {email}")]
  DuplicateKey { email: String },

  #[error("one or more product ids are invalid: {missing:?}")]
  UnknownProduct { missing: Vec<i64> },

  #[error("at least one product must be selected")]
  EmptyProductSet,

  #[error("{entity} {id} not found")]
  NotFound { entity: EntityKind, id: i64 },

  #[error("invalid query: {0}")]
  InvalidQuery(String),

  /// The store itself failed (connection lost, pool exhausted, timeout).
  /// This is the only member that aborts a whole unit of work.
  #[error("store unavailable: {source}")]
  StoreUnavailable {
    #[source]
    source: AnyhowError,
  },
}

/// Fieldless mirror of [`CrmError`] for matching and for wire payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
  MissingField,
  InvalidFormat,
  InvalidValue,
  DuplicateKey,
  UnknownProduct,
  EmptyProductSet,
  NotFound,
  InvalidQuery,
  StoreUnavailable,
}

impl CrmError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      CrmError::MissingField { .. } => ErrorKind::MissingField,
      CrmError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
      CrmError::InvalidValue { .. } => ErrorKind::InvalidValue,
      CrmError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
      CrmError::UnknownProduct { .. } => ErrorKind::UnknownProduct,
      CrmError::EmptyProductSet => ErrorKind::EmptyProductSet,
      CrmError::NotFound { .. } => ErrorKind::NotFound,
      CrmError::InvalidQuery(_) => ErrorKind::InvalidQuery,
      CrmError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
    }
  }

  /// True only for store faults. Everything else is a per-record/per-call failure.
  pub fn is_fatal(&self) -> bool {
    matches!(self, CrmError::StoreUnavailable { .. })
  }

  pub fn store_unavailable(message: impl fmt::Display) -> Self {
    CrmError::StoreUnavailable {
      source: anyhow::anyhow!("{}", message),
    }
  }

  pub(crate) fn invalid_format(field: FieldRole, message: impl Into<String>) -> Self {
    CrmError::InvalidFormat {
      field,
      message: message.into(),
    }
  }

  pub(crate) fn invalid_value(field: FieldRole, message: impl Into<String>) -> Self {
    CrmError::InvalidValue {
      field,
      message: message.into(),
    }
  }

  pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
    CrmError::InvalidQuery(message.into())
  }
}

// Backends report opaque failures through anyhow; those are store faults.
impl From<AnyhowError> for CrmError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<CrmError>() {
      Ok(crm_err) => crm_err,
      Err(other) => CrmError::StoreUnavailable { source: other },
    }
  }
}

pub type CrmResult<T, E = CrmError> = std::result::Result<T, E>;

/// A recoverable failure of one record inside a batch.
#[derive(Debug)]
pub struct RecordError {
  /// Zero-based position of the record in the submitted batch.
  pub index: usize,
  pub email: Option<String>,
  pub error: CrmError,
}

impl RecordError {
  pub fn kind(&self) -> ErrorKind {
    self.error.kind()
  }
}

impl fmt::Display for RecordError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.email {
      Some(email) => write!(f, "record {} ({}): {}", self.index, email, self.error),
      None => write!(f, "record {}: {}", self.index, self.error),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn anyhow_wrapping_a_crm_error_is_unwrapped() {
    let wrapped = anyhow::Error::new(CrmError::EmptyProductSet);
    assert_eq!(CrmError::from(wrapped).kind(), ErrorKind::EmptyProductSet);

    let opaque = anyhow::anyhow!("connection reset by peer");
    let err = CrmError::from(opaque);
    assert!(err.is_fatal());
    assert!(err.to_string().contains("connection reset"));
  }

  #[test]
  fn record_error_message_names_index_and_email() {
    let err = RecordError {
      index: 3,
      email: Some("bob@example.com".to_string()),
      error: CrmError::DuplicateKey {
        email: "bob@example.com".to_string(),
      },
    };
    assert_eq!(
      err.to_string(),
      "record 3 (bob@example.com): email already exists: bob@example.com"
    );

    let anonymous = RecordError {
      index: 0,
      email: None,
      error: CrmError::MissingField { field: FieldRole::Email },
    };
    assert_eq!(anonymous.to_string(), "record 0: email is required");
  }
}
