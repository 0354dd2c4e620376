// crm_server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use crm_core::{CrmError, ErrorKind};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Crm(#[from] CrmError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("I/O Error: {0}")]
  Io(#[from] std::io::Error),
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    match self {
      AppError::Crm(e) => {
        let body = json!({ "error": e.to_string(), "kind": e.kind() });
        match e.kind() {
          ErrorKind::MissingField
          | ErrorKind::InvalidFormat
          | ErrorKind::InvalidValue
          | ErrorKind::UnknownProduct
          | ErrorKind::EmptyProductSet
          | ErrorKind::InvalidQuery => HttpResponse::BadRequest().json(body),
          ErrorKind::NotFound => HttpResponse::NotFound().json(body),
          ErrorKind::DuplicateKey => HttpResponse::Conflict().json(body),
          ErrorKind::StoreUnavailable => {
            tracing::error!(application_error = %self, "Responding with error");
            HttpResponse::ServiceUnavailable().json(json!({ "error": "Store unavailable", "kind": e.kind() }))
          }
        }
      }
      AppError::Config(m) => {
        tracing::error!(application_error = %self, "Responding with error");
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Io(_) => {
        tracing::error!(application_error = %self, "Responding with error");
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
