// crm_server/src/web/handlers/customer_handlers.rs

use actix_web::{web, HttpResponse};
use crm_core::CustomerId;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct CreateCustomerRequest {
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
}

/// Either a bare JSON array of records or `{"customers": [...]}`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum BulkCreateRequest {
  Wrapped { customers: Vec<Value> },
  Bare(Vec<Value>),
}

impl BulkCreateRequest {
  fn into_records(self) -> Vec<Value> {
    match self {
      BulkCreateRequest::Wrapped { customers } => customers,
      BulkCreateRequest::Bare(records) => records,
    }
  }
}

#[instrument(name = "handler::create_customer", skip(app_state, req_body), fields(email = %req_body.email))]
pub async fn create_customer_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_body.into_inner();
  let created = app_state
    .service
    .create_customer(&req.name, &req.email, req.phone.as_deref())
    .await?;
  info!(customer_id = created.customer.id, "Customer created.");
  Ok(HttpResponse::Created().json(created))
}

/// Partial success: always 200 unless the store itself failed.
#[instrument(name = "handler::bulk_create_customers", skip_all)]
pub async fn bulk_create_customers_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<BulkCreateRequest>,
) -> Result<HttpResponse, AppError> {
  let records = req_body.into_inner().into_records();
  let outcome = app_state.service.bulk_create_customers(records).await?;

  Ok(HttpResponse::Ok().json(json!({
      "customers": outcome.created,
      "errors": outcome.messages(),
      "summary": outcome.summary(),
  })))
}

#[instrument(name = "handler::get_customer", skip(app_state, path), fields(customer_id = %path.as_ref()))]
pub async fn get_customer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<CustomerId>,
) -> Result<HttpResponse, AppError> {
  let customer = app_state.service.get_customer(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(customer))
}
