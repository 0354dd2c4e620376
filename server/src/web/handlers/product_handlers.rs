// crm_server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

/// The body is passed through untyped: price may be a string or a number and
/// stock may be absent, and the product pipeline reports each case precisely.
#[instrument(name = "handler::create_product", skip_all)]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.service.create_product(req_body.into_inner()).await?;
  info!(product_id = product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}
