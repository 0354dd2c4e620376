// crm_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use crm_core::{CustomerId, OrderId, ProductId};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct CreateOrderRequest {
  pub customer_id: CustomerId,
  #[serde(default)]
  pub product_ids: Vec<ProductId>,
}

#[instrument(name = "handler::create_order", skip(app_state, req_body), fields(customer_id = req_body.customer_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_body.into_inner();
  let order = app_state.service.create_order(req.customer_id, req.product_ids).await?;
  Ok(HttpResponse::Created().json(order))
}

#[instrument(name = "handler::order_totals", skip(app_state, path), fields(order_id = %path.as_ref()))]
pub async fn order_totals_handler(
  app_state: web::Data<AppState>,
  path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
  let totals = app_state.service.order_totals(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "order_id": totals.order_id,
      "stored_total": totals.stored_total,
      "live_total": totals.live_total,
      "drifted": totals.has_drifted(),
  })))
}
