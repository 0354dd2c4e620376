// crm_server/src/web/handlers/query_handlers.rs

use actix_web::{web, HttpResponse};
use crm_core::{CrmError, EntityKind, QuerySpec};
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

/// `POST /api/v1/{kind}/query` with a `QuerySpec` body; `kind` is singular or plural.
#[instrument(name = "handler::query", skip(app_state, path, req_body), fields(kind = %path.as_ref()))]
pub async fn query_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<QuerySpec>,
) -> Result<HttpResponse, AppError> {
  let raw_kind = path.into_inner();
  let kind = EntityKind::parse(&raw_kind)
    .ok_or_else(|| CrmError::InvalidQuery(format!("unknown entity kind '{}'", raw_kind)))?;
  let page = app_state.service.query(kind, &req_body).await?;
  Ok(HttpResponse::Ok().json(page))
}
