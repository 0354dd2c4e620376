// crm_server/src/web/handlers/health_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let store = app_state.service.store();
  match store.ping().await {
    Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok", "backend": store.backend() })),
    Err(e) => {
      tracing::warn!(error = %e, "Health check failed.");
      HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable", "backend": store.backend() }))
    }
  }
}
