// crm_server/src/state.rs
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::errors::Result;
use crm_core::{CrmService, MemoryStore, Store};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub service: CrmService,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  /// PostgreSQL when `DATABASE_URL` is set, the in-process store otherwise.
  pub async fn build(config: AppConfig) -> Result<Self> {
    let store: Arc<dyn Store> = match config.store.database_url {
      Some(_) => Arc::new(PgStore::connect(&config.store).await?),
      None => {
        tracing::warn!("DATABASE_URL not set; records are kept in memory only.");
        Arc::new(MemoryStore::new())
      }
    };
    Ok(Self::with_store(store, config))
  }

  pub fn with_store(store: Arc<dyn Store>, config: AppConfig) -> Self {
    Self {
      service: CrmService::new(store, config.query),
      config: Arc::new(config),
    }
  }
}
