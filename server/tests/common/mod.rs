// tests/common/mod.rs
#![allow(dead_code)]

use crm_core::MemoryStore;
use crm_server::config::AppConfig;
use crm_server::state::AppState;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::Level;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Config with no database and job logs under `log_dir`.
pub fn config(log_dir: &Path) -> AppConfig {
  let vars: HashMap<&str, String> = HashMap::from([
    ("HEARTBEAT_LOG_PATH", log_dir.join("heartbeat.log").display().to_string()),
    ("REPORT_LOG_PATH", log_dir.join("report.log").display().to_string()),
    ("REMINDER_LOG_PATH", log_dir.join("reminders.log").display().to_string()),
    ("DEFAULT_PAGE_SIZE", "5".to_string()),
    ("MAX_PAGE_SIZE", "10".to_string()),
  ]);
  AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

pub fn state(log_dir: &Path) -> (AppState, MemoryStore) {
  let store = MemoryStore::new();
  let state = AppState::with_store(Arc::new(store.clone()), config(log_dir));
  (state, store)
}
