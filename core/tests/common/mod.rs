// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper.

use crm_core::{CrmService, MemoryStore, Product, QueryConfig};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run) ---
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

/// A fresh service over its own in-memory store. The store handle is returned
/// too so tests can make administrative changes and inject faults.
pub fn service() -> (CrmService, MemoryStore) {
  service_with(QueryConfig::default())
}

pub fn service_with(config: QueryConfig) -> (CrmService, MemoryStore) {
  let store = MemoryStore::new();
  let service = CrmService::new(Arc::new(store.clone()), config);
  (service, store)
}

pub fn money(raw: &str) -> Decimal {
  raw.parse().unwrap()
}

pub async fn product(service: &CrmService, name: &str, price: &str) -> Product {
  service
    .create_product(json!({ "name": name, "price": price, "stock": 10 }))
    .await
    .unwrap()
}

pub fn customer_record(name: &str, email: &str) -> serde_json::Value {
  json!({ "name": name, "email": email })
}
