// crm_server/src/seed.rs

//! Demo data inserted through the normal mutation paths.

use crm_core::{CrmError, CrmService, EntityKind, QuerySpec};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::Result;

const CUSTOMERS: &[(&str, &str, &str)] = &[
  ("Alice", "alice@example.com", "+1234567890"),
  ("Bob", "bob@example.com", "123-456-7890"),
];

const PRODUCTS: &[(&str, &str, i32)] = &[("Laptop", "1200.00", 5), ("Phone", "500.00", 15)];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
  pub customers_created: usize,
  pub products_created: usize,
}

/// Safe to run repeatedly: existing emails and product names are left alone.
#[instrument(name = "seed", skip_all)]
pub async fn seed(service: &CrmService) -> Result<SeedReport> {
  let mut report = SeedReport::default();

  for (name, email, phone) in CUSTOMERS {
    match service.create_customer(name, email, Some(*phone)).await {
      Ok(_) => report.customers_created += 1,
      Err(CrmError::DuplicateKey { .. }) => info!(%email, "Seed customer already present."),
      Err(e) => return Err(e.into()),
    }
  }

  for (name, price, stock) in PRODUCTS {
    let existing = service
      .query(EntityKind::Product, &QuerySpec::new().filter("name", *name).first(1))
      .await?;
    if !existing.edges.is_empty() {
      info!(product = %name, "Seed product already present.");
      continue;
    }
    service
      .create_product(json!({ "name": name, "price": price, "stock": stock }))
      .await?;
    report.products_created += 1;
  }

  info!(
    customers = report.customers_created,
    products = report.products_created,
    "Database seeded successfully!"
  );
  Ok(report)
}
