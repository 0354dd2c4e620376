// crm_core/src/intake/mod.rs

//! Record pipelines that turn raw input into persisted entities.
//!
//! Each entity kind has a draft type that collects the parsed fields as the
//! steps run, and a constructor for its pipeline.

pub mod customer;
pub mod order;
pub mod product;

pub use customer::{customer_pipeline, CustomerDraft};
pub use order::{order_pipeline, OrderDraft};
pub use product::{product_pipeline, ProductDraft};

use serde_json::Value;

/// Field lookup on a raw record. Anything but an object has no fields.
pub(crate) fn raw_field<'a>(raw: &'a Value, name: &str) -> &'a Value {
  raw.get(name).unwrap_or(&Value::Null)
}
