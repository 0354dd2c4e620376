// crm_core/src/intake/product.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use super::raw_field;
use crate::error::{CrmError, CrmResult, FieldRole};
use crate::model::{NewProduct, Product};
use crate::pipeline::{RecordPipeline, RecordStep};
use crate::store::UnitOfWork;
use crate::validation;

#[derive(Debug, Clone)]
pub struct ProductDraft {
  pub raw: Value,
  pub name: Option<String>,
  pub price: Option<Decimal>,
  pub stock: i32,
  pub created: Option<Product>,
}

impl ProductDraft {
  pub fn new(raw: Value) -> Self {
    Self {
      raw,
      name: None,
      price: None,
      stock: 0,
      created: None,
    }
  }
}

struct RequireName;

#[async_trait]
impl RecordStep<ProductDraft> for RequireName {
  async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut ProductDraft) -> CrmResult<()> {
    draft.name = Some(validation::required_text(FieldRole::Name, raw_field(&draft.raw, "name"))?);
    Ok(())
  }
}

struct ValidatePrice;

#[async_trait]
impl RecordStep<ProductDraft> for ValidatePrice {
  async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut ProductDraft) -> CrmResult<()> {
    let price = validation::parse_decimal(FieldRole::Price, raw_field(&draft.raw, "price"))?;
    validation::validate_price(price)?;
    draft.price = Some(price);
    Ok(())
  }
}

/// Absent stock means 0.
struct ValidateStock;

#[async_trait]
impl RecordStep<ProductDraft> for ValidateStock {
  async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut ProductDraft) -> CrmResult<()> {
    let stock = validation::parse_integer(FieldRole::Stock, raw_field(&draft.raw, "stock"))?;
    draft.stock = validation::validate_stock(stock)?;
    Ok(())
  }
}

struct Persist;

#[async_trait]
impl RecordStep<ProductDraft> for Persist {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut ProductDraft) -> CrmResult<()> {
    let new = NewProduct {
      name: draft.name.clone().ok_or(CrmError::MissingField { field: FieldRole::Name })?,
      price: draft.price.ok_or(CrmError::MissingField { field: FieldRole::Price })?,
      stock: draft.stock,
    };
    draft.created = Some(uow.create_product(new).await?);
    Ok(())
  }
}

pub fn product_pipeline() -> RecordPipeline<ProductDraft> {
  RecordPipeline::new("product")
    .step("require_name", RequireName)
    .step("validate_price", ValidatePrice)
    .step_unless(
      "validate_stock",
      |d: &ProductDraft| raw_field(&d.raw, "stock").is_null(),
      ValidateStock,
    )
    .step("persist", Persist)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use crate::store::{MemoryStore, Store};
  use serde_json::json;

  async fn run(raw: Value) -> CrmResult<Product> {
    let store = MemoryStore::new();
    let mut uow = store.begin().await.unwrap();
    let mut draft = ProductDraft::new(raw);
    product_pipeline().run(uow.as_mut(), &mut draft).await?;
    Ok(draft.created.unwrap())
  }

  #[tokio::test]
  async fn stock_defaults_to_zero() {
    let product = run(json!({"name": "Laptop", "price": "1200.00"})).await.unwrap();
    assert_eq!(product.stock, 0);
    assert_eq!(product.price, Decimal::new(120000, 2));
  }

  #[tokio::test]
  async fn invalid_values_are_rejected() {
    let cases = [
      (json!({"name": "Pen", "price": 0}), ErrorKind::InvalidValue),
      (json!({"name": "Pen", "price": 1, "stock": -3}), ErrorKind::InvalidValue),
      (json!({"name": "Pen"}), ErrorKind::MissingField),
      (json!({"price": 1}), ErrorKind::MissingField),
    ];
    for (raw, kind) in cases {
      assert_eq!(run(raw.clone()).await.unwrap_err().kind(), kind, "{}", raw);
    }
  }
}
