// crm_core/src/model/product.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ProductId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id: ProductId,
  pub name: String,
  /// Strictly positive, two decimal places.
  pub price: Decimal,
  /// Mutated by an external replenishment process; never negative.
  pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
  pub name: String,
  pub price: Decimal,
  pub stock: i32,
}
