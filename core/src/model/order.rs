// crm_core/src/model/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;
use super::product::ProductId;

pub type OrderId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub id: OrderId,
  pub customer_id: CustomerId,
  /// Associated products, ascending by id. Association rows belong to the order.
  pub product_ids: Vec<ProductId>,
  /// Snapshot of the product prices taken when the order was created.
  pub total_amount: Decimal,
  /// Assigned by the store.
  pub order_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
  pub customer_id: CustomerId,
  pub product_ids: Vec<ProductId>,
  pub total_amount: Decimal,
}

/// Stored snapshot next to the live recomputation. The two are allowed to drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
  pub order_id: OrderId,
  pub stored_total: Decimal,
  pub live_total: Decimal,
}

impl OrderTotals {
  pub fn has_drifted(&self) -> bool {
    self.stored_total != self.live_total
  }
}
