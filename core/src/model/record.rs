// crm_core/src/model/record.rs

//! A kind-erased view over the three entity kinds, used by the query resolver.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{Customer, Order, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Customer,
  Product,
  Order,
}

impl EntityKind {
  pub const ALL: [EntityKind; 3] = [EntityKind::Customer, EntityKind::Product, EntityKind::Order];

  pub fn as_str(&self) -> &'static str {
    match self {
      EntityKind::Customer => "customer",
      EntityKind::Product => "product",
      EntityKind::Order => "order",
    }
  }

  /// Accepts both the singular and the plural collection name.
  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "customer" | "customers" => Some(EntityKind::Customer),
      "product" | "products" => Some(EntityKind::Product),
      "order" | "orders" => Some(EntityKind::Order),
      _ => None,
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A single typed column value. Also the unit stored inside pagination cursors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum FieldValue {
  Id(i64),
  Integer(i64),
  Text(String),
  Decimal(Decimal),
  Timestamp(DateTime<Utc>),
  Null,
}

impl FieldValue {
  /// Orders two values of the same variant. Mixed variants are incomparable.
  pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
    match (self, other) {
      (FieldValue::Id(a), FieldValue::Id(b)) => Some(a.cmp(b)),
      (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
      (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
      (FieldValue::Decimal(a), FieldValue::Decimal(b)) => Some(a.cmp(b)),
      (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
      (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      FieldValue::Text(s) => Some(s),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "lowercase")]
pub enum Record {
  Customer(Customer),
  Product(Product),
  Order(Order),
}

impl Record {
  pub fn kind(&self) -> EntityKind {
    match self {
      Record::Customer(_) => EntityKind::Customer,
      Record::Product(_) => EntityKind::Product,
      Record::Order(_) => EntityKind::Order,
    }
  }

  pub fn id(&self) -> i64 {
    match self {
      Record::Customer(c) => c.id,
      Record::Product(p) => p.id,
      Record::Order(o) => o.id,
    }
  }

  /// Reads a scalar column by name. `None` when the kind has no such column.
  pub fn field(&self, name: &str) -> Option<FieldValue> {
    let value = match (self, name) {
      (_, "id") => FieldValue::Id(self.id()),

      (Record::Customer(c), "name") => FieldValue::Text(c.name.clone()),
      (Record::Customer(c), "email") => FieldValue::Text(c.email.clone()),
      (Record::Customer(c), "phone") => c.phone.clone().map_or(FieldValue::Null, FieldValue::Text),

      (Record::Product(p), "name") => FieldValue::Text(p.name.clone()),
      (Record::Product(p), "price") => FieldValue::Decimal(p.price),
      (Record::Product(p), "stock") => FieldValue::Integer(i64::from(p.stock)),

      (Record::Order(o), "customer_id") => FieldValue::Id(o.customer_id),
      (Record::Order(o), "total_amount") => FieldValue::Decimal(o.total_amount),
      (Record::Order(o), "order_date") => FieldValue::Timestamp(o.order_date),

      _ => return None,
    };
    Some(value)
  }

  pub fn into_customer(self) -> Option<Customer> {
    match self {
      Record::Customer(c) => Some(c),
      _ => None,
    }
  }

  pub fn into_product(self) -> Option<Product> {
    match self {
      Record::Product(p) => Some(p),
      _ => None,
    }
  }

  pub fn into_order(self) -> Option<Order> {
    match self {
      Record::Order(o) => Some(o),
      _ => None,
    }
  }
}
