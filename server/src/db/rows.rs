// crm_server/src/db/rows.rs

use chrono::{DateTime, Utc};
use crm_core::{Customer, Order, Product, Record};
use rust_decimal::Decimal;
use sqlx::FromRow;

pub(crate) const CUSTOMER_COLUMNS: &str = "t.id, t.name, t.email, t.phone";
pub(crate) const PRODUCT_COLUMNS: &str = "t.id, t.name, t.price, t.stock";
pub(crate) const ORDER_COLUMNS: &str = "t.id, t.customer_id, t.total_amount, t.order_date, \
  ARRAY(SELECT op.product_id FROM order_products op WHERE op.order_id = t.id ORDER BY op.product_id) AS product_ids";

#[derive(Debug, FromRow)]
pub(crate) struct CustomerRow {
  pub id: i64,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
}

impl From<CustomerRow> for Customer {
  fn from(row: CustomerRow) -> Self {
    Customer {
      id: row.id,
      name: row.name,
      email: row.email,
      phone: row.phone,
    }
  }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
  pub id: i64,
  pub name: String,
  pub price: Decimal,
  pub stock: i32,
}

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Product {
      id: row.id,
      name: row.name,
      price: row.price,
      stock: row.stock,
    }
  }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
  pub id: i64,
  pub customer_id: i64,
  pub total_amount: Decimal,
  pub order_date: DateTime<Utc>,
  pub product_ids: Vec<i64>,
}

impl From<OrderRow> for Order {
  fn from(row: OrderRow) -> Self {
    Order {
      id: row.id,
      customer_id: row.customer_id,
      product_ids: row.product_ids,
      total_amount: row.total_amount,
      order_date: row.order_date,
    }
  }
}

impl From<CustomerRow> for Record {
  fn from(row: CustomerRow) -> Self {
    Record::Customer(row.into())
  }
}

impl From<ProductRow> for Record {
  fn from(row: ProductRow) -> Self {
    Record::Product(row.into())
  }
}

impl From<OrderRow> for Record {
  fn from(row: OrderRow) -> Self {
    Record::Order(row.into())
  }
}
