// crm_core/src/model/customer.rs

use serde::{Deserialize, Serialize};

pub type CustomerId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub id: CustomerId,
  pub name: String,
  /// Natural key, unique across all customers.
  pub email: String,
  pub phone: Option<String>,
}

/// A validated customer that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
}
