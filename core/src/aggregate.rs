// crm_core/src/aggregate.rs

//! Aggregate Computation over order line items.
//!
//! There are two totals and they are kept apart on purpose. The snapshot total
//! is computed once from the prices read while the order is created and is
//! stored on the order. The live total is recomputed from current prices on
//! every read and is never persisted.

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::error::{CrmError, CrmResult, FieldRole};
use crate::model::{Order, Product, ProductId};
use crate::store::UnitOfWork;
use crate::validation;

/// Resolves every requested product id or fails.
///
/// The number of resolved products must equal the number of requested ids.
/// The request fails with `EmptyProductSet` when no id is given and with
/// `UnknownProduct` when an id does not resolve or is given twice; a partial
/// match is never returned.
pub async fn resolve_products(uow: &mut dyn UnitOfWork, requested: &[ProductId]) -> CrmResult<Vec<Product>> {
  if requested.is_empty() {
    return Err(CrmError::EmptyProductSet);
  }
  let found = uow.get_products(requested).await?;
  if found.len() != requested.len() {
    let missing = unresolved_ids(requested, |id| found.iter().any(|p| p.id == id));
    return Err(CrmError::UnknownProduct { missing });
  }
  Ok(found)
}

/// Ids of `requested` that do not resolve or repeat an earlier id, each
/// reported once, in request order.
pub fn unresolved_ids(requested: &[ProductId], resolves: impl Fn(ProductId) -> bool) -> Vec<ProductId> {
  let mut seen = HashSet::with_capacity(requested.len());
  let mut missing = Vec::new();
  for &id in requested {
    let repeated = !seen.insert(id);
    if (repeated || !resolves(id)) && !missing.contains(&id) {
      missing.push(id);
    }
  }
  missing
}

/// Sum of prices over exactly the given products. The sum must still fit the
/// stored amount column.
pub fn snapshot_total(products: &[Product]) -> CrmResult<Decimal> {
  if products.is_empty() {
    return Err(CrmError::EmptyProductSet);
  }
  let total = products.iter().map(|p| p.price).sum();
  validation::validate_amount(FieldRole::Total, total)?;
  Ok(total)
}

/// Sum of the current prices of the order's products. Products deleted since
/// the order was placed no longer contribute.
pub async fn live_total(uow: &mut dyn UnitOfWork, order: &Order) -> CrmResult<Decimal> {
  if order.product_ids.is_empty() {
    return Ok(Decimal::ZERO);
  }
  let products = uow.get_products(&order.product_ids).await?;
  Ok(products.iter().map(|p| p.price).sum())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  fn product(id: ProductId, cents: i64) -> Product {
    Product {
      id,
      name: format!("P{}", id),
      price: Decimal::new(cents, 2),
      stock: 0,
    }
  }

  #[test]
  fn snapshot_sums_exact_prices() {
    let total = snapshot_total(&[product(1, 1000), product(2, 1500)]).unwrap();
    assert_eq!(total, Decimal::new(2500, 2));
    assert_eq!(total.to_string(), "25.00");
  }

  #[test]
  fn repeated_and_unknown_ids_are_reported_once() {
    let known = |id: ProductId| id < 10;
    assert!(unresolved_ids(&[1, 2, 3], known).is_empty());
    assert_eq!(unresolved_ids(&[1, 1], known), vec![1]);
    assert_eq!(unresolved_ids(&[12, 1, 12, 1, 2], known), vec![12, 1]);
  }

  #[test]
  fn snapshot_must_fit_the_amount_column() {
    let big = Product {
      price: Decimal::new(9_000_000_000, 2),
      ..product(1, 0)
    };
    let err = snapshot_total(&[big.clone(), Product { id: 2, ..big }]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
  }

  #[test]
  fn snapshot_of_nothing_is_an_error() {
    assert_eq!(snapshot_total(&[]).unwrap_err().kind(), ErrorKind::EmptyProductSet);
  }
}
