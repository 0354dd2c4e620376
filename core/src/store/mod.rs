// crm_core/src/store/mod.rs

//! The persistence store contract.
//!
//! The core only ever talks to storage through a [`UnitOfWork`] obtained from
//! a [`Store`]. A unit of work sees its own uncommitted writes, and nothing it
//! did becomes visible to other units of work until [`UnitOfWork::commit`].
//! Dropping a unit of work without committing discards it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::CrmResult;
use crate::model::{Customer, CustomerId, NewCustomer, NewOrder, NewProduct, Order, OrderId, Product, ProductId, Record};
use crate::query::StoreQuery;

pub mod memory;

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
  /// Opens a unit of work. Fails only with `StoreUnavailable`.
  async fn begin(&self) -> CrmResult<Box<dyn UnitOfWork>>;

  /// Cheap round trip used by the heartbeat job.
  async fn ping(&self) -> CrmResult<()>;

  /// Short backend label for logs ("memory", "postgres").
  fn backend(&self) -> &'static str;
}

/// Counts used by the periodic CRM report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreSummary {
  pub customers: u64,
  pub orders: u64,
  /// Sum of stored order totals.
  pub revenue: Decimal,
}

#[async_trait]
pub trait UnitOfWork: Send {
  async fn find_customer_by_email(&mut self, email: &str) -> CrmResult<Option<Customer>>;

  /// Inserts a customer. The store's unique constraint on email is authoritative:
  /// a collision (including one with a concurrent, uncommitted unit of work)
  /// yields `DuplicateKey` and leaves the unit of work usable.
  async fn create_customer(&mut self, new: NewCustomer) -> CrmResult<Customer>;

  async fn get_customer(&mut self, id: CustomerId) -> CrmResult<Option<Customer>>;

  async fn create_product(&mut self, new: NewProduct) -> CrmResult<Product>;

  /// Resolves the given ids to products; unknown ids are simply absent from
  /// the result. Order of the result is ascending by id.
  async fn get_products(&mut self, ids: &[ProductId]) -> CrmResult<Vec<Product>>;

  /// Inserts an order and its product associations. Fails with `NotFound`
  /// for an unknown customer, `EmptyProductSet` for no products and
  /// `UnknownProduct` for dangling product ids.
  async fn create_order(&mut self, new: NewOrder) -> CrmResult<Order>;

  async fn get_order(&mut self, id: OrderId) -> CrmResult<Option<Order>>;

  /// Runs an already-validated query and returns at most `query.limit` rows.
  async fn filter_and_order(&mut self, query: &StoreQuery) -> CrmResult<Vec<Record>>;

  async fn summary(&mut self) -> CrmResult<StoreSummary>;

  async fn commit(self: Box<Self>) -> CrmResult<()>;

  async fn rollback(self: Box<Self>) -> CrmResult<()>;
}
