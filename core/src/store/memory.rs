// crm_core/src/store/memory.rs

//! Process-local store.
//!
//! Committed state lives behind one mutex. Each unit of work stages its
//! inserts privately and publishes them on commit. Emails are reserved at
//! insert time, so two overlapping units of work that insert the same email
//! cannot both succeed: the second insert sees the reservation and fails with
//! `DuplicateKey`, just as a unique index would.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Store, StoreSummary, UnitOfWork};
use crate::aggregate::unresolved_ids;
use crate::error::{CrmError, CrmResult};
use crate::model::{
  Customer, CustomerId, EntityKind, NewCustomer, NewOrder, NewProduct, Order, OrderId, Product, ProductId, Record,
};
use crate::query::StoreQuery;

type UowId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmailOwner {
  Committed(CustomerId),
  Pending(UowId),
}

#[derive(Debug, Default)]
enum Fault {
  #[default]
  None,
  /// Operations succeed until the budget reaches zero, then the store is offline.
  After(u64),
  Offline,
}

#[derive(Debug, Default)]
struct State {
  customers: BTreeMap<CustomerId, Customer>,
  products: BTreeMap<ProductId, Product>,
  orders: BTreeMap<OrderId, Order>,
  emails: HashMap<String, EmailOwner>,
  next_customer_id: i64,
  next_product_id: i64,
  next_order_id: i64,
  next_uow_id: UowId,
  operations: u64,
  fault: Fault,
}

impl State {
  /// Counts one store round trip and applies any injected fault.
  fn touch(&mut self) -> CrmResult<()> {
    self.operations += 1;
    match self.fault {
      Fault::None => Ok(()),
      Fault::Offline => Err(CrmError::store_unavailable("memory store is offline")),
      Fault::After(0) => {
        self.fault = Fault::Offline;
        Err(CrmError::store_unavailable("memory store is offline"))
      }
      Fault::After(ref mut remaining) => {
        *remaining -= 1;
        Ok(())
      }
    }
  }

  fn release_reservations(&mut self, uow: UowId) {
    self.emails.retain(|_, owner| *owner != EmailOwner::Pending(uow));
  }
}

#[derive(Debug, Default)]
struct Staged {
  customers: BTreeMap<CustomerId, Customer>,
  products: BTreeMap<ProductId, Product>,
  orders: BTreeMap<OrderId, Order>,
}

/// In-memory [`Store`]. Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<State>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of store round trips made so far (including `begin`).
  pub fn operation_count(&self) -> u64 {
    self.state.lock().operations
  }

  /// Lets the next `operations` round trips succeed, then fails every later
  /// one with `StoreUnavailable`.
  pub fn fail_after(&self, operations: u64) {
    self.state.lock().fault = Fault::After(operations);
  }

  pub fn set_offline(&self, offline: bool) {
    self.state.lock().fault = if offline { Fault::Offline } else { Fault::None };
  }

  /// Administrative price change, outside any unit of work.
  pub fn set_product_price(&self, id: ProductId, price: Decimal) -> CrmResult<()> {
    let mut state = self.state.lock();
    let product = state.products.get_mut(&id).ok_or(CrmError::NotFound {
      entity: EntityKind::Product,
      id,
    })?;
    product.price = price;
    Ok(())
  }

  /// Replenishment hook; stock is not managed by the core.
  pub fn set_product_stock(&self, id: ProductId, stock: i32) -> CrmResult<()> {
    let mut state = self.state.lock();
    let product = state.products.get_mut(&id).ok_or(CrmError::NotFound {
      entity: EntityKind::Product,
      id,
    })?;
    product.stock = stock;
    Ok(())
  }

  /// Deletes a customer together with its orders.
  pub fn delete_customer(&self, id: CustomerId) -> CrmResult<()> {
    let mut state = self.state.lock();
    let customer = state.customers.remove(&id).ok_or(CrmError::NotFound {
      entity: EntityKind::Customer,
      id,
    })?;
    state.emails.remove(&customer.email);
    let before = state.orders.len();
    state.orders.retain(|_, o| o.customer_id != id);
    debug!(customer_id = id, orders_removed = before - state.orders.len(), "Customer deleted.");
    Ok(())
  }

  /// Deletes a product. Orders keep existing but lose the association.
  pub fn delete_product(&self, id: ProductId) -> CrmResult<()> {
    let mut state = self.state.lock();
    state.products.remove(&id).ok_or(CrmError::NotFound {
      entity: EntityKind::Product,
      id,
    })?;
    for order in state.orders.values_mut() {
      order.product_ids.retain(|p| *p != id);
    }
    Ok(())
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn begin(&self) -> CrmResult<Box<dyn UnitOfWork>> {
    let mut state = self.state.lock();
    state.touch()?;
    state.next_uow_id += 1;
    Ok(Box::new(MemoryUnitOfWork {
      id: state.next_uow_id,
      state: Arc::clone(&self.state),
      staged: Staged::default(),
    }))
  }

  async fn ping(&self) -> CrmResult<()> {
    self.state.lock().touch()
  }

  fn backend(&self) -> &'static str {
    "memory"
  }
}

pub struct MemoryUnitOfWork {
  id: UowId,
  state: Arc<Mutex<State>>,
  staged: Staged,
}

impl MemoryUnitOfWork {
  fn visible_customer(&self, state: &State, id: CustomerId) -> Option<Customer> {
    self
      .staged
      .customers
      .get(&id)
      .or_else(|| state.customers.get(&id))
      .cloned()
  }

  fn visible_product(&self, state: &State, id: ProductId) -> Option<Product> {
    self
      .staged
      .products
      .get(&id)
      .or_else(|| state.products.get(&id))
      .cloned()
  }

  fn visible_records(&self, state: &State, kind: EntityKind) -> Vec<Record> {
    match kind {
      EntityKind::Customer => state
        .customers
        .values()
        .chain(self.staged.customers.values())
        .cloned()
        .map(Record::Customer)
        .collect(),
      EntityKind::Product => state
        .products
        .values()
        .chain(self.staged.products.values())
        .cloned()
        .map(Record::Product)
        .collect(),
      EntityKind::Order => state
        .orders
        .values()
        .chain(self.staged.orders.values())
        .cloned()
        .map(Record::Order)
        .collect(),
    }
  }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
  async fn find_customer_by_email(&mut self, email: &str) -> CrmResult<Option<Customer>> {
    let mut state = self.state.lock();
    state.touch()?;
    let found = match state.emails.get(email) {
      Some(EmailOwner::Committed(id)) => state.customers.get(id).cloned(),
      // Another unit of work's pending insert is invisible here.
      Some(EmailOwner::Pending(owner)) if *owner == self.id => {
        self.staged.customers.values().find(|c| c.email == email).cloned()
      }
      _ => None,
    };
    Ok(found)
  }

  async fn create_customer(&mut self, new: NewCustomer) -> CrmResult<Customer> {
    let mut state = self.state.lock();
    state.touch()?;
    if state.emails.contains_key(&new.email) {
      return Err(CrmError::DuplicateKey { email: new.email });
    }
    state.next_customer_id += 1;
    let customer = Customer {
      id: state.next_customer_id,
      name: new.name,
      email: new.email,
      phone: new.phone,
    };
    state.emails.insert(customer.email.clone(), EmailOwner::Pending(self.id));
    self.staged.customers.insert(customer.id, customer.clone());
    Ok(customer)
  }

  async fn get_customer(&mut self, id: CustomerId) -> CrmResult<Option<Customer>> {
    let mut state = self.state.lock();
    state.touch()?;
    Ok(self.visible_customer(&state, id))
  }

  async fn create_product(&mut self, new: NewProduct) -> CrmResult<Product> {
    let mut state = self.state.lock();
    state.touch()?;
    state.next_product_id += 1;
    let product = Product {
      id: state.next_product_id,
      name: new.name,
      price: new.price,
      stock: new.stock,
    };
    self.staged.products.insert(product.id, product.clone());
    Ok(product)
  }

  async fn get_products(&mut self, ids: &[ProductId]) -> CrmResult<Vec<Product>> {
    let mut state = self.state.lock();
    state.touch()?;
    let mut found: BTreeMap<ProductId, Product> = BTreeMap::new();
    for id in ids {
      if let Some(product) = self.visible_product(&state, *id) {
        found.insert(product.id, product);
      }
    }
    Ok(found.into_values().collect())
  }

  async fn create_order(&mut self, new: NewOrder) -> CrmResult<Order> {
    let mut state = self.state.lock();
    state.touch()?;
    if self.visible_customer(&state, new.customer_id).is_none() {
      return Err(CrmError::NotFound {
        entity: EntityKind::Customer,
        id: new.customer_id,
      });
    }
    if new.product_ids.is_empty() {
      return Err(CrmError::EmptyProductSet);
    }
    let missing = unresolved_ids(&new.product_ids, |id| self.visible_product(&state, id).is_some());
    if !missing.is_empty() {
      return Err(CrmError::UnknownProduct { missing });
    }

    state.next_order_id += 1;
    let order = Order {
      id: state.next_order_id,
      customer_id: new.customer_id,
      product_ids: new.product_ids,
      total_amount: new.total_amount,
      order_date: Utc::now(),
    };
    self.staged.orders.insert(order.id, order.clone());
    Ok(order)
  }

  async fn get_order(&mut self, id: OrderId) -> CrmResult<Option<Order>> {
    let mut state = self.state.lock();
    state.touch()?;
    Ok(self.staged.orders.get(&id).or_else(|| state.orders.get(&id)).cloned())
  }

  async fn filter_and_order(&mut self, query: &StoreQuery) -> CrmResult<Vec<Record>> {
    let mut state = self.state.lock();
    state.touch()?;
    Ok(query.apply(self.visible_records(&state, query.kind)))
  }

  async fn summary(&mut self) -> CrmResult<StoreSummary> {
    let mut state = self.state.lock();
    state.touch()?;
    let orders = state.orders.values().chain(self.staged.orders.values());
    let (count, revenue) = orders.fold((0u64, Decimal::ZERO), |(n, sum), o| (n + 1, sum + o.total_amount));
    Ok(StoreSummary {
      customers: (state.customers.len() + self.staged.customers.len()) as u64,
      orders: count,
      revenue,
    })
  }

  async fn commit(mut self: Box<Self>) -> CrmResult<()> {
    let mut state = self.state.lock();
    if let Err(e) = state.touch() {
      warn!(uow = self.id, "Commit failed; staged writes discarded.");
      state.release_reservations(self.id);
      return Err(e);
    }
    let staged = std::mem::take(&mut self.staged);
    for (id, customer) in staged.customers {
      state.emails.insert(customer.email.clone(), EmailOwner::Committed(id));
      state.customers.insert(id, customer);
    }
    state.products.extend(staged.products);
    state.orders.extend(staged.orders);
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> CrmResult<()> {
    // Reservations are released on drop.
    Ok(())
  }
}

impl Drop for MemoryUnitOfWork {
  fn drop(&mut self) {
    self.state.lock().release_reservations(self.id);
  }
}
