// crm_core/src/service.rs

//! `CrmService`: the entry point callers use. Holds the store handle, the
//! pipelines and the query resolver; every call runs in its own unit of work.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::aggregate;
use crate::batch::{BatchCoordinator, BatchOutcome};
use crate::config::QueryConfig;
use crate::error::{CrmError, CrmResult};
use crate::intake::{customer_pipeline, order_pipeline, product_pipeline, CustomerDraft, OrderDraft, ProductDraft};
use crate::model::{Customer, CustomerId, EntityKind, Order, OrderId, OrderTotals, Product, ProductId};
use crate::pipeline::RecordPipeline;
use crate::query::{Page, QueryResolver, QuerySpec};
use crate::store::{Store, StoreSummary, UnitOfWork};

pub const CUSTOMER_CREATED_MESSAGE: &str = "Customer created successfully";

#[derive(Debug, Clone, Serialize)]
pub struct CustomerCreated {
  pub customer: Customer,
  pub message: &'static str,
}

#[derive(Clone)]
pub struct CrmService {
  store: Arc<dyn Store>,
  customers: Arc<RecordPipeline<CustomerDraft>>,
  products: Arc<RecordPipeline<ProductDraft>>,
  orders: Arc<RecordPipeline<OrderDraft>>,
  batches: BatchCoordinator,
  resolver: QueryResolver,
}

impl std::fmt::Debug for CrmService {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CrmService")
      .field("backend", &self.store.backend())
      .field("resolver", &self.resolver)
      .finish()
  }
}

impl CrmService {
  pub fn new(store: Arc<dyn Store>, query_config: QueryConfig) -> Self {
    let customers = Arc::new(customer_pipeline());
    Self {
      store,
      batches: BatchCoordinator::new(Arc::clone(&customers)),
      customers,
      products: Arc::new(product_pipeline()),
      orders: Arc::new(order_pipeline()),
      resolver: QueryResolver::new(query_config),
    }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub fn resolver(&self) -> &QueryResolver {
    &self.resolver
  }

  #[instrument(skip(self, phone), fields(backend = self.store.backend()))]
  pub async fn create_customer(&self, name: &str, email: &str, phone: Option<&str>) -> CrmResult<CustomerCreated> {
    let raw = json!({ "name": name, "email": email, "phone": phone });
    let customer = self.create_customer_from(raw).await?;
    Ok(CustomerCreated {
      customer,
      message: CUSTOMER_CREATED_MESSAGE,
    })
  }

  /// Same checks as `create_customer`, starting from an untyped record.
  pub async fn create_customer_from(&self, raw: Value) -> CrmResult<Customer> {
    let mut draft = CustomerDraft::new(raw);
    let customers = Arc::clone(&self.customers);
    self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          customers.run(uow, &mut draft).await?;
          draft.created.ok_or_else(|| CrmError::store_unavailable("customer was not persisted"))
        })
      })
      .await
  }

  pub async fn bulk_create_customers(&self, records: Vec<Value>) -> CrmResult<BatchOutcome> {
    self.batches.bulk_create_customers(self.store.as_ref(), records).await
  }

  #[instrument(skip_all, fields(backend = self.store.backend()))]
  pub async fn create_product(&self, raw: Value) -> CrmResult<Product> {
    let mut draft = ProductDraft::new(raw);
    let products = Arc::clone(&self.products);
    self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          products.run(uow, &mut draft).await?;
          draft.created.ok_or_else(|| CrmError::store_unavailable("product was not persisted"))
        })
      })
      .await
  }

  /// All-or-nothing: any failure leaves no order behind.
  #[instrument(skip(self, product_ids), fields(backend = self.store.backend(), products = product_ids.len()))]
  pub async fn create_order(&self, customer_id: CustomerId, product_ids: Vec<ProductId>) -> CrmResult<Order> {
    let mut draft = OrderDraft::new(customer_id, product_ids);
    let orders = Arc::clone(&self.orders);
    let order = self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          orders.run(uow, &mut draft).await?;
          draft.created.ok_or_else(|| CrmError::store_unavailable("order was not persisted"))
        })
      })
      .await?;
    info!(order_id = order.id, total = %order.total_amount, "Order created.");
    Ok(order)
  }

  /// Stored snapshot and live recomputation side by side.
  pub async fn order_totals(&self, order_id: OrderId) -> CrmResult<OrderTotals> {
    let mut uow = self.store.begin().await?;
    let result: CrmResult<OrderTotals> = async {
      let order = uow.get_order(order_id).await?.ok_or(CrmError::NotFound {
        entity: EntityKind::Order,
        id: order_id,
      })?;
      let live_total = aggregate::live_total(uow.as_mut(), &order).await?;
      Ok::<_, CrmError>(OrderTotals {
        order_id,
        stored_total: order.total_amount,
        live_total,
      })
    }
    .await;
    uow.rollback().await?;
    result
  }

  pub async fn query(&self, kind: EntityKind, spec: &QuerySpec) -> CrmResult<Page> {
    self.resolver.resolve(self.store.as_ref(), kind, spec).await
  }

  pub async fn summary(&self) -> CrmResult<StoreSummary> {
    let mut uow = self.store.begin().await?;
    let summary = uow.summary().await;
    uow.rollback().await?;
    summary
  }

  pub async fn get_customer(&self, id: CustomerId) -> CrmResult<Customer> {
    let mut uow = self.store.begin().await?;
    let found = uow.get_customer(id).await;
    uow.rollback().await?;
    found?.ok_or(CrmError::NotFound {
      entity: EntityKind::Customer,
      id,
    })
  }

  /// Runs `work` in a fresh unit of work: commit on success, roll back on any error.
  async fn in_unit_of_work<T, F>(&self, work: F) -> CrmResult<T>
  where
    T: Send,
    F: for<'u> FnOnce(
      &'u mut dyn UnitOfWork,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = CrmResult<T>> + Send + 'u>>,
  {
    let mut uow = self.store.begin().await?;
    match work(uow.as_mut()).await {
      Ok(value) => {
        uow.commit().await?;
        Ok(value)
      }
      Err(e) => {
        if let Err(rollback_err) = uow.rollback().await {
          warn!(error = %rollback_err, "Rollback failed.");
        }
        Err(e)
      }
    }
  }
}
