// crm_core/src/intake/order.rs

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::aggregate;
use crate::error::{CrmError, CrmResult};
use crate::model::{Customer, CustomerId, EntityKind, NewOrder, Order, Product, ProductId};
use crate::pipeline::{RecordPipeline, RecordStep};
use crate::store::UnitOfWork;

#[derive(Debug, Clone)]
pub struct OrderDraft {
  pub customer_id: CustomerId,
  pub product_ids: Vec<ProductId>,
  pub customer: Option<Customer>,
  pub products: Vec<Product>,
  pub total: Option<Decimal>,
  pub created: Option<Order>,
}

impl OrderDraft {
  pub fn new(customer_id: CustomerId, product_ids: Vec<ProductId>) -> Self {
    Self {
      customer_id,
      product_ids,
      customer: None,
      products: Vec::new(),
      total: None,
      created: None,
    }
  }
}

struct ResolveCustomer;

#[async_trait]
impl RecordStep<OrderDraft> for ResolveCustomer {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut OrderDraft) -> CrmResult<()> {
    let customer = uow.get_customer(draft.customer_id).await?.ok_or(CrmError::NotFound {
      entity: EntityKind::Customer,
      id: draft.customer_id,
    })?;
    draft.customer = Some(customer);
    Ok(())
  }
}

struct ResolveProducts;

#[async_trait]
impl RecordStep<OrderDraft> for ResolveProducts {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut OrderDraft) -> CrmResult<()> {
    draft.products = aggregate::resolve_products(uow, &draft.product_ids).await?;
    Ok(())
  }
}

struct SnapshotTotal;

#[async_trait]
impl RecordStep<OrderDraft> for SnapshotTotal {
  async fn apply(&self, _uow: &mut dyn UnitOfWork, draft: &mut OrderDraft) -> CrmResult<()> {
    draft.total = Some(aggregate::snapshot_total(&draft.products)?);
    Ok(())
  }
}

struct Persist;

#[async_trait]
impl RecordStep<OrderDraft> for Persist {
  async fn apply(&self, uow: &mut dyn UnitOfWork, draft: &mut OrderDraft) -> CrmResult<()> {
    let total_amount = draft.total.ok_or(CrmError::EmptyProductSet)?;
    let new = NewOrder {
      customer_id: draft.customer_id,
      product_ids: draft.products.iter().map(|p| p.id).collect(),
      total_amount,
    };
    draft.created = Some(uow.create_order(new).await?);
    Ok(())
  }
}

/// resolve_customer → resolve_products → snapshot_total → persist
pub fn order_pipeline() -> RecordPipeline<OrderDraft> {
  RecordPipeline::new("order")
    .step("resolve_customer", ResolveCustomer)
    .step("resolve_products", ResolveProducts)
    .step("snapshot_total", SnapshotTotal)
    .step("persist", Persist)
}
