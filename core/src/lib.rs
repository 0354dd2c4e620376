// src/lib.rs

//! crm-core: the record layer of a customer/product/order backend.
//!
//! It provides:
//!  - Field validation for names, emails, phones, prices and stock.
//!  - Batch customer creation with partial success under one unit of work.
//!  - Snapshot and live order totals.
//!  - Filtered, ordered, cursor-paginated queries driven by per-entity
//!    capability descriptors.
//!  - A persistence [`Store`] contract with an in-memory implementation.

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod error;
pub mod intake;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod service;
pub mod store;
pub mod uniqueness;
pub mod validation;

// --- Re-exports for the Public API ---

pub use crate::batch::{BatchCoordinator, BatchOutcome, BatchSummary};
pub use crate::config::{QueryConfig, StoreConfig};
pub use crate::error::{CrmError, CrmResult, ErrorKind, FieldRole, RecordError};
pub use crate::model::{
  Customer, CustomerId, EntityKind, FieldValue, NewCustomer, NewOrder, NewProduct, Order, OrderId, OrderTotals,
  Product, ProductId, Record,
};
pub use crate::pipeline::{RecordPipeline, RecordStep};
pub use crate::query::{Edge, Page, PageInfo, QueryResolver, QuerySpec, StoreQuery};
pub use crate::report::CrmReport;
pub use crate::service::{CrmService, CustomerCreated, CUSTOMER_CREATED_MESSAGE};
pub use crate::store::{MemoryStore, Store, StoreSummary, UnitOfWork};
pub use crate::uniqueness::UniquenessChecker;
