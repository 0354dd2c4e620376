// crm_core/src/model/mod.rs

//! Entity records as the store hands them out.

pub mod customer;
pub mod order;
pub mod product;
pub mod record;

pub use customer::{Customer, CustomerId, NewCustomer};
pub use order::{NewOrder, Order, OrderId, OrderTotals};
pub use product::{NewProduct, Product, ProductId};
pub use record::{EntityKind, FieldValue, Record};
