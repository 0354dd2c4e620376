// crm_server/src/web/handlers/mod.rs

pub mod customer_handlers;
pub mod health_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod query_handlers;
