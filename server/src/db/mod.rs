// crm_server/src/db/mod.rs

//! PostgreSQL backend for the crm-core [`Store`](crm_core::Store) contract.
//!
//! Tables: `customers` (unique `email`), `products`, `orders` and the
//! `order_products` association. The schema in `schema.sql` is applied by
//! [`PgStore::connect`].

pub mod pg_store;
mod rows;

pub use pg_store::PgStore;
