// crm_server/src/lib.rs

//! HTTP surface, PostgreSQL store and scheduled jobs for the CRM.

pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod seed;
pub mod state;
pub mod web;

pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use state::AppState;
