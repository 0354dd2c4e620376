// crm_core/src/uniqueness.rs

//! Uniqueness Checker for the customer natural key (email).
//!
//! This is the optimistic half of a two-phase check. It reads the store as the
//! current unit of work sees it; the store's own unique constraint still has
//! the final word when the insert happens.

use tracing::debug;

use crate::error::{CrmError, CrmResult};
use crate::store::UnitOfWork;

#[derive(Debug, Clone, Copy, Default)]
pub struct UniquenessChecker;

impl UniquenessChecker {
  pub async fn ensure_available(&self, uow: &mut dyn UnitOfWork, email: &str) -> CrmResult<()> {
    match uow.find_customer_by_email(email).await? {
      Some(existing) => {
        debug!(email, existing_id = existing.id, "Email already taken.");
        Err(CrmError::DuplicateKey {
          email: email.to_string(),
        })
      }
      None => Ok(()),
    }
  }
}
