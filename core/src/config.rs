// crm_core/src/config.rs

//! Explicit configuration objects. Components receive these through their
//! constructors; nothing in the crate reads process-wide endpoint constants.

use std::time::Duration;

/// Where the persistence store lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
  /// Connection string including credentials. `None` selects the in-memory store.
  pub database_url: Option<String>,
  pub max_connections: u32,
  /// Upper bound on waiting for a pooled connection. The core never times out
  /// on its own; this is the store's budget.
  pub acquire_timeout: Duration,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      database_url: None,
      max_connections: 5,
      acquire_timeout: Duration::from_secs(5),
    }
  }
}

impl StoreConfig {
  pub fn in_memory() -> Self {
    Self::default()
  }

  pub fn postgres(database_url: impl Into<String>) -> Self {
    Self {
      database_url: Some(database_url.into()),
      ..Self::default()
    }
  }

  /// Connection string with the password masked, safe for logs.
  pub fn redacted_url(&self) -> String {
    match &self.database_url {
      None => "memory://".to_string(),
      Some(url) => match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end + 3 => {
          let userinfo = &url[scheme_end + 3..at];
          let user = userinfo.split(':').next().unwrap_or_default();
          format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..])
        }
        _ => url.clone(),
      },
    }
  }
}

/// Paging limits for the filtered query resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
  pub default_page_size: usize,
  pub max_page_size: usize,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      default_page_size: 20,
      max_page_size: 100,
    }
  }
}
