// crm_core/src/query/mod.rs

//! Filtered Query Resolver.
//!
//! A raw [`QuerySpec`] is planned into a [`StoreQuery`] using the entity's
//! capability descriptor. Planning is pure: a query that names an unknown
//! field, an unsupported lookup or a foreign cursor fails with `InvalidQuery`
//! before any unit of work is opened.

pub mod cursor;
pub mod descriptor;
pub mod filter;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

pub use descriptor::{EntityDescriptor, FieldDescriptor, FieldType, Lookup};
pub use filter::{Predicate, SortKey};

use crate::config::QueryConfig;
use crate::error::{CrmError, CrmResult};
use crate::model::{EntityKind, FieldValue, Record};
use crate::store::Store;

/// A validated query, ready for a store backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
  pub kind: EntityKind,
  pub predicates: Vec<Predicate>,
  /// Always ends with (or contains) the `id` key.
  pub ordering: Vec<SortKey>,
  /// Sort-key tuple of the last row already seen; rows strictly after it are returned.
  pub after: Option<Vec<FieldValue>>,
  pub limit: usize,
}

impl StoreQuery {
  /// In-process evaluation, for stores that hold records in memory.
  pub fn apply<I>(&self, records: I) -> Vec<Record>
  where
    I: IntoIterator<Item = Record>,
  {
    let mut keyed: Vec<(Vec<FieldValue>, Record)> = records
      .into_iter()
      .filter(|r| r.kind() == self.kind && self.predicates.iter().all(|p| p.matches(r)))
      .map(|r| (filter::sort_values(&r, &self.ordering), r))
      .filter(|(keys, _)| match &self.after {
        Some(after) => filter::compare_keys(keys, after, &self.ordering).is_gt(),
        None => true,
      })
      .collect();
    keyed.sort_by(|(a, _), (b, _)| filter::compare_keys(a, b, &self.ordering));
    keyed.into_iter().take(self.limit).map(|(_, r)| r).collect()
  }
}

/// Raw, caller-facing query input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
  pub filter: BTreeMap<String, Value>,
  pub order_by: Vec<String>,
  pub first: Option<usize>,
  pub after: Option<String>,
}

impl QuerySpec {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter.insert(key.into(), value.into());
    self
  }

  pub fn order_by(mut self, field: impl Into<String>) -> Self {
    self.order_by.push(field.into());
    self
  }

  pub fn first(mut self, first: usize) -> Self {
    self.first = Some(first);
    self
  }

  pub fn after(mut self, cursor: impl Into<String>) -> Self {
    self.after = Some(cursor.into());
    self
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Edge {
  pub cursor: String,
  pub node: Record,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  pub has_next_page: bool,
  pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
  pub edges: Vec<Edge>,
  pub page_info: PageInfo,
}

impl Page {
  pub fn nodes(&self) -> impl Iterator<Item = &Record> {
    self.edges.iter().map(|e| &e.node)
  }
}

#[derive(Debug, Clone, Default)]
pub struct QueryResolver {
  config: QueryConfig,
}

impl QueryResolver {
  pub fn new(config: QueryConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &QueryConfig {
    &self.config
  }

  /// Validates `spec` against the kind's descriptor. Never touches a store.
  pub fn plan(&self, kind: EntityKind, spec: &QuerySpec) -> CrmResult<StoreQuery> {
    let descriptor = kind.descriptor();
    let predicates = filter::parse_filters(descriptor, &spec.filter)?;
    let ordering = filter::parse_ordering(descriptor, &spec.order_by)?;

    let page_size = match spec.first {
      None => self.config.default_page_size,
      Some(0) => return Err(CrmError::invalid_query("first must be at least 1")),
      Some(n) if n > self.config.max_page_size => {
        return Err(CrmError::invalid_query(format!(
          "first must not exceed {}",
          self.config.max_page_size
        )))
      }
      Some(n) => n,
    };

    let after = match &spec.after {
      Some(raw) => Some(cursor::decode(raw, kind, &ordering)?),
      None => None,
    };

    Ok(StoreQuery {
      kind,
      predicates,
      ordering,
      after,
      limit: page_size,
    })
  }

  /// Plans, then runs one page of the query in its own unit of work.
  #[instrument(name = "query", skip_all, fields(kind = %kind, backend = store.backend()))]
  pub async fn resolve(&self, store: &dyn Store, kind: EntityKind, spec: &QuerySpec) -> CrmResult<Page> {
    let planned = self.plan(kind, spec)?;
    let page_size = planned.limit;
    // One extra row tells us whether another page exists.
    let lookahead = StoreQuery {
      limit: page_size + 1,
      ..planned
    };

    let mut uow = store.begin().await?;
    let fetched = match uow.filter_and_order(&lookahead).await {
      Ok(rows) => rows,
      Err(e) => {
        if let Err(rollback_err) = uow.rollback().await {
          warn!(error = %rollback_err, "Rollback failed.");
        }
        return Err(e);
      }
    };
    uow.rollback().await?;

    let has_next_page = fetched.len() > page_size;
    let edges: Vec<Edge> = fetched
      .into_iter()
      .take(page_size)
      .map(|node| Edge {
        cursor: cursor::encode(kind, &lookahead.ordering, filter::sort_values(&node, &lookahead.ordering)),
        node,
      })
      .collect();
    let end_cursor = edges.last().map(|e| e.cursor.clone());
    debug!(returned = edges.len(), has_next_page, "Query page resolved.");

    Ok(Page {
      edges,
      page_info: PageInfo {
        has_next_page,
        end_cursor,
      },
    })
  }
}
