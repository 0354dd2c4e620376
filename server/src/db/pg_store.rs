// crm_server/src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::aggregate::unresolved_ids;
use crm_core::query::{FieldType, Lookup, Predicate, SortKey};
use crm_core::validation::{EMAIL_MAX_CHARS, PHONE_MAX_CHARS};
use crm_core::{
  CrmError, Customer, CustomerId, CrmResult, EntityKind, FieldRole, FieldValue, NewCustomer, NewOrder, NewProduct, Order,
  OrderId, Product, ProductId, Record, Store, StoreConfig, StoreQuery, StoreSummary, UnitOfWork,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument, warn};

use super::rows::{CustomerRow, OrderRow, ProductRow, CUSTOMER_COLUMNS, ORDER_COLUMNS, PRODUCT_COLUMNS};

const SCHEMA: &str = include_str!("schema.sql");

/// Driver failures that are not a `Rejection` are store faults.
fn store_err(err: sqlx::Error) -> CrmError {
  CrmError::StoreUnavailable {
    source: anyhow::Error::new(err),
  }
}

/// A failed statement that reflects on the record that issued it, not on
/// the store.
#[derive(Debug)]
enum Rejection {
  /// Lost a race for a unique key: the key exists, or the transaction holding
  /// it deadlocked with ours.
  Conflict,
  /// The row broke a CHECK constraint or did not fit its column.
  Invalid {
    constraint: Option<String>,
    message: String,
  },
}

impl Rejection {
  fn of(err: &sqlx::Error) -> Option<Self> {
    let sqlx::Error::Database(db_err) = err else {
      return None;
    };
    let code = db_err.code()?;
    match code.as_ref() {
      // unique_violation, deadlock_detected, lock_not_available
      "23505" | "40P01" | "55P03" => Some(Rejection::Conflict),
      // check_violation and the data_exception class
      c if c == "23514" || c.starts_with("22") => Some(Rejection::Invalid {
        constraint: db_err.constraint().map(str::to_owned),
        message: db_err.message().to_owned(),
      }),
      _ => None,
    }
  }
}

fn customer_field(new: &NewCustomer) -> FieldRole {
  if new.email.chars().count() > EMAIL_MAX_CHARS {
    FieldRole::Email
  } else if new.phone.as_deref().is_some_and(|p| p.chars().count() > PHONE_MAX_CHARS) {
    FieldRole::Phone
  } else {
    FieldRole::Name
  }
}

fn product_field(constraint: Option<&str>, message: &str) -> FieldRole {
  match constraint {
    Some(c) if c.contains("stock") => FieldRole::Stock,
    Some(c) if c.contains("price") => FieldRole::Price,
    _ if message.contains("character varying") => FieldRole::Name,
    _ => FieldRole::Price,
  }
}

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  /// Connects a pool sized by `config` and applies the schema.
  #[instrument(name = "pg_store::connect", skip(config), fields(url = %config.redacted_url()))]
  pub async fn connect(config: &StoreConfig) -> CrmResult<Self> {
    let url = config
      .database_url
      .as_deref()
      .ok_or_else(|| CrmError::store_unavailable("no database url configured"))?;

    let pool = PgPoolOptions::new()
      .max_connections(config.max_connections)
      .acquire_timeout(config.acquire_timeout)
      .connect(url)
      .await
      .map_err(store_err)?;
    info!(max_connections = config.max_connections, "Connected to PostgreSQL.");

    let store = Self { pool };
    store.migrate().await?;
    Ok(store)
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  pub async fn migrate(&self) -> CrmResult<()> {
    sqlx::raw_sql(SCHEMA).execute(&self.pool).await.map_err(store_err)?;
    debug!("Schema applied.");
    Ok(())
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> CrmResult<Box<dyn UnitOfWork>> {
    let tx = self.pool.begin().await.map_err(store_err)?;
    Ok(Box::new(PgUnitOfWork { tx }))
  }

  async fn ping(&self) -> CrmResult<()> {
    sqlx::query("SELECT 1").execute(&self.pool).await.map_err(store_err)?;
    Ok(())
  }

  fn backend(&self) -> &'static str {
    "postgres"
  }
}

/// One database transaction. Dropping it without commit rolls it back.
pub struct PgUnitOfWork {
  tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
  async fn execute(&mut self, sql: &str) -> CrmResult<()> {
    sqlx::query(sql).execute(&mut *self.tx).await.map_err(store_err)?;
    Ok(())
  }

  /// Settles a savepoint after a single-row statement. A rejection rolls the
  /// savepoint back so the rest of the unit of work stays usable.
  async fn settle<T>(&mut self, savepoint: &str, outcome: Result<T, sqlx::Error>) -> CrmResult<Result<T, Rejection>> {
    match outcome {
      Ok(value) => {
        self.execute(&format!("RELEASE SAVEPOINT {}", savepoint)).await?;
        Ok(Ok(value))
      }
      Err(e) => match Rejection::of(&e) {
        Some(rejection) => {
          self.execute(&format!("ROLLBACK TO SAVEPOINT {}", savepoint)).await?;
          debug!(savepoint, error = %e, "Rolled back to savepoint.");
          Ok(Err(rejection))
        }
        None => Err(store_err(e)),
      },
    }
  }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
  async fn find_customer_by_email(&mut self, email: &str) -> CrmResult<Option<Customer>> {
    let row: Option<CustomerRow> = sqlx::query_as(&format!("SELECT {} FROM customers t WHERE t.email = $1", CUSTOMER_COLUMNS))
      .bind(email)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(store_err)?;
    Ok(row.map(Customer::from))
  }

  async fn create_customer(&mut self, new: NewCustomer) -> CrmResult<Customer> {
    // A failed statement poisons the whole transaction.
    self.execute("SAVEPOINT customer_insert").await?;

    let inserted: Result<CustomerRow, sqlx::Error> =
      sqlx::query_as("INSERT INTO customers (name, email, phone) VALUES ($1, $2, $3) RETURNING id, name, email, phone")
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .fetch_one(&mut *self.tx)
        .await;

    match self.settle("customer_insert", inserted).await? {
      Ok(row) => Ok(row.into()),
      Err(Rejection::Conflict) => {
        warn!(email = %new.email, "Customer email lost to another writer.");
        Err(CrmError::DuplicateKey { email: new.email })
      }
      Err(Rejection::Invalid { message, .. }) => {
        warn!(email = %new.email, %message, "Customer row rejected by the schema.");
        Err(CrmError::InvalidValue {
          field: customer_field(&new),
          message,
        })
      }
    }
  }

  async fn get_customer(&mut self, id: CustomerId) -> CrmResult<Option<Customer>> {
    let row: Option<CustomerRow> = sqlx::query_as(&format!("SELECT {} FROM customers t WHERE t.id = $1", CUSTOMER_COLUMNS))
      .bind(id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(store_err)?;
    Ok(row.map(Customer::from))
  }

  async fn create_product(&mut self, new: NewProduct) -> CrmResult<Product> {
    self.execute("SAVEPOINT product_insert").await?;
    let inserted: Result<ProductRow, sqlx::Error> =
      sqlx::query_as("INSERT INTO products (name, price, stock) VALUES ($1, $2, $3) RETURNING id, name, price, stock")
        .bind(&new.name)
        .bind(new.price)
        .bind(new.stock)
        .fetch_one(&mut *self.tx)
        .await;

    match self.settle("product_insert", inserted).await? {
      Ok(row) => Ok(row.into()),
      Err(Rejection::Invalid { constraint, message }) => {
        warn!(name = %new.name, %message, "Product row rejected by the schema.");
        Err(CrmError::InvalidValue {
          field: product_field(constraint.as_deref(), &message),
          message,
        })
      }
      Err(Rejection::Conflict) => Err(CrmError::store_unavailable("product insert conflicted with another writer")),
    }
  }

  async fn get_products(&mut self, ids: &[ProductId]) -> CrmResult<Vec<Product>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
      "SELECT {} FROM products t WHERE t.id = ANY($1) ORDER BY t.id",
      PRODUCT_COLUMNS
    ))
    .bind(ids)
    .fetch_all(&mut *self.tx)
    .await
    .map_err(store_err)?;
    Ok(rows.into_iter().map(Product::from).collect())
  }

  async fn create_order(&mut self, new: NewOrder) -> CrmResult<Order> {
    let customer: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1")
      .bind(new.customer_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(store_err)?;
    if customer.is_none() {
      return Err(CrmError::NotFound {
        entity: EntityKind::Customer,
        id: new.customer_id,
      });
    }
    if new.product_ids.is_empty() {
      return Err(CrmError::EmptyProductSet);
    }

    let product_ids = new.product_ids;
    let found: Vec<ProductId> = sqlx::query_scalar("SELECT id FROM products WHERE id = ANY($1)")
      .bind(&product_ids)
      .fetch_all(&mut *self.tx)
      .await
      .map_err(store_err)?;
    let missing = unresolved_ids(&product_ids, |id| found.contains(&id));
    if !missing.is_empty() {
      return Err(CrmError::UnknownProduct { missing });
    }

    self.execute("SAVEPOINT order_insert").await?;
    let inserted: Result<(OrderId, DateTime<Utc>), sqlx::Error> =
      sqlx::query_as("INSERT INTO orders (customer_id, total_amount) VALUES ($1, $2) RETURNING id, order_date")
        .bind(new.customer_id)
        .bind(new.total_amount)
        .fetch_one(&mut *self.tx)
        .await;
    let (id, order_date) = match self.settle("order_insert", inserted).await? {
      Ok(created) => created,
      Err(Rejection::Invalid { message, .. }) => {
        return Err(CrmError::InvalidValue {
          field: FieldRole::Total,
          message,
        })
      }
      Err(Rejection::Conflict) => return Err(CrmError::store_unavailable("order insert conflicted with another writer")),
    };

    sqlx::query("INSERT INTO order_products (order_id, product_id) SELECT $1, UNNEST($2::BIGINT[])")
      .bind(id)
      .bind(&product_ids)
      .execute(&mut *self.tx)
      .await
      .map_err(store_err)?;

    Ok(Order {
      id,
      customer_id: new.customer_id,
      product_ids,
      total_amount: new.total_amount,
      order_date,
    })
  }

  async fn get_order(&mut self, id: OrderId) -> CrmResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {} FROM orders t WHERE t.id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(store_err)?;
    Ok(row.map(Order::from))
  }

  #[instrument(name = "pg_store::filter_and_order", skip_all, fields(kind = %query.kind))]
  async fn filter_and_order(&mut self, query: &StoreQuery) -> CrmResult<Vec<Record>> {
    let mut builder = select_for(query)?;
    debug!(sql = builder.sql(), "Running filtered query.");

    let records = match query.kind {
      EntityKind::Customer => builder
        .build_query_as::<CustomerRow>()
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?
        .into_iter()
        .map(Record::from)
        .collect(),
      EntityKind::Product => builder
        .build_query_as::<ProductRow>()
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?
        .into_iter()
        .map(Record::from)
        .collect(),
      EntityKind::Order => builder
        .build_query_as::<OrderRow>()
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?
        .into_iter()
        .map(Record::from)
        .collect(),
    };
    Ok(records)
  }

  async fn summary(&mut self) -> CrmResult<StoreSummary> {
    let (customers, orders, revenue): (i64, i64, Decimal) = sqlx::query_as(
      "SELECT (SELECT COUNT(*) FROM customers), (SELECT COUNT(*) FROM orders), \
       (SELECT COALESCE(SUM(total_amount), 0) FROM orders)",
    )
    .fetch_one(&mut *self.tx)
    .await
    .map_err(store_err)?;

    Ok(StoreSummary {
      customers: u64::try_from(customers).unwrap_or(0),
      orders: u64::try_from(orders).unwrap_or(0),
      revenue,
    })
  }

  async fn commit(self: Box<Self>) -> CrmResult<()> {
    self.tx.commit().await.map_err(store_err)
  }

  async fn rollback(self: Box<Self>) -> CrmResult<()> {
    self.tx.rollback().await.map_err(store_err)
  }
}

fn columns_for(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Customer => CUSTOMER_COLUMNS,
    EntityKind::Product => PRODUCT_COLUMNS,
    EntityKind::Order => ORDER_COLUMNS,
  }
}

/// Builds the keyset-paginated SELECT for an already validated query.
/// Column names only ever come from the static descriptors.
pub(crate) fn select_for(query: &StoreQuery) -> CrmResult<QueryBuilder<'static, Postgres>> {
  let descriptor = query.kind.descriptor();
  let mut builder = QueryBuilder::new(format!(
    "SELECT {} FROM {} t WHERE TRUE",
    columns_for(query.kind),
    descriptor.table
  ));

  for predicate in &query.predicates {
    builder.push(" AND ");
    push_predicate(&mut builder, predicate)?;
  }

  if let Some(after) = &query.after {
    builder.push(" AND (");
    push_keyset(&mut builder, &query.ordering, after)?;
    builder.push(")");
  }

  builder.push(" ORDER BY ");
  for (i, key) in query.ordering.iter().enumerate() {
    if i > 0 {
      builder.push(", ");
    }
    builder.push(column(key));
    builder.push(if key.descending { " DESC" } else { " ASC" });
  }

  builder.push(" LIMIT ");
  builder.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
  Ok(builder)
}

/// Text sorts bytewise so that SQL and in-memory stores page identically.
fn column(key: &SortKey) -> String {
  match key.field.ty {
    FieldType::Text => format!("t.{} COLLATE \"C\"", key.field.name),
    _ => format!("t.{}", key.field.name),
  }
}

fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) -> CrmResult<()> {
  let name = predicate.field.name;
  match predicate.lookup {
    Lookup::IContains | Lookup::StartsWith => {
      let text = predicate
        .value
        .as_text()
        .ok_or_else(|| CrmError::InvalidQuery(format!("'{}' needs a text value", name)))?;
      let escaped = escape_like(text);
      if predicate.lookup == Lookup::IContains {
        builder.push(format!("t.{} ILIKE ", name));
        builder.push_bind(format!("%{}%", escaped));
      } else {
        builder.push(format!("t.{} LIKE ", name));
        builder.push_bind(format!("{}%", escaped));
      }
      Ok(())
    }
    Lookup::Exact => push_comparison(builder, &format!("t.{}", name), "=", &predicate.value),
    Lookup::Gte => push_comparison(builder, &format!("t.{}", name), ">=", &predicate.value),
    Lookup::Lte => push_comparison(builder, &format!("t.{}", name), "<=", &predicate.value),
  }
}

/// `(k1 > v1) OR (k1 = v1 AND k2 > v2) OR ...`, flipping `>` for descending keys.
fn push_keyset(builder: &mut QueryBuilder<'static, Postgres>, ordering: &[SortKey], after: &[FieldValue]) -> CrmResult<()> {
  for i in 0..ordering.len() {
    if i > 0 {
      builder.push(" OR ");
    }
    builder.push("(");
    for (key, value) in ordering[..i].iter().zip(after) {
      push_comparison(builder, &column(key), "=", value)?;
      builder.push(" AND ");
    }
    let key = &ordering[i];
    let op = if key.descending { "<" } else { ">" };
    push_comparison(builder, &column(key), op, &after[i])?;
    builder.push(")");
  }
  Ok(())
}

fn push_comparison(builder: &mut QueryBuilder<'static, Postgres>, lhs: &str, op: &str, value: &FieldValue) -> CrmResult<()> {
  builder.push(format!("{} {} ", lhs, op));
  match value {
    FieldValue::Id(v) | FieldValue::Integer(v) => {
      builder.push_bind(*v);
    }
    FieldValue::Text(v) => {
      builder.push_bind(v.clone());
    }
    FieldValue::Decimal(v) => {
      builder.push_bind(*v);
    }
    FieldValue::Timestamp(v) => {
      builder.push_bind(*v);
    }
    FieldValue::Null => return Err(CrmError::InvalidQuery(format!("cannot compare {} with null", lhs))),
  }
  Ok(())
}

fn escape_like(raw: &str) -> String {
  let mut escaped = String::with_capacity(raw.len());
  for c in raw.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

#[cfg(test)]
mod tests {
  use super::*;
  use crm_core::{QueryResolver, QuerySpec};

  #[test]
  fn schema_rejections_name_the_offending_field() {
    assert_eq!(product_field(Some("products_stock_check"), "violates check constraint"), FieldRole::Stock);
    assert_eq!(product_field(Some("products_price_check"), "violates check constraint"), FieldRole::Price);
    assert_eq!(
      product_field(None, "value too long for type character varying(255)"),
      FieldRole::Name
    );
    assert_eq!(product_field(None, "numeric field overflow"), FieldRole::Price);

    let long_email = NewCustomer {
      name: "Alice".into(),
      email: format!("{}@example.com", "a".repeat(EMAIL_MAX_CHARS)),
      phone: None,
    };
    assert_eq!(customer_field(&long_email), FieldRole::Email);
    let long_name = NewCustomer {
      name: "n".repeat(300),
      email: "alice@example.com".into(),
      phone: Some("+1234567890".into()),
    };
    assert_eq!(customer_field(&long_name), FieldRole::Name);
  }

  #[test]
  fn non_database_errors_are_not_rejections() {
    assert!(Rejection::of(&sqlx::Error::RowNotFound).is_none());
  }

  #[test]
  fn like_patterns_are_escaped() {
    assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
  }

  #[test]
  fn keyset_select_orders_by_every_key() {
    let resolver = QueryResolver::default();
    let spec = QuerySpec::new().filter("name__icontains", "lap").order_by("-price").first(5);
    let mut query = resolver.plan(EntityKind::Product, &spec).unwrap();
    query.after = Some(vec![FieldValue::Decimal(Decimal::new(1000, 2)), FieldValue::Id(3)]);

    let builder = select_for(&query).unwrap();
    let sql = builder.sql();
    assert!(sql.starts_with("SELECT t.id, t.name, t.price, t.stock FROM products t WHERE TRUE"));
    assert!(sql.contains("t.name ILIKE $1"));
    assert!(sql.contains("((t.price < $2) OR (t.price = $3 AND t.id > $4))"));
    assert!(sql.ends_with("ORDER BY t.price DESC, t.id ASC LIMIT $5"));
  }

  #[test]
  fn text_keys_sort_bytewise() {
    let resolver = QueryResolver::default();
    let query = resolver
      .plan(EntityKind::Customer, &QuerySpec::new().order_by("name"))
      .unwrap();
    let builder = select_for(&query).unwrap();
    assert!(builder.sql().contains("ORDER BY t.name COLLATE \"C\" ASC, t.id ASC"));
  }
}
