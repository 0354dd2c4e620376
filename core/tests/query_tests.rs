// tests/query_tests.rs
mod common;

use common::*;
use crm_core::{CrmService, EntityKind, ErrorKind, QueryConfig, QuerySpec, Record};
use serde_json::json;
use serial_test::serial;
use std::collections::HashSet;

async fn seed_products(service: &CrmService) {
  // Repeated prices force the id tie-break to matter.
  for (name, price) in [
    ("Laptop", "1200.00"),
    ("Phone", "500.00"),
    ("Cable", "5.00"),
    ("Charger", "25.00"),
    ("Case", "25.00"),
    ("Lamp", "25.00"),
    ("Desk", "300.00"),
  ] {
    product(service, name, price).await;
  }
}

async fn collect_all(service: &CrmService, base: QuerySpec) -> (Vec<Record>, usize) {
  let mut out = Vec::new();
  let mut pages = 0;
  let mut after: Option<String> = None;
  loop {
    let mut spec = base.clone();
    spec.after = after.take();
    let page = service.query(EntityKind::Product, &spec).await.unwrap();
    pages += 1;
    out.extend(page.nodes().cloned());
    if !page.page_info.has_next_page {
      assert!(page.edges.len() <= spec.first.unwrap_or(usize::MAX));
      break;
    }
    after = page.page_info.end_cursor.clone();
    assert!(after.is_some());
  }
  (out, pages)
}

#[tokio::test]
#[serial]
async fn test_pagination_is_an_exhaustive_disjoint_partition() {
  setup_tracing();
  let (service, _store) = service();
  seed_products(&service).await;

  let base = QuerySpec::new().order_by("-price").first(2);
  let (paged, pages) = collect_all(&service, base).await;
  assert_eq!(pages, 4);

  let unpaged = service
    .query(EntityKind::Product, &QuerySpec::new().order_by("-price").first(100))
    .await
    .unwrap();
  let expected: Vec<i64> = unpaged.nodes().map(Record::id).collect();
  let got: Vec<i64> = paged.iter().map(Record::id).collect();
  assert_eq!(got, expected);
  assert_eq!(got.iter().collect::<HashSet<_>>().len(), 7);

  // The three 25.00 products come out in id order.
  let cheap: Vec<String> = paged
    .iter()
    .filter_map(|r| r.clone().into_product())
    .filter(|p| p.price == money("25.00"))
    .map(|p| p.name)
    .collect();
  assert_eq!(cheap, vec!["Charger", "Case", "Lamp"]);
}

#[tokio::test]
#[serial]
async fn test_repeated_calls_return_identical_pages() {
  setup_tracing();
  let (service, _store) = service();
  seed_products(&service).await;

  let spec = QuerySpec::new().order_by("price").first(3);
  let first = service.query(EntityKind::Product, &spec).await.unwrap();
  let second = service.query(EntityKind::Product, &spec).await.unwrap();
  let ids = |p: &crm_core::Page| p.nodes().map(Record::id).collect::<Vec<_>>();
  assert_eq!(ids(&first), ids(&second));
  assert_eq!(first.page_info.end_cursor, second.page_info.end_cursor);
}

#[tokio::test]
#[serial]
async fn test_filters_narrow_the_result() {
  setup_tracing();
  let (service, _store) = service();
  seed_products(&service).await;

  let spec = QuerySpec::new()
    .filter("name__icontains", "c")
    .filter("price__lte", "25")
    .order_by("name");
  let page = service.query(EntityKind::Product, &spec).await.unwrap();
  let names: Vec<String> = page
    .nodes()
    .filter_map(|r| r.clone().into_product())
    .map(|p| p.name)
    .collect();
  assert_eq!(names, vec!["Cable", "Case", "Charger"]);
  assert!(!page.page_info.has_next_page);

  let spec = QuerySpec::new().filter("stock__gte", json!(11));
  let page = service.query(EntityKind::Product, &spec).await.unwrap();
  assert!(page.edges.is_empty());
  assert_eq!(page.page_info.end_cursor, None);
}

#[tokio::test]
#[serial]
async fn test_invalid_query_touches_the_store_zero_times() {
  setup_tracing();
  let (service, store) = service();
  seed_products(&service).await;

  let cursor = service
    .query(EntityKind::Product, &QuerySpec::new().order_by("name").first(1))
    .await
    .unwrap()
    .page_info
    .end_cursor
    .unwrap();

  let bad_specs = vec![
    QuerySpec::new().filter("colour", "red"),
    QuerySpec::new().filter("price__icontains", "1"),
    QuerySpec::new().filter("price__gte", "cheap"),
    QuerySpec::new().order_by("colour"),
    QuerySpec::new().order_by("-"),
    QuerySpec::new().first(0),
    QuerySpec::new().after("garbage"),
    // A cursor from a differently ordered query.
    QuerySpec::new().order_by("price").after(cursor),
  ];

  let before = store.operation_count();
  for spec in bad_specs {
    let err = service.query(EntityKind::Product, &spec).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuery, "{:?}", spec);
  }
  assert_eq!(store.operation_count(), before);
}

#[tokio::test]
#[serial]
async fn test_fields_are_per_entity_kind() {
  setup_tracing();
  let (service, _store) = service_with(QueryConfig {
    default_page_size: 5,
    max_page_size: 10,
  });
  service.create_customer("Alice", "alice@example.com", Some("+12345678901")).await.unwrap();

  let ok = service
    .query(EntityKind::Customer, &QuerySpec::new().filter("email__icontains", "ALICE"))
    .await
    .unwrap();
  assert_eq!(ok.edges.len(), 1);

  let err = service
    .query(EntityKind::Customer, &QuerySpec::new().filter("price__gte", 1))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidQuery);

  let err = service
    .query(EntityKind::Customer, &QuerySpec::new().first(11))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidQuery);
}

#[tokio::test]
#[serial]
async fn test_store_fault_mid_query_surfaces_the_fault() {
  setup_tracing();
  let (service, store) = service();
  seed_products(&service).await;

  // `begin` succeeds, the fetch inside the unit of work does not.
  store.fail_after(1);
  let err = service.query(EntityKind::Product, &QuerySpec::new()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

  store.set_offline(false);
  let page = service.query(EntityKind::Product, &QuerySpec::new()).await.unwrap();
  assert_eq!(page.edges.len(), 7);
}
