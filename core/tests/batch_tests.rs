// tests/batch_tests.rs
mod common;

use common::*;
use crm_core::{EntityKind, ErrorKind, QuerySpec};
use serde_json::{json, Value};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_every_record_is_either_created_or_reported() {
  setup_tracing();
  let (service, _store) = service();
  let records = vec![
    customer_record("Alice", "alice@example.com"),
    json!({ "name": "", "email": "noname@example.com" }),
    json!({ "name": "Carol", "email": "carol@example.com", "phone": "abc" }),
    json!({ "name": "Dave", "email": "dave@example.com", "phone": "123-456-7890" }),
    json!(42),
    customer_record("Erin", "not-an-email"),
  ];
  let n = records.len();

  let outcome = service.bulk_create_customers(records).await.unwrap();

  assert_eq!(outcome.created.len() + outcome.errors.len(), n);
  assert_eq!(outcome.processed(), n);
  let names: Vec<&str> = outcome.created.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, vec!["Alice", "Dave"]);

  let kinds: Vec<ErrorKind> = outcome.errors.iter().map(|e| e.kind()).collect();
  assert_eq!(
    kinds,
    vec![
      ErrorKind::MissingField,
      ErrorKind::InvalidFormat,
      ErrorKind::MissingField,
      ErrorKind::InvalidFormat
    ]
  );
  let indices: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
  assert_eq!(indices, vec![1, 2, 4, 5]);
  assert_eq!(outcome.errors[1].email.as_deref(), Some("carol@example.com"));
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_in_one_batch_yields_one_success() {
  setup_tracing();
  for flipped in [false, true] {
    let (service, _store) = service();
    let mut records = vec![
      customer_record("First", "same@example.com"),
      customer_record("Second", "same@example.com"),
    ];
    if flipped {
      records.reverse();
    }

    let outcome = service.bulk_create_customers(records).await.unwrap();

    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind(), ErrorKind::DuplicateKey);
    assert_eq!(outcome.errors[0].index, 1);
    assert!(outcome.messages()[0].contains("same@example.com"));
  }
}

#[tokio::test]
#[serial]
async fn test_failed_record_does_not_block_later_ones() {
  setup_tracing();
  let (service, _store) = service();
  let records = vec![
    json!({ "name": "Bad", "email": "bad@example.com", "phone": "12345" }),
    customer_record("Good", "bad@example.com"),
  ];

  let outcome = service.bulk_create_customers(records).await.unwrap();

  assert_eq!(outcome.errors.len(), 1);
  assert_eq!(outcome.created.len(), 1);
  assert_eq!(outcome.created[0].email, "bad@example.com");
}

#[tokio::test]
#[serial]
async fn test_batch_is_committed_despite_failures() {
  setup_tracing();
  let (service, _store) = service();
  let outcome = service
    .bulk_create_customers(vec![
      customer_record("Alice", "alice@example.com"),
      json!({ "email": "missing-name@example.com" }),
    ])
    .await
    .unwrap();
  assert_eq!(outcome.created.len(), 1);

  let page = service.query(EntityKind::Customer, &QuerySpec::new()).await.unwrap();
  assert_eq!(page.edges.len(), 1);

  // Existing customers are seen by the uniqueness check of a later batch.
  let again = service
    .bulk_create_customers(vec![customer_record("Alice 2", "alice@example.com")])
    .await
    .unwrap();
  assert_eq!(again.errors[0].kind(), ErrorKind::DuplicateKey);
}

#[tokio::test]
#[serial]
async fn test_empty_batch_is_trivial() {
  setup_tracing();
  let (service, store) = service();
  let before = store.operation_count();

  let outcome = service.bulk_create_customers(Vec::<Value>::new()).await.unwrap();

  assert!(outcome.created.is_empty());
  assert!(outcome.errors.is_empty());
  assert_eq!(store.operation_count(), before);
}

#[tokio::test]
#[serial]
async fn test_store_fault_discards_the_whole_batch() {
  setup_tracing();
  let (service, store) = service();
  // begin, Alice's lookup and insert, Bob's lookup; Bob's insert then fails.
  store.fail_after(4);

  let err = service
    .bulk_create_customers(vec![
      customer_record("Alice", "alice@example.com"),
      customer_record("Bob", "bob@example.com"),
    ])
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

  store.set_offline(false);
  let page = service.query(EntityKind::Customer, &QuerySpec::new()).await.unwrap();
  assert!(page.edges.is_empty());
}
