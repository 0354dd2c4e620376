// tests/concurrency_tests.rs
mod common;

use common::*;
use crm_core::{EntityKind, ErrorKind, QuerySpec};
use serial_test::serial;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_racing_batches_on_one_email_create_it_once() {
  setup_tracing();
  for round in 0..20 {
    let (service, _store) = service();
    let email = format!("race{}@example.com", round);

    let a = {
      let service = service.clone();
      let records = vec![customer_record("A", &email), customer_record("A2", &format!("a-{}", email))];
      tokio::spawn(async move { service.bulk_create_customers(records).await })
    };
    let b = {
      let service = service.clone();
      let records = vec![customer_record("B", &email), customer_record("B2", &format!("b-{}", email))];
      tokio::spawn(async move { service.bulk_create_customers(records).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    // Neither batch fails as a whole; the loser reports a DuplicateKey record.
    let winners = a.created.iter().chain(&b.created).filter(|c| c.email == email).count();
    assert_eq!(winners, 1, "round {}", round);
    let losers: Vec<_> = a.errors.iter().chain(&b.errors).collect();
    assert_eq!(losers.len(), 1);
    assert_eq!(losers[0].kind(), ErrorKind::DuplicateKey);

    let page = service
      .query(EntityKind::Customer, &QuerySpec::new().filter("email", email.as_str()))
      .await
      .unwrap();
    assert_eq!(page.edges.len(), 1);

    let all = service.query(EntityKind::Customer, &QuerySpec::new()).await.unwrap();
    assert_eq!(all.edges.len(), 3);
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_orders_see_consistent_snapshots() {
  setup_tracing();
  let (service, _store) = service();
  let alice = service.create_customer("Alice", "alice@example.com", None).await.unwrap().customer;
  let p1 = product(&service, "Mouse", "10.00").await;
  let p2 = product(&service, "Keyboard", "15.00").await;

  let customer_id = alice.id;
  let handles: Vec<_> = (0..8)
    .map(|_| {
      let service = service.clone();
      let ids = vec![p1.id, p2.id];
      tokio::spawn(async move { service.create_order(customer_id, ids).await })
    })
    .collect();

  let mut order_ids = Vec::new();
  for handle in handles {
    let order = handle.await.unwrap().unwrap();
    assert_eq!(order.total_amount, money("25.00"));
    order_ids.push(order.id);
  }
  order_ids.sort_unstable();
  order_ids.dedup();
  assert_eq!(order_ids.len(), 8);
}
