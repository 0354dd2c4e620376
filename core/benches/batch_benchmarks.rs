use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crm_core::{CrmService, EntityKind, MemoryStore, QueryConfig, QuerySpec};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn fresh_service() -> CrmService {
  CrmService::new(Arc::new(MemoryStore::new()), QueryConfig::default())
}

// Every fifth record is invalid so the error path is measured too.
fn records(n: usize) -> Vec<Value> {
  (0..n)
    .map(|i| {
      if i % 5 == 4 {
        json!({ "name": "", "email": format!("user{}@example.com", i) })
      } else {
        json!({ "name": format!("User {}", i), "email": format!("user{}@example.com", i), "phone": "+12345678901" })
      }
    })
    .collect()
}

fn bench_bulk_create_customers(c: &mut Criterion) {
  let mut group = c.benchmark_group("BulkCreateCustomers");
  let rt = Runtime::new().unwrap();

  for size in [10usize, 100, 1000].iter() {
    group.throughput(Throughput::Elements(*size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
      b.to_async(&rt).iter_batched(
        || (fresh_service(), records(size)),
        |(service, batch)| async move { service.bulk_create_customers(batch).await.unwrap() },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_paged_query(c: &mut Criterion) {
  let mut group = c.benchmark_group("PagedQuery");
  let rt = Runtime::new().unwrap();
  let service = fresh_service();
  rt.block_on(async {
    for i in 0..500 {
      service
        .create_product(json!({ "name": format!("Product {}", i), "price": format!("{}.99", i % 50 + 1) }))
        .await
        .unwrap();
    }
  });

  for page_size in [10usize, 50, 100].iter() {
    group.throughput(Throughput::Elements(*page_size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(page_size), page_size, |b, &page_size| {
      let spec = QuerySpec::new()
        .filter("price__gte", "10")
        .order_by("-price")
        .first(page_size);
      b.to_async(&rt).iter(|| {
        let service = service.clone();
        let spec = spec.clone();
        async move { service.query(EntityKind::Product, &spec).await.unwrap() }
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_bulk_create_customers, bench_paged_query);
criterion_main!(benches);
