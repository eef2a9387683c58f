use criterion::{Criterion, criterion_group, criterion_main};
use domain::{FilterMap, InventoryService, LineDraft, Product};
use store::InMemoryStore;

fn bench_consume(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = InventoryService::new(InMemoryStore::new());
    let product = rt.block_on(async {
        service
            .create_product(Product::new("h2oh", i64::MAX / 2, 50))
            .await
            .unwrap()
    });

    c.bench_function("domain/consume_stocked", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.consume_product(product.id, 1).await.unwrap();
            });
        });
    });
}

fn bench_replenishment_merge(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = InventoryService::new(InMemoryStore::new());
    let product = rt.block_on(async {
        service
            .create_product(Product::new("juice", 90, 110))
            .await
            .unwrap()
    });

    c.bench_function("domain/merge_open_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .orders()
                    .add_or_create_line(product.id, LineDraft::quantity(20))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_approve_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/open_approve_confirm_conclude", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = InventoryService::new(InMemoryStore::new());
                for i in 0..10 {
                    service
                        .create_product(Product::new(format!("p{i}"), 5, 10))
                        .await
                        .unwrap();
                }
                let order_id = service.get_open_order().await.unwrap().id();
                let purchase = service.approve_order(order_id).await.unwrap();
                service.confirm_purchase(purchase.id).await.unwrap();
                service.conclude_purchase(purchase.id).await.unwrap();
            });
        });
    });
}

fn bench_filter_map(c: &mut Criterion) {
    let pairs = [
        ("gte", "quantity|200"),
        ("gte", "approved_at|123456789"),
        ("eq", "product_id|45"),
        ("eq", "name|h2oh"),
        ("eq", "2"),
    ];

    c.bench_function("domain/filter_map_to_predicate", |b| {
        b.iter(|| FilterMap::from_pairs(pairs).to_string());
    });
}

criterion_group!(
    benches,
    bench_consume,
    bench_replenishment_merge,
    bench_approve_cycle,
    bench_filter_map,
);
criterion_main!(benches);
