use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use storefront_catalog::{NewProduct, NewTag, ProductPatch};
use storefront_core::{ProductId, TagId};
use storefront_infra::{CatalogService, InMemoryCatalogStore};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// Service over an in-memory store with `tags` tags and one product linked to
/// the first half of them.
fn seeded(rt: &tokio::runtime::Runtime, tags: i64) -> (CatalogService<InMemoryCatalogStore>, ProductId) {
    rt.block_on(async {
        let service = CatalogService::new(InMemoryCatalogStore::new());
        for i in 1..=tags {
            service
                .create_tag(&NewTag::new(Some(format!("tag-{i}"))).unwrap())
                .await
                .unwrap();
        }
        let linked: Vec<TagId> = (1..=tags / 2).map(TagId::new).collect();
        let new = NewProduct::new(Some("bench".into()), Some(1.0), None, None).unwrap();
        let created = service.create_product(&new, Some(&linked)).await.unwrap();
        (service, created.product.id)
    })
}

/// Alternate between the lower and upper half of the tag range, so every
/// iteration removes and adds `tags / 2` links.
fn bench_tag_swap(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("update_product_tag_swap");

    for tags in [8i64, 64, 512] {
        let (service, id) = seeded(&rt, tags);
        let lower: Vec<TagId> = (1..=tags / 2).map(TagId::new).collect();
        let upper: Vec<TagId> = (tags / 2 + 1..=tags).map(TagId::new).collect();
        let patch = ProductPatch::default();
        let mut flip = false;

        group.throughput(Throughput::Elements(tags as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tags), &tags, |b, _| {
            b.iter(|| {
                flip = !flip;
                let desired = if flip { &upper } else { &lower };
                rt.block_on(service.update_product(id, &patch, Some(black_box(desired.as_slice()))))
                    .unwrap()
            })
        });
    }

    group.finish();
}

/// Desired set equals the current one: read, diff, no link writes.
fn bench_unchanged_update(c: &mut Criterion) {
    let rt = runtime();
    let (service, id) = seeded(&rt, 64);
    let same: Vec<TagId> = (1..=32).map(TagId::new).collect();
    let patch = ProductPatch::default();

    c.bench_function("update_product_unchanged_64", |b| {
        b.iter(|| {
            rt.block_on(service.update_product(id, &patch, Some(black_box(same.as_slice()))))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_tag_swap, bench_unchanged_update);
criterion_main!(benches);
