//! Performance benchmarks for inventory-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use inventory_engine::{merge, CollectionKind, Inventory, Item, Project, PullResponse, ReleaseMode};
use serde_json::{json, Value};

fn item_batch(size: usize) -> Vec<Value> {
    (0..size)
        .map(|i| {
            json!({
                "id": format!("item_{i}"),
                "name": format!("Item {i}"),
                "count": 100,
                "photos": [format!("file:///photos/{i}.jpg")],
                "reserved": [format!("project_{}", i % 10)],
            })
        })
        .collect()
}

fn project_batch(size: usize) -> Vec<Value> {
    (0..size)
        .map(|i| {
            json!({
                "id": format!("project_{i}"),
                "name": format!("Project {i}"),
                "reserved": [
                    {"itemId": format!("item_{i}"), "count": 2},
                    {"itemId": format!("item_{}", i + 1), "count": 1},
                ],
            })
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("insert_items", size), size, |b, &size| {
            let incoming = item_batch(size);
            b.iter(|| {
                merge(
                    CollectionKind::WarehouseItems,
                    Vec::new(),
                    black_box(incoming.clone()),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("update_items", size), size, |b, &size| {
            let existing = item_batch(size);
            let incoming: Vec<Value> = (0..size)
                .map(|i| json!({"id": format!("item_{i}"), "count": 50, "reserved": []}))
                .collect();
            b.iter(|| {
                merge(
                    CollectionKind::WarehouseItems,
                    black_box(existing.clone()),
                    black_box(incoming.clone()),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("insert_projects", size), size, |b, &size| {
            let incoming = project_batch(size);
            b.iter(|| merge(CollectionKind::Projects, Vec::new(), black_box(incoming.clone())))
        });
    }

    group.finish();
}

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("reserve_release", size), size, |b, &size| {
            let mut inventory = Inventory::new();
            for i in 0..size {
                inventory
                    .insert_item(Item::new(format!("item_{i}"), "Item", 1_000))
                    .unwrap();
                inventory
                    .insert_project(Project::new(format!("project_{i}"), "Project"))
                    .unwrap();
            }
            let last_item = format!("item_{}", size - 1);
            let last_project = format!("project_{}", size - 1);

            b.iter(|| {
                inventory
                    .reserve(black_box(&last_item), black_box(&last_project), 5)
                    .unwrap();
                inventory
                    .release(&last_item, &last_project, ReleaseMode::Restore)
                    .unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("check", size), size, |b, &size| {
            let items = merge(CollectionKind::WarehouseItems, Vec::new(), item_batch(size));
            let projects = merge(CollectionKind::Projects, Vec::new(), project_batch(size));
            let inventory =
                Inventory::from_collections(items.records, projects.records, Vec::new()).unwrap();

            b.iter(|| black_box(&inventory).check())
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    group.bench_function("pull_response_parse", |b| {
        let body = json!({
            "warehouseItems": item_batch(100),
            "projects": project_batch(100),
            "updatedTimestamps": {"warehouseItems": 1706745600000u64, "projects": 1706745600000u64},
        })
        .to_string();

        b.iter(|| PullResponse::from_json(black_box(&body)))
    });

    group.bench_function("decode_inventory", |b| {
        let items = item_batch(1000);
        let projects = project_batch(1000);

        b.iter(|| {
            Inventory::from_collections(
                black_box(items.clone()),
                black_box(projects.clone()),
                Vec::new(),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_merge, bench_ledger, bench_serialization);
criterion_main!(benches);
