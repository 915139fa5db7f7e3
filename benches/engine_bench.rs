//! SHELF - Performance Benchmarks
//! Measures the cost of each stage of a flush using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use shelf::config::Config;
use shelf::engine::memtable::MemStore;
use shelf::engine::serializer::{BincodeSerializer, GzipSerializer, JsonSerializer, Serializer};
use shelf::engine::snapshot::Snapshot;
use shelf::engine::Shelf;

fn filled_store(n: usize) -> MemStore {
    let mut store = MemStore::new();
    for i in 0..n {
        let key = format!("key_{:06}", i).into_bytes();
        let value = format!("value_{:06}", i).into_bytes();
        store.insert(key, value);
    }
    store
}

fn bench_memstore_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("memstore");

    group.bench_function("insert_1000", |b| {
        b.iter(|| black_box(filled_store(1000)));
    });

    group.bench_function("lookup_hit", |b| {
        let store = filled_store(1000);
        b.iter(|| black_box(store.lookup(b"key_000500")));
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100, 1_000, 10_000] {
        let store = filled_store(size);
        group.bench_with_input(BenchmarkId::new("capture", size), &store, |b, store| {
            b.iter(|| black_box(Snapshot::capture(store).unwrap()));
        });
    }

    group.finish();
}

fn bench_serializers(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    let snapshot = Snapshot::capture(&filled_store(1_000)).unwrap();

    let serializers: Vec<(&str, Box<dyn Serializer>)> = vec![
        ("json", Box::new(JsonSerializer::default()) as Box<dyn Serializer>),
        ("bincode", Box::new(BincodeSerializer)),
        ("gzip_bincode", Box::new(GzipSerializer::new(BincodeSerializer))),
    ];
    for (name, serializer) in &serializers {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(serializer.serialize(snapshot.entries()).unwrap()));
        });
    }

    group.finish();
}

fn bench_sync_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");
    group.sample_size(20);

    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path().join("bench.json"))
        .with_delay_ms(0)
        .with_sync_writes(false)
        .without_backup();
    let shelf = Shelf::open(config).unwrap();
    for i in 0..1_000 {
        shelf
            .put(format!("key_{:06}", i), format!("value_{:06}", i))
            .unwrap();
    }

    // every put rewrites the whole 1000-entry file through the staging protocol
    group.bench_function("put_sync_1000_entries", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            shelf.put(black_box("hot_key"), i.to_string()).unwrap();
        });
    });

    group.finish();
    shelf.close().unwrap();
}

criterion_group!(
    benches,
    bench_memstore_operations,
    bench_snapshot,
    bench_serializers,
    bench_sync_flush
);
criterion_main!(benches);
