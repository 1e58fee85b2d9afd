use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use keydir::{Options, Store, SyncPolicy};

const N: usize = 10_000;

fn populated() -> Store {
    let store = Store::new();
    for i in 0..N {
        store.put(format!("key{i:06}"), vec![0u8; 100]).unwrap();
    }
    store
}

fn bench_put(c: &mut Criterion) {
    c.bench_function("put_10k_memory", |b| {
        b.iter_batched(
            Store::new,
            |store| {
                for i in 0..N {
                    store.put(format!("key{i:06}"), vec![0u8; 100]).unwrap();
                }
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("put_1k_file_manual_sync", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let options = Options::default().with_sync_policy(SyncPolicy::Manual);
                let store = Store::open(dir.path().join("bench.log"), options).unwrap();
                (dir, store)
            },
            |(_dir, store)| {
                for i in 0..1_000 {
                    store.put(format!("key{i:06}"), vec![0u8; 100]).unwrap();
                }
                store.sync().unwrap();
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_get(c: &mut Criterion) {
    let store = populated();
    let mut i = 0usize;
    c.bench_function("get_hit", |b| {
        b.iter(|| {
            i = (i + 7919) % N;
            black_box(store.get(&format!("key{i:06}")).unwrap())
        })
    });
    c.bench_function("get_miss", |b| b.iter(|| black_box(store.get("absent").unwrap())));
}

fn bench_delete(c: &mut Criterion) {
    c.bench_function("delete_10k", |b| {
        b.iter_batched(
            populated,
            |store| {
                for i in 0..N {
                    store.delete(format!("key{i:06}")).unwrap();
                }
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_put, bench_get, bench_delete);
criterion_main!(benches);
