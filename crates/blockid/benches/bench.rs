use blockid::{BlockAllocator, SqliteConnectionFactory, SqliteDialect};
use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

// Number of IDs issued per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

fn allocator(dir: &tempfile::TempDir, block_size: i64) -> BlockAllocator<SqliteConnectionFactory> {
    let factory = SqliteConnectionFactory::new(dir.path().join("bench.db"));
    let allocator = BlockAllocator::new(factory, &SqliteDialect);
    allocator.ensure_schema().unwrap();
    // warm the window so the first iteration doesn't pay for row creation
    allocator.next_ids_with("bench", 1, 1, block_size).unwrap();
    allocator
}

/// Single-id requests; `block_size` decides how often a top-up hits SQLite.
fn bench_single(c: &mut Criterion, group_name: &str, block_size: i64) {
    let dir = tempfile::tempdir().unwrap();
    let allocator = allocator(&dir, block_size);

    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));
    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(allocator.next_id("bench").unwrap());
            }
        });
    });
    group.finish();
}

/// One request for `TOTAL_IDS` ids at a time.
fn bench_batch(c: &mut Criterion, group_name: &str, block_size: i64) {
    let dir = tempfile::tempdir().unwrap();
    let allocator = allocator(&dir, block_size);

    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));
    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter(|| black_box(allocator.next_ids("bench", TOTAL_IDS).unwrap()));
    });
    group.finish();
}

/// Same-entity contention across threads sharing one allocator.
fn bench_threaded(c: &mut Criterion, group_name: &str, block_size: i64) {
    let dir = tempfile::tempdir().unwrap();
    let allocator = Arc::new(allocator(&dir, block_size));

    let mut group = c.benchmark_group(group_name);
    for threads in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements((TOTAL_IDS * threads) as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{threads}"), |b| {
            b.iter_custom(|iters| {
                let barrier = Barrier::new(threads + 1);
                let start = scope(|s| {
                    for _ in 0..threads {
                        let allocator = Arc::clone(&allocator);
                        let barrier = &barrier;
                        s.spawn(move || {
                            barrier.wait();
                            for _ in 0..iters {
                                for _ in 0..TOTAL_IDS {
                                    black_box(allocator.next_id("bench").unwrap());
                                }
                            }
                        });
                    }
                    barrier.wait();
                    Instant::now()
                });
                start.elapsed()
            });
        });
    }
    group.finish();
}

fn benchmarks(c: &mut Criterion) {
    bench_single(c, "sqlite/single/block_1000000", 1_000_000);
    bench_single(c, "sqlite/single/block_1024", 1024);
    bench_batch(c, "sqlite/batch/block_1024", 1024);
    bench_threaded(c, "sqlite/threaded/block_1000000", 1_000_000);
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
