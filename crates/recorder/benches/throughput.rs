use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use recorder::entry::Entry;
use recorder::ring::Ring;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread;

fn single_producer_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_producer_push");
    for capacity in [1024usize, 1 << 16] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let ring = Ring::<u64>::with_capacity(capacity);
            let mut i = 0u64;
            b.iter(|| {
                ring.push(i);
                i = i.wrapping_add(1);
            });
        });
    }
    group.finish();
}

fn concurrent_producers_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_producers_push");
    for producers in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(producers), &producers, |b, &producers| {
            let ring = Arc::new(Ring::<u64>::with_capacity(1 << 16));
            b.iter(|| {
                let handles: Vec<_> = (0..producers)
                    .map(|t| {
                        let ring = Arc::clone(&ring);
                        thread::spawn(move || {
                            for i in 0..1000u64 {
                                ring.push(t as u64 * 1000 + i);
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }
    group.finish();
}

fn emit_hot_path(c: &mut Criterion) {
    let recorder = recorder::Recorder::new("bench.emit", "throughput benchmark recorder", 1 << 16);
    c.bench_function("emit_untraced", |b| {
        b.iter(|| {
            recorder::emit(&recorder, "throughput.rs:0", "tick %d", &[42]);
        });
    });
}

fn entry_construction(c: &mut Criterion) {
    c.bench_function("entry_new", |b| {
        b.iter(|| Entry::new(0, 0, "throughput.rs:0", "%d %d", &[1, 2]));
    });
}

fn cursor_drain(c: &mut Criterion) {
    c.bench_function("read_batch_1024", |b| {
        let ring = Ring::<u64>::with_capacity(2048);
        for i in 0..1024u64 {
            ring.push(i);
        }
        let mut out = [0u64; 1024];
        b.iter_batched(
            || AtomicU64::new(0),
            |cursor| {
                ring.read_batch(&cursor, &mut out);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    single_producer_push,
    concurrent_producers_push,
    emit_hot_path,
    entry_construction,
    cursor_drain
);
criterion_main!(benches);
