//! Performance benchmarks for ingestion, diffing and fan-out.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use radarcast::{
    DeltaBatch, ObjectChange, ObjectStateStore, SessionEvent, SessionHeader, SnapshotDiffer,
    SubscriberHub,
};

fn populated_store(objects: u64) -> ObjectStateStore {
    let store = ObjectStateStore::new();
    store.initialize(&SessionHeader::new("bench")).unwrap();
    store.apply(
        (0..objects)
            .map(|id| {
                ObjectChange::create(id)
                    .with_type("Air")
                    .with_property("Name", "F-16C_50")
                    .with_property("Pilot", format!("Pilot {}", id))
            })
            .collect(),
    );
    store
}

/// Benchmark applying batches of varying size
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for batch_size in [1u64, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("batch_size", batch_size),
            &batch_size,
            |b, &size| {
                let store = populated_store(size);
                let batch: DeltaBatch = (0..size)
                    .map(|id| ObjectChange::update(id).with_property("Altitude", "7500"))
                    .collect();

                b.iter(|| {
                    black_box(store.apply(batch.clone()));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a diff cycle where every object changed
fn bench_diff_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_tick");

    for objects in [100u64, 1000, 5000] {
        group.bench_with_input(BenchmarkId::new("objects", objects), &objects, |b, &n| {
            let store = populated_store(n);
            let mut differ = SnapshotDiffer::new();
            let touch: DeltaBatch = (0..n).map(ObjectChange::update).collect();

            b.iter(|| {
                store.apply(touch.clone());
                black_box(differ.tick(&store));
            });
        });
    }

    group.finish();
}

/// Benchmark publishing one snapshot to many subscribers
fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fanout");

    let store = populated_store(200);
    let mut differ = SnapshotDiffer::new();
    let snapshot = differ.tick(&store).unwrap_or_default();
    let event = SessionEvent::RadarSnapshot(snapshot);

    for subscribers in [1usize, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &n| {
                let hub = SubscriberHub::new();
                let subs: Vec<_> = (0..n).map(|_| hub.subscribe()).collect();

                b.iter(|| {
                    black_box(hub.publish(&event).unwrap());
                    for sub in &subs {
                        while sub.try_recv().is_ok() {}
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_apply, bench_diff_tick, bench_publish_fanout);
criterion_main!(benches);
