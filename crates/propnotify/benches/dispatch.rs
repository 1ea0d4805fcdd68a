//! Dispatch and registration benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use propnotify::{listener_fn, ChangeEvent, ChangeRegistry, PropertyValue, SharedListener};

fn noop() -> SharedListener<u64> {
    listener_fn("noop", |event: &ChangeEvent<u64>| {
        black_box(event.property_name());
        Ok(())
    })
}

fn registry_with(global: usize, per_attribute: usize) -> ChangeRegistry<u64> {
    let registry = ChangeRegistry::new(1);
    for _ in 0..global {
        registry.add_listener(noop()).unwrap();
    }
    for _ in 0..per_attribute {
        registry.add_attribute_listener("color", noop()).unwrap();
    }
    registry
}

fn bench_fire(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/fire");

    for size in [1usize, 10, 100] {
        let registry = registry_with(size, size);
        let event = ChangeEvent::new(
            1u64,
            Some("color"),
            Some(PropertyValue::from("red")),
            Some(PropertyValue::from("blue")),
        );

        group.bench_with_input(BenchmarkId::new("matching", size), &size, |b, _| {
            b.iter(|| registry.fire_event(black_box(&event)).unwrap());
        });

        let other = ChangeEvent::new(1u64, Some("size"), None, Some(PropertyValue::Int(2)));
        group.bench_with_input(BenchmarkId::new("global_only", size), &size, |b, _| {
            b.iter(|| registry.fire_event(black_box(&other)).unwrap());
        });
    }

    group.finish();
}

fn bench_has_listeners(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/has_listeners");

    let empty: ChangeRegistry<u64> = ChangeRegistry::new(1);
    group.bench_function("empty", |b| {
        b.iter(|| black_box(empty.has_listeners(black_box("color"))));
    });

    let populated = registry_with(0, 10);
    group.bench_function("attribute_hit", |b| {
        b.iter(|| black_box(populated.has_listeners(black_box("color"))));
    });

    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/registration");

    let registry = registry_with(100, 100);
    let listener = noop();

    group.bench_function("add_remove_global", |b| {
        b.iter(|| {
            registry.add_listener(Arc::clone(&listener)).unwrap();
            black_box(registry.remove_listener(&listener));
        });
    });

    group.bench_function("add_remove_attribute", |b| {
        b.iter(|| {
            registry
                .add_attribute_listener("width", Arc::clone(&listener))
                .unwrap();
            black_box(registry.remove_attribute_listener("width", &listener));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fire, bench_has_listeners, bench_registration);
criterion_main!(benches);
