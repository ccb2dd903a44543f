use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_ioc::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut components = ComponentCollection::new();
    components.add_singleton(42u64);
    let container = components.build().unwrap();

    // Commit the singleton
    let _ = container.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = container.get::<u64>().unwrap();
            black_box(v);
        })
    });

    c.bench_function("singleton_hit_by_name", |b| {
        b.iter(|| {
            let v = container.get_named::<u64>("u64").unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let mut components = ComponentCollection::new();
                components.add_singleton_factory::<ExpensiveToCreate, _>(|_| {
                    Ok(ExpensiveToCreate {
                        data: (0..1000).collect(),
                    })
                });
                components.build().unwrap()
            },
            |container| {
                let v = container.get::<ExpensiveToCreate>().unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_prototype(c: &mut Criterion) {
    struct Request {
        data: [u8; 64],
    }

    let mut components = ComponentCollection::new();
    components.add_prototype_factory::<Request, _>(|_| Ok(Request { data: [0; 64] }));
    let container = components.build().unwrap();

    c.bench_function("prototype_create", |b| {
        b.iter(|| {
            let v = container.get::<Request>().unwrap();
            black_box(&v.data);
        })
    });
}

fn bench_concrete_vs_trait(c: &mut Criterion) {
    trait MyTrait: Send + Sync {
        fn value(&self) -> u64;
    }

    struct ConcreteImpl {
        val: u64,
    }

    impl MyTrait for ConcreteImpl {
        fn value(&self) -> u64 {
            self.val
        }
    }

    let mut group = c.benchmark_group("concrete_vs_trait");

    let mut components = ComponentCollection::new();
    components.add_component(
        "concrete",
        ComponentBuilder::<ConcreteImpl>::new()
            .instance(Arc::new(ConcreteImpl { val: 42 }))
            .expose::<dyn MyTrait>(|c| c as Arc<dyn MyTrait>),
    );
    let container = components.build().unwrap();

    group.bench_function("concrete", |b| {
        b.iter(|| {
            let v = container.get::<ConcreteImpl>().unwrap();
            black_box(v.val);
        })
    });

    group.bench_function("trait_single", |b| {
        b.iter(|| {
            let v = container.get::<dyn MyTrait>().unwrap();
            black_box(v.value());
        })
    });

    group.finish();
}

fn bench_collection_scaling(c: &mut Criterion) {
    trait Handler: Send + Sync {
        fn id(&self) -> usize;
    }

    struct HandlerImpl(usize);
    impl Handler for HandlerImpl {
        fn id(&self) -> usize {
            self.0
        }
    }

    let mut group = c.benchmark_group("collection");

    for count in [1usize, 8, 32] {
        let mut components = ComponentCollection::new();
        for i in 0..count {
            components.add_component(
                &format!("handler_{}", i),
                ComponentBuilder::<HandlerImpl>::new()
                    .supplier(move |_| Ok(HandlerImpl(i)))
                    .order((count - i) as i32)
                    .expose::<dyn Handler>(|h| h as Arc<dyn Handler>),
            );
        }
        components.eager_singletons();
        let container = components.build().unwrap();

        group.bench_with_input(BenchmarkId::new("get_all", count), &count, |b, _| {
            b.iter(|| {
                let handlers = container.get_all::<dyn Handler>().unwrap();
                black_box(handlers.iter().map(|h| h.id()).sum::<usize>());
            })
        });
    }

    group.finish();
}

fn bench_injection_shortcut(c: &mut Criterion) {
    struct Clock;

    #[derive(Default)]
    struct Host {
        clock: Autowired<Arc<Clock>>,
    }

    let mut components = ComponentCollection::new();
    components.add_singleton(Clock);
    components.add_prototype_factory::<Host, _>(|_| Ok(Host::default()));
    components.add_structure(
        TypeStructure::of::<Host>().point(InjectionPoint::single::<Host, Clock>("clock", |h| &h.clock)),
    );
    let container = components.build().unwrap();

    // First creation resolves fully and records the shortcut
    let _ = container.get::<Host>().unwrap();

    c.bench_function("field_injection_shortcut", |b| {
        b.iter(|| {
            let host = container.get::<Host>().unwrap();
            black_box(host.clock.is_set());
        })
    });
}

fn bench_large_registry(c: &mut Criterion) {
    struct Target(u64);

    let mut group = c.benchmark_group("large_registry");

    for count in [10usize, 100, 1000] {
        let mut components = ComponentCollection::new();
        for i in 0..count {
            components.add_named_singleton(&format!("filler_{}", i), i as u32);
        }
        components.add_singleton(Target(7));
        let container = components.build().unwrap();
        container.freeze_configuration();
        let _ = container.get::<Target>().unwrap();

        group.bench_with_input(
            BenchmarkId::new("resolve_by_type", count),
            &count,
            |b, _| {
                b.iter(|| {
                    let v = container.get::<Target>().unwrap();
                    black_box(v.0);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_prototype,
    bench_concrete_vs_trait,
    bench_collection_scaling,
    bench_injection_shortcut,
    bench_large_registry
);
criterion_main!(benches);
