//! Concurrent access: single-flight singleton creation and lock-free
//! lookups of committed instances.

use crossbeam_utils::thread;
use ferrous_ioc::{Autowired, ComponentBuilder, ComponentCollection, Container, InjectionPoint, Resolver, TypeStructure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const THREADS: usize = 16;

struct Expensive {
    id: usize,
}

#[test]
fn test_singleton_is_created_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let mut components = ComponentCollection::new();
    components.add_singleton_factory::<Expensive, _>(move |_| {
        let id = counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        Ok(Expensive { id })
    });
    let container = components.build().unwrap();
    let barrier = Barrier::new(THREADS);

    let results: Vec<Arc<Expensive>> = thread::scope(|s| {
        let mut handles = Vec::with_capacity(THREADS);
        for _ in 0..THREADS {
            let container = &container;
            let barrier = &barrier;
            handles.push(s.spawn(move |_| {
                barrier.wait();
                container.get::<Expensive>().unwrap()
            }));
        }
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(results[0].id, 0);
    assert_eq!(container.metrics().singletons_committed, 1);
}

#[derive(Default)]
struct Left {
    right: Autowired<Arc<Right>>,
}

#[derive(Default)]
struct Right {
    left: Autowired<Arc<Left>>,
}

#[test]
fn test_field_cycle_under_contention_sees_committed_instances() {
    let mut components = ComponentCollection::new();
    components.add_singleton_factory::<Left, _>(|_| {
        std::thread::sleep(Duration::from_millis(10));
        Ok(Left::default())
    });
    components.add_singleton_factory::<Right, _>(|_| Ok(Right::default()));
    components.add_structure(
        TypeStructure::of::<Left>().point(InjectionPoint::single::<Left, Right>("right", |l| &l.right)),
    );
    components.add_structure(
        TypeStructure::of::<Right>().point(InjectionPoint::single::<Right, Left>("left", |r| &r.left)),
    );
    let container = components.build().unwrap();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for i in 0..THREADS {
            let container = &container;
            let barrier = &barrier;
            s.spawn(move |_| {
                barrier.wait();
                // Half the threads enter the cycle from each side
                if i % 2 == 0 {
                    let left = container.get::<Left>().unwrap();
                    assert!(left.right.is_set());
                } else {
                    let right = container.get::<Right>().unwrap();
                    assert!(right.left.is_set());
                }
            });
        }
    })
    .unwrap();

    let left = container.get::<Left>().unwrap();
    let right = container.get::<Right>().unwrap();
    assert!(Arc::ptr_eq(left.right.get().unwrap(), &right));
    assert!(Arc::ptr_eq(right.left.get().unwrap(), &left));
}

#[test]
fn test_concurrent_lookups_of_committed_singletons() {
    let mut components = ComponentCollection::new();
    components.add_singleton(42u64);
    components.add_named_singleton("greeting", "hello".to_string());
    components.eager_singletons();
    let container = components.build().unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            let container = &container;
            s.spawn(move |_| {
                for _ in 0..1_000 {
                    assert_eq!(*container.get::<u64>().unwrap(), 42);
                    assert_eq!(container.get_named::<String>("greeting").unwrap().as_str(), "hello");
                }
            });
        }
    })
    .unwrap();

    assert_eq!(container.metrics().instances_created, 2);
}

#[test]
fn test_concurrent_registrations_of_one_name_keep_a_single_entry() {
    let container = Container::new();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for i in 0..THREADS {
            let container = &container;
            let barrier = &barrier;
            s.spawn(move |_| {
                barrier.wait();
                container
                    .register_definition("shared", ComponentBuilder::<usize>::new().supplier(move |_| Ok(i)))
                    .unwrap();
            });
        }
    })
    .unwrap();

    assert_eq!(container.definition_names(), vec!["shared".to_string()]);
    assert!(*container.get_named::<usize>("shared").unwrap() < THREADS);
}
