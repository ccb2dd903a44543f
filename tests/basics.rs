use ferrous_ioc::{
    ComponentBuilder, ComponentCollection, Container, DependencyDescriptor, DiError, Qualifier, Resolver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_concrete_singleton() {
    let mut components = ComponentCollection::new();
    components.add_singleton(42usize);
    components.add_singleton("hello".to_string());

    let container = components.build().unwrap();

    let num1 = container.get::<usize>().unwrap();
    let num2 = container.get::<usize>().unwrap();
    let str1 = container.get::<String>().unwrap();
    let str2 = container.get::<String>().unwrap();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2)); // Same instance
    assert!(Arc::ptr_eq(&str1, &str2)); // Same instance
}

#[test]
fn test_factory_with_dependencies() {
    #[derive(Debug)]
    struct Config {
        port: u16,
    }

    #[derive(Debug)]
    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut components = ComponentCollection::new();
    components.add_singleton(Config { port: 8080 });
    components.add_singleton_factory::<Server, _>(|r| {
        Ok(Server {
            config: r.get::<Config>()?,
            name: "MyServer".to_string(),
        })
    });

    let container = components.build().unwrap();
    let server = container.get::<Server>().unwrap();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
    assert_eq!(container.dependencies_of("server"), vec!["config".to_string()]);
    assert_eq!(container.dependents_of("config"), vec!["server".to_string()]);
}

#[test]
fn test_prototype_creates_new_instances() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let mut components = ComponentCollection::new();
    components.add_prototype_factory::<String, _>(move |_| {
        let n = counter_clone.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("instance-{}", n))
    });

    let container = components.build().unwrap();

    let a = container.get::<String>().unwrap();
    let b = container.get::<String>().unwrap();
    let c = container.get::<String>().unwrap();

    assert_eq!(*a, "instance-1");
    assert_eq!(*b, "instance-2");
    assert_eq!(*c, "instance-3");
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_unknown_name_is_definition_not_found() {
    let container = Container::new();
    match container.get_component("missing") {
        Err(DiError::DefinitionNotFound { name }) => assert_eq!(name, "missing"),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_dependency_names_requester() {
    struct Service;

    let mut components = ComponentCollection::new();
    components.add_singleton_factory::<Service, _>(|r| {
        r.get::<u64>()?;
        Ok(Service)
    });
    let container = components.build().unwrap();

    let err = container.get::<Service>().err().unwrap();
    match err.root_cause() {
        DiError::NoMatchingCandidate { requesting, .. } => {
            assert_eq!(requesting.as_deref(), Some("service"));
        }
        other => panic!("unexpected root cause: {}", other),
    }
    assert!(!container.contains_singleton("service"));
}

#[test]
fn test_optional_absent_is_none() {
    let container = Container::new();
    assert!(container.get_optional::<String>().unwrap().is_none());
}

#[test]
fn test_constructor_injection_prefers_most_parameters() {
    struct Repo;
    struct Cache;
    struct Service {
        with_cache: bool,
    }

    let mut components = ComponentCollection::new();
    components.add_singleton(Repo);
    components.add_component(
        "service",
        ComponentBuilder::<Service>::new()
            .constructor(vec![DependencyDescriptor::of::<Repo>()], |_| Ok(Service { with_cache: false }))
            .constructor(
                vec![DependencyDescriptor::of::<Repo>(), DependencyDescriptor::of::<Cache>()],
                |_| Ok(Service { with_cache: true }),
            ),
    );

    // Cache is missing, so the two-argument constructor is skipped
    let container = components.build().unwrap();
    assert!(!container.get::<Service>().unwrap().with_cache);
}

#[test]
fn test_factory_method_on_owner() {
    struct Pool {
        size: usize,
    }
    struct Connection {
        pool_size: usize,
    }

    let mut components = ComponentCollection::new();
    components.add_named_singleton("pool", Pool { size: 4 });
    components.add_component(
        "connection",
        ComponentBuilder::<Connection>::new()
            .factory_method::<Pool, _>("pool", |pool, _| Ok(Connection { pool_size: pool.size }))
            .prototype(),
    );

    let container = components.build().unwrap();
    assert_eq!(container.get::<Connection>().unwrap().pool_size, 4);
    assert_eq!(container.dependents_of("pool"), vec!["connection".to_string()]);
}

#[test]
fn test_qualifier_selects_candidate() {
    trait Store: Send + Sync {
        fn label(&self) -> &'static str;
    }
    struct Disk;
    impl Store for Disk {
        fn label(&self) -> &'static str {
            "disk"
        }
    }
    struct Memory;
    impl Store for Memory {
        fn label(&self) -> &'static str {
            "memory"
        }
    }

    let mut components = ComponentCollection::new();
    components.add_component(
        "disk",
        ComponentBuilder::<Disk>::new()
            .supplier(|_| Ok(Disk))
            .qualifier(Qualifier::new("tier", "cold"))
            .expose::<dyn Store>(|s| s as Arc<dyn Store>),
    );
    components.add_component(
        "memory",
        ComponentBuilder::<Memory>::new()
            .supplier(|_| Ok(Memory))
            .expose::<dyn Store>(|s| s as Arc<dyn Store>),
    );

    let container = components.build().unwrap();
    let cold = container.get_qualified::<dyn Store>(Qualifier::new("tier", "cold")).unwrap();
    assert_eq!(cold.label(), "disk");
    let named = container.get_qualified::<dyn Store>(Qualifier::named("memory")).unwrap();
    assert_eq!(named.label(), "memory");
    assert!(matches!(
        container.get_qualified::<dyn Store>(Qualifier::new("tier", "hot")),
        Err(DiError::NoMatchingCandidate { .. })
    ));
}

#[test]
fn test_preinstantiate_creates_non_lazy_singletons() {
    let created = Arc::new(AtomicUsize::new(0));
    let eager = created.clone();
    let lazy = created.clone();

    let mut components = ComponentCollection::new();
    components.add_component(
        "eager",
        ComponentBuilder::<u8>::new().supplier(move |_| {
            eager.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }),
    );
    components.add_component(
        "lazy",
        ComponentBuilder::<u16>::new()
            .supplier(move |_| {
                lazy.fetch_add(10, Ordering::SeqCst);
                Ok(2)
            })
            .lazy(true),
    );
    components.eager_singletons();

    let container = components.build().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(container.is_configuration_frozen());
    assert_eq!(container.singleton_names(), vec!["eager".to_string()]);
}

#[test]
fn test_parent_definition_is_inherited() {
    struct Endpoint;

    let mut components = ComponentCollection::new();
    components.add_component(
        "base",
        ComponentBuilder::<Endpoint>::new()
            .supplier(|_| Ok(Endpoint))
            .prototype(),
    );
    components.add_component("child", ferrous_ioc::ComponentDefinition::child_of("base"));

    let container = components.build().unwrap();
    let merged = container.merged_definition("child").unwrap();
    assert!(!merged.is_singleton());
    let a = container.get_named::<Endpoint>("child").unwrap();
    let b = container.get_named::<Endpoint>("child").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}
