use ferrous_ioc::{
    AnyArc, Autowired, ComponentBuilder, ComponentCollection, ContainerConfig, DependencyDescriptor, DiError, DiResult,
    InjectionPoint, LifecycleContext, OnInitialize, Phase, Resolver, TypeStructure,
};
use std::sync::Arc;

#[derive(Default)]
struct Alpha {
    beta: Autowired<Arc<Beta>>,
}

#[derive(Default)]
struct Beta {
    alpha: Autowired<Arc<Alpha>>,
}

fn field_cycle() -> ComponentCollection {
    let mut components = ComponentCollection::new();
    components.add_singleton_factory::<Alpha, _>(|_| Ok(Alpha::default()));
    components.add_singleton_factory::<Beta, _>(|_| Ok(Beta::default()));
    components.add_structure(
        TypeStructure::of::<Alpha>().point(InjectionPoint::single::<Alpha, Beta>("beta", |a| &a.beta)),
    );
    components.add_structure(
        TypeStructure::of::<Beta>().point(InjectionPoint::single::<Beta, Alpha>("alpha", |b| &b.alpha)),
    );
    components
}

/// Helper: assert that `result` failed with a circular construction along `expected_path`.
fn assert_circular<T>(result: DiResult<T>, expected_path: &[&str]) {
    let err = match result {
        Ok(_) => panic!("Expected a circular construction error"),
        Err(e) => e,
    };
    match err.root_cause() {
        DiError::CircularConstruction { path } => {
            let path: Vec<&str> = path.iter().map(String::as_str).collect();
            assert_eq!(path, expected_path, "wrong circular path");
        }
        other => panic!("Expected CircularConstruction, got: {}", other),
    }
}

#[test]
fn test_field_cycle_between_singletons_resolves() {
    let container = field_cycle().build().unwrap();

    let alpha = container.get::<Alpha>().unwrap();
    let beta = alpha.beta.cloned().unwrap();
    let alpha_from_beta = beta.alpha.cloned().unwrap();

    assert!(Arc::ptr_eq(&alpha, &alpha_from_beta));
    assert!(Arc::ptr_eq(&beta, &container.get::<Beta>().unwrap()));
    assert_eq!(container.metrics().early_references_exposed, 1);
    assert_eq!(container.dependents_of("alpha"), vec!["beta".to_string()]);
}

#[test]
fn test_field_cycle_fails_without_early_references() {
    let mut components = field_cycle();
    components.with_config(ContainerConfig {
        allow_circular_references: false,
        ..ContainerConfig::default()
    });
    let container = components.build().unwrap();

    assert_circular(container.get::<Alpha>(), &["alpha", "beta", "alpha"]);
    assert!(!container.contains_singleton("alpha"));
    assert!(!container.contains_singleton("beta"));
}

#[test]
fn test_constructor_cycle_is_circular() {
    struct Left;
    struct Right;

    let mut components = ComponentCollection::new();
    components.add_component(
        "left",
        ComponentBuilder::<Left>::new().constructor(vec![DependencyDescriptor::of::<Right>()], |_| Ok(Left)),
    );
    components.add_component(
        "right",
        ComponentBuilder::<Right>::new().constructor(vec![DependencyDescriptor::of::<Left>()], |_| Ok(Right)),
    );
    let container = components.build().unwrap();

    let result = container.get::<Left>();
    match &result {
        Err(DiError::Lifecycle { component, phase, .. }) => {
            assert_eq!(component, "left");
            assert_eq!(*phase, Phase::Instantiating);
        }
        _ => panic!("Expected a lifecycle error for 'left'"),
    }
    assert_circular(result, &["left", "right", "left"]);
    assert!(container.singleton_names().is_empty());
}

#[test]
fn test_prototype_cycle_is_circular() {
    struct Ping;
    struct Pong;

    let mut components = ComponentCollection::new();
    components.add_prototype_factory::<Ping, _>(|r| {
        r.get::<Pong>()?;
        Ok(Ping)
    });
    components.add_prototype_factory::<Pong, _>(|r| {
        r.get::<Ping>()?;
        Ok(Pong)
    });
    let container = components.build().unwrap();

    assert_circular(container.get::<Ping>(), &["ping", "pong", "ping"]);
}

#[test]
fn test_depends_on_cycle_is_circular() {
    let mut components = ComponentCollection::new();
    components.add_component(
        "first",
        ComponentBuilder::<u8>::new().supplier(|_| Ok(1)).depends_on("second"),
    );
    components.add_component(
        "second",
        ComponentBuilder::<u16>::new().supplier(|_| Ok(2)).depends_on("first"),
    );
    let container = components.build().unwrap();

    let result = container.get_component("first");
    match &result {
        Err(DiError::Lifecycle { phase, .. }) => assert_eq!(*phase, Phase::Requested),
        _ => panic!("Expected a lifecycle error in the requested phase"),
    }
    assert_circular(result, &["second", "first", "second"]);
}

#[test]
fn test_self_reference_is_excluded_from_search() {
    struct Node {
        parent: Option<Arc<Node>>,
    }

    let mut components = ComponentCollection::new();
    components.add_singleton_factory::<Node, _>(|r| Ok(Node { parent: r.get_optional::<Node>()? }));
    let container = components.build().unwrap();

    assert!(container.get::<Node>().unwrap().parent.is_none());
}

struct Replace;

impl OnInitialize for Replace {
    fn after_init(&self, ctx: &LifecycleContext<'_>, instance: AnyArc) -> DiResult<AnyArc> {
        if ctx.name() == "alpha" {
            return Ok(Arc::new(Alpha::default()) as AnyArc);
        }
        Ok(instance)
    }
}

#[test]
fn test_wrapping_after_early_exposure_is_rejected() {
    let mut components = field_cycle();
    components.add_initialize_processor(Arc::new(Replace));
    let container = components.build().unwrap();

    let result = container.get::<Alpha>();
    match &result {
        Err(DiError::Lifecycle { component, phase, .. }) => {
            assert_eq!(component, "alpha");
            assert_eq!(*phase, Phase::Initializing);
        }
        _ => panic!("Expected a lifecycle error for 'alpha'"),
    }
    assert_circular(result, &["alpha", "beta", "alpha"]);
    // The component holding the raw reference is evicted with it
    assert!(!container.contains_singleton("beta"));
}

#[test]
fn test_wrapping_after_early_exposure_can_be_allowed() {
    let mut components = field_cycle();
    components.with_config(ContainerConfig {
        allow_raw_injection_despite_wrapping: true,
        ..ContainerConfig::default()
    });
    components.add_initialize_processor(Arc::new(Replace));
    let container = components.build().unwrap();

    let alpha = container.get::<Alpha>().unwrap();
    let beta = container.get::<Beta>().unwrap();
    // Beta keeps the raw instance it received while alpha was in creation
    assert!(!Arc::ptr_eq(&alpha, &beta.alpha.cloned().unwrap()));
    assert!(!alpha.beta.is_set());
}

struct Solo {
    generation: u8,
}

struct Gamma;

/// Reads the component's own early reference, then substitutes the instance.
struct SelfLookup;

impl OnInitialize for SelfLookup {
    fn before_init(&self, ctx: &LifecycleContext<'_>, instance: AnyArc) -> DiResult<AnyArc> {
        if ctx.name() == "solo" {
            ctx.resolver().get_named::<Solo>("solo")?;
        }
        Ok(instance)
    }

    fn after_init(&self, ctx: &LifecycleContext<'_>, instance: AnyArc) -> DiResult<AnyArc> {
        if ctx.name() == "solo" {
            return Ok(Arc::new(Solo { generation: 2 }) as AnyArc);
        }
        Ok(instance)
    }
}

#[test]
fn test_wrapping_allowed_when_only_dependents_without_early_reference_exist() {
    let mut components = ComponentCollection::new();
    components.add_component(
        "solo",
        ComponentBuilder::<Solo>::new().supplier(|_| Ok(Solo { generation: 1 })),
    );
    components.add_component(
        "gamma",
        ComponentBuilder::<Gamma>::new().supplier(|_| Ok(Gamma)).depends_on("solo"),
    );
    components.add_initialize_processor(Arc::new(SelfLookup));
    let container = components.build().unwrap();

    container.get::<Gamma>().unwrap();
    assert_eq!(container.get::<Solo>().unwrap().generation, 2);
    assert_eq!(container.dependents_of("solo"), vec!["gamma".to_string()]);
}
