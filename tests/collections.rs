use ferrous_ioc::{
    ComponentBuilder, ComponentCollection, DependencyDescriptor, DiError, ResolvableType, Resolver, ResolverCore,
};
use std::sync::Arc;

trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Audit;
impl Plugin for Audit {
    fn name(&self) -> &'static str {
        "audit"
    }
}

struct Metrics;
impl Plugin for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }
}

struct Tracing;
impl Plugin for Tracing {
    fn name(&self) -> &'static str {
        "tracing"
    }
}

fn plugins() -> ComponentCollection {
    let mut components = ComponentCollection::new();
    components.add_component(
        "tracing",
        ComponentBuilder::<Tracing>::new()
            .supplier(|_| Ok(Tracing))
            .expose::<dyn Plugin>(|p| p as Arc<dyn Plugin>),
    );
    components.add_component(
        "metrics",
        ComponentBuilder::<Metrics>::new()
            .supplier(|_| Ok(Metrics))
            .order(2)
            .expose::<dyn Plugin>(|p| p as Arc<dyn Plugin>),
    );
    components.add_component(
        "audit",
        ComponentBuilder::<Audit>::new()
            .supplier(|_| Ok(Audit))
            .priority(1)
            .expose::<dyn Plugin>(|p| p as Arc<dyn Plugin>),
    );
    components
}

#[test]
fn test_empty_collection_is_not_an_error() {
    let container = ComponentCollection::new().build().unwrap();

    assert!(container.get_all::<dyn Plugin>().unwrap().is_empty());
    assert!(container.get_map::<dyn Plugin>().unwrap().is_empty());
    assert!(matches!(
        container.get::<dyn Plugin>(),
        Err(DiError::NoMatchingCandidate { .. })
    ));
}

#[test]
fn test_ordered_collection_sorts_by_order_then_priority() {
    let container = plugins().build().unwrap();

    let names: Vec<&str> = container
        .get_all::<dyn Plugin>()
        .unwrap()
        .iter()
        .map(|p| p.name())
        .collect();
    // audit has priority 1, metrics order 2, tracing neither
    assert_eq!(names, vec!["audit", "metrics", "tracing"]);
}

#[test]
fn test_unordered_collection_keeps_registration_order() {
    let container = plugins().build().unwrap();

    let all = container
        .resolve(&DependencyDescriptor::collection::<dyn Plugin>(false))
        .unwrap()
        .into_vec::<dyn Plugin>()
        .unwrap();
    let names: Vec<&str> = all.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["tracing", "metrics", "audit"]);
}

#[test]
fn test_map_is_keyed_by_component_name() {
    let container = plugins().build().unwrap();

    let map = container.get_map::<dyn Plugin>().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["metrics"].name(), "metrics");
    assert_eq!(map["audit"].name(), "audit");
}

#[test]
fn test_collection_ignores_primary_and_creates_every_candidate() {
    let mut components = plugins();
    components.add_component(
        "extra",
        ComponentBuilder::<Audit>::new()
            .supplier(|_| Ok(Audit))
            .primary()
            .expose::<dyn Plugin>(|p| p as Arc<dyn Plugin>),
    );
    let container = components.build().unwrap();

    assert_eq!(container.get_all::<dyn Plugin>().unwrap().len(), 4);
    assert_eq!(container.singleton_names().len(), 4);
}

#[test]
fn test_optional_plural_dependency_is_absent_when_ambiguous() {
    let mut components = ComponentCollection::new();
    components.add_named_singleton("hosts", vec!["a".to_string()]);
    components.add_named_singleton("backup_hosts", vec!["b".to_string()]);
    let container = components.build().unwrap();

    let plural = ResolvableType::of::<Vec<String>>().as_collection();

    // Optional plural: left absent
    let optional = DependencyDescriptor::new(plural.clone()).with_required(false);
    let resolved = container.resolve(&optional).unwrap();
    assert!(resolved.into_optional::<Vec<String>>().unwrap().is_none());

    // Required plural: still ambiguous
    let required = DependencyDescriptor::new(plural);
    assert!(matches!(
        container.resolve(&required),
        Err(DiError::NonUniqueCandidate { .. })
    ));

    // Optional but not plural: ambiguity is an error
    assert!(matches!(
        container.get_optional::<Vec<String>>(),
        Err(DiError::NonUniqueCandidate { .. })
    ));
}

#[test]
fn test_manual_singletons_take_part_in_collections() {
    let mut components = plugins();
    components.add_instance("external", Arc::new(String::from("unrelated")));
    let container = components.build().unwrap();
    container.register_singleton("manual_audit", Arc::new(Audit)).unwrap();

    // Audit instances are found by concrete type
    let audits = container.get_all::<Audit>().unwrap();
    assert_eq!(audits.len(), 2);
}
