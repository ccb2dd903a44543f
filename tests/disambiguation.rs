use ferrous_ioc::{
    Autowired, ComponentBuilder, ComponentCollection, DiError, InjectionPoint, Resolver, TypeStructure,
};
use std::sync::Arc;

trait Codec: Send + Sync {
    fn id(&self) -> &'static str;
}

macro_rules! codec {
    ($ty:ident, $id:literal) => {
        struct $ty;
        impl Codec for $ty {
            fn id(&self) -> &'static str {
                $id
            }
        }
    };
}

codec!(Json, "json");
codec!(Yaml, "yaml");
codec!(Toml, "toml");

fn json() -> ComponentBuilder<Json> {
    ComponentBuilder::<Json>::new()
        .supplier(|_| Ok(Json))
        .expose::<dyn Codec>(|c| c as Arc<dyn Codec>)
}

fn yaml() -> ComponentBuilder<Yaml> {
    ComponentBuilder::<Yaml>::new()
        .supplier(|_| Ok(Yaml))
        .expose::<dyn Codec>(|c| c as Arc<dyn Codec>)
}

fn toml() -> ComponentBuilder<Toml> {
    ComponentBuilder::<Toml>::new()
        .supplier(|_| Ok(Toml))
        .expose::<dyn Codec>(|c| c as Arc<dyn Codec>)
}

#[test]
fn test_primary_wins() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json());
    components.add_component("yaml", yaml().primary());
    components.add_component("toml", toml());
    let container = components.build().unwrap();

    assert_eq!(container.get::<dyn Codec>().unwrap().id(), "yaml");
}

#[test]
fn test_two_primaries_are_ambiguous() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json().primary());
    components.add_component("yaml", yaml().primary());
    let container = components.build().unwrap();

    match container.get::<dyn Codec>() {
        Err(DiError::NonUniqueCandidate { candidates, .. }) => {
            assert_eq!(candidates, vec!["json".to_string(), "yaml".to_string()]);
        }
        other => panic!("unexpected: {:?}", other.map(|c| c.id())),
    }
}

#[test]
fn test_lowest_priority_wins() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json().priority(20));
    components.add_component("yaml", yaml().priority(10));
    components.add_component("toml", toml());
    let container = components.build().unwrap();

    assert_eq!(container.get::<dyn Codec>().unwrap().id(), "yaml");
}

#[test]
fn test_priority_tie_is_ambiguous() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json().priority(10));
    components.add_component("yaml", yaml().priority(10));
    let container = components.build().unwrap();

    assert!(matches!(
        container.get::<dyn Codec>(),
        Err(DiError::NonUniqueCandidate { .. })
    ));
}

#[test]
fn test_primary_beats_priority() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json().priority(1));
    components.add_component("yaml", yaml().primary());
    let container = components.build().unwrap();

    assert_eq!(container.get::<dyn Codec>().unwrap().id(), "yaml");
}

#[derive(Default)]
struct Encoder {
    toml: Autowired<Arc<dyn Codec>>,
}

#[test]
fn test_declaring_name_breaks_tie() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json());
    components.add_component("toml", toml());
    components.add_singleton_factory::<Encoder, _>(|_| Ok(Encoder::default()));
    components.add_structure(
        TypeStructure::of::<Encoder>().point(InjectionPoint::single::<Encoder, dyn Codec>("toml", |e| &e.toml)),
    );
    let container = components.build().unwrap();

    let encoder = container.get::<Encoder>().unwrap();
    assert_eq!(encoder.toml.get().unwrap().id(), "toml");
}

#[test]
fn test_declaring_name_matches_alias() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json());
    components.add_component("toml_codec", toml());
    components.add_alias("toml_codec", "toml");
    components.add_singleton_factory::<Encoder, _>(|_| Ok(Encoder::default()));
    components.add_structure(
        TypeStructure::of::<Encoder>().point(InjectionPoint::single::<Encoder, dyn Codec>("toml", |e| &e.toml)),
    );
    let container = components.build().unwrap();

    assert_eq!(container.get::<Encoder>().unwrap().toml.get().unwrap().id(), "toml");
}

#[test]
fn test_unmatched_tie_reports_all_candidates() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json());
    components.add_component("yaml", yaml());
    let container = components.build().unwrap();

    let err = container.get::<dyn Codec>().err().unwrap();
    let message = err.to_string();
    assert!(message.contains("json"));
    assert!(message.contains("yaml"));
}

#[test]
fn test_non_candidates_are_skipped() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json().autowire_candidate(false));
    components.add_component("yaml", yaml());
    let container = components.build().unwrap();

    assert_eq!(container.get::<dyn Codec>().unwrap().id(), "yaml");
    // Still reachable by name
    assert_eq!(container.get_named::<dyn Codec>("json").unwrap().id(), "json");
}

#[test]
fn test_resolvable_dependency_wins_over_names() {
    let mut components = ComponentCollection::new();
    components.add_component("json", json());
    components.add_component("yaml", yaml());
    components.add_resolvable_dependency::<dyn Codec>(Arc::new(Toml));
    let container = components.build().unwrap();

    assert_eq!(container.get::<dyn Codec>().unwrap().id(), "toml");
}
