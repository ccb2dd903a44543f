//! Component definitions and the typed builder producing them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use crate::catalog::{AnyArc, TypeView};
use crate::descriptors::{DependencyDescriptor, Qualifier};
use crate::key::{ResolvableType, TypeKey};
use crate::lifetime::Lifetime;
use crate::provider::{Provider, ResolverContext};
use crate::resolver::Resolution;
use crate::{DiError, DiResult};

/// Produces an instance with access to the container.
pub type SupplierFn = Arc<dyn Fn(&ResolverContext<'_>) -> DiResult<AnyArc> + Send + Sync>;

/// Builds an instance from resolved constructor arguments.
pub type ConstructFn = Arc<dyn Fn(ConstructorArgs) -> DiResult<AnyArc> + Send + Sync>;

/// Builds an instance from its factory-owner instance.
pub type FactoryMethodFn =
    Arc<dyn Fn(AnyArc, &ResolverContext<'_>) -> DiResult<AnyArc> + Send + Sync>;

/// Post-population callback.
pub type InitFn = Arc<dyn Fn(&AnyArc) -> DiResult<()> + Send + Sync>;

/// Destruction callback.
pub type DestroyFn = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// Importance of a definition's author. Lower variants are more important;
/// overriding a more important definition with a less important one is
/// logged as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Role {
    #[default]
    Application,
    Support,
    Infrastructure,
}

/// A constructor candidate: its parameter descriptors and the closure
/// building the instance from resolved arguments.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<DependencyDescriptor>,
    build: ConstructFn,
}

impl Constructor {
    pub fn new<F>(params: Vec<DependencyDescriptor>, build: F) -> Self
    where
        F: Fn(ConstructorArgs) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        Self {
            params,
            build: Arc::new(build),
        }
    }

    pub fn params(&self) -> &[DependencyDescriptor] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: ConstructorArgs) -> DiResult<AnyArc> {
        (self.build)(args)
    }
}

/// How a definition produces its raw instance.
#[derive(Clone)]
pub enum InstanceSource {
    Supplier(SupplierFn),
    /// Candidates tried from most to fewest parameters.
    Constructors(Vec<Constructor>),
    /// A method on another component, the factory owner.
    FactoryMethod { owner: String, build: FactoryMethodFn },
}

impl InstanceSource {
    pub fn factory_owner(&self) -> Option<&str> {
        match self {
            InstanceSource::FactoryMethod { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

impl fmt::Debug for InstanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceSource::Supplier(_) => f.write_str("Supplier"),
            InstanceSource::Constructors(ctors) => {
                let arities: Vec<usize> = ctors.iter().map(|c| c.params.len()).collect();
                write!(f, "Constructors({:?})", arities)
            }
            InstanceSource::FactoryMethod { owner, .. } => write!(f, "FactoryMethod({})", owner),
        }
    }
}

/// An explicitly supplied value for one member, taking precedence over
/// autowiring that member.
#[derive(Clone)]
pub enum PropertyValue {
    /// A view value (`Arc<Arc<T>>` erased), see [`PropertyValue::value`].
    Value(AnyArc),
    /// Another component by name.
    Reference(String),
}

impl PropertyValue {
    pub fn value<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        PropertyValue::Value(Arc::new(value))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        PropertyValue::Reference(name.into())
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Value(_) => f.write_str("Value(..)"),
            PropertyValue::Reference(name) => write!(f, "Reference({})", name),
        }
    }
}

/// Declarative description of how to build one component.
///
/// `Option` fields left unset inherit from the parent definition when the
/// definition is merged; [`ComponentDefinition::lifetime`] and
/// [`ComponentDefinition::is_lazy`] apply the defaults.
#[derive(Clone, Default)]
pub struct ComponentDefinition {
    pub parent: Option<String>,
    pub component_type: Option<ResolvableType>,
    pub source: Option<InstanceSource>,
    pub lifetime: Option<Lifetime>,
    pub lazy_init: Option<bool>,
    pub primary: bool,
    /// Lower value wins during disambiguation.
    pub priority: Option<i32>,
    /// Position in ordered collections; lower comes first.
    pub order: Option<i32>,
    pub depends_on: Vec<String>,
    pub autowire_candidate: bool,
    pub is_abstract: bool,
    pub qualifiers: Vec<Qualifier>,
    pub properties: Vec<(String, PropertyValue)>,
    pub init: Option<InitFn>,
    pub destroy: Option<DestroyFn>,
    pub role: Role,
    pub origin: Option<String>,
    /// Catalog views of the concrete type, registered with the definition.
    pub views: Vec<TypeView>,
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("parent", &self.parent)
            .field("component_type", &self.component_type.as_ref().map(|t| t.to_string()))
            .field("source", &self.source)
            .field("lifetime", &self.lifetime)
            .field("lazy_init", &self.lazy_init)
            .field("primary", &self.primary)
            .field("priority", &self.priority)
            .field("order", &self.order)
            .field("depends_on", &self.depends_on)
            .field("autowire_candidate", &self.autowire_candidate)
            .field("is_abstract", &self.is_abstract)
            .field("qualifiers", &self.qualifiers)
            .field("properties", &self.properties)
            .field("role", &self.role)
            .field("origin", &self.origin)
            .finish()
    }
}

impl ComponentDefinition {
    /// An empty, autowire-eligible definition.
    pub fn new() -> Self {
        Self {
            autowire_candidate: true,
            ..Self::default()
        }
    }

    /// A definition inheriting everything unset from `parent`.
    pub fn child_of(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::new()
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.lifetime().is_singleton()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    pub fn concrete_type(&self) -> Option<TypeKey> {
        self.component_type.as_ref().and_then(|t| t.raw())
    }

    pub fn factory_owner(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.factory_owner())
    }

    pub(crate) fn has_qualifier(&self, qualifier: &Qualifier) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }

    pub(crate) fn property(&self, member: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, value)| value)
    }

    /// Checks the definition can be stored under `name`.
    pub fn validate(&self, name: &str) -> DiResult<()> {
        if name.is_empty() {
            return Err(DiError::InvalidDefinition {
                name: name.to_string(),
                reason: "component name must not be empty".to_string(),
            });
        }
        if !self.is_abstract && self.parent.is_none() && self.source.is_none() {
            return Err(DiError::InvalidDefinition {
                name: name.to_string(),
                reason: "no supplier, constructor or factory method".to_string(),
            });
        }
        if let Some(InstanceSource::Constructors(ctors)) = &self.source {
            if ctors.is_empty() {
                return Err(DiError::InvalidDefinition {
                    name: name.to_string(),
                    reason: "constructor list is empty".to_string(),
                });
            }
        }
        if !self.views.is_empty() && self.concrete_type().is_none() {
            return Err(DiError::InvalidDefinition {
                name: name.to_string(),
                reason: "type views require a component type".to_string(),
            });
        }
        if self.parent.as_deref() == Some(name) {
            return Err(DiError::InvalidDefinition {
                name: name.to_string(),
                reason: "a definition cannot be its own parent".to_string(),
            });
        }
        Ok(())
    }

    /// Layers `self` over an already merged `parent`.
    ///
    /// Unset `Option` fields and empty callbacks are inherited. Qualifiers
    /// and properties are unioned with the child winning on conflicts.
    /// Abstractness, primary, autowire eligibility, role and depends-on
    /// belong to the child alone.
    pub fn merged_over(&self, parent: &ComponentDefinition) -> ComponentDefinition {
        let mut merged = self.clone();
        merged.parent = None;
        if merged.component_type.is_none() {
            merged.component_type = parent.component_type.clone();
            if merged.views.is_empty() {
                merged.views = parent.views.clone();
            }
        }
        if merged.source.is_none() {
            merged.source = parent.source.clone();
        }
        merged.lifetime = merged.lifetime.or(parent.lifetime);
        merged.lazy_init = merged.lazy_init.or(parent.lazy_init);
        merged.priority = merged.priority.or(parent.priority);
        merged.order = merged.order.or(parent.order);
        if merged.init.is_none() {
            merged.init = parent.init.clone();
        }
        if merged.destroy.is_none() {
            merged.destroy = parent.destroy.clone();
        }
        if merged.origin.is_none() {
            merged.origin = parent.origin.clone();
        }
        for qualifier in &parent.qualifiers {
            if !merged.qualifiers.iter().any(|q| q.kind == qualifier.kind) {
                merged.qualifiers.push(qualifier.clone());
            }
        }
        for (member, value) in &parent.properties {
            if merged.property(member).is_none() {
                merged.properties.push((member.clone(), value.clone()));
            }
        }
        merged
    }
}

/// Resolved constructor arguments, in parameter order.
pub struct ConstructorArgs {
    component: String,
    values: Vec<Resolution>,
}

impl ConstructorArgs {
    pub(crate) fn new(component: &str, values: Vec<Resolution>) -> Self {
        Self {
            component: component.to_string(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&self, index: usize) -> DiResult<Resolution> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| DiError::InvalidDefinition {
                name: self.component.clone(),
                reason: format!("constructor has no argument at position {}", index),
            })
    }

    pub fn required<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        self.take(index)?.into_required::<T>()
    }

    pub fn optional<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        self.take(index)?.into_optional::<T>()
    }

    pub fn all<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<T>>> {
        self.take(index)?.into_vec::<T>()
    }

    pub fn provider<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Provider<T>> {
        self.take(index)?.into_provider::<T>()
    }

    /// The raw resolution at `index`, for shapes the typed helpers do not cover.
    pub fn resolution(&self, index: usize) -> DiResult<Resolution> {
        self.take(index)
    }
}

/// Typed builder for a [`ComponentDefinition`] whose concrete type is `T`.
///
/// The builder records the identity view of `T` plus any trait views added
/// with [`expose`](Self::expose), so the definition becomes a candidate for
/// `T` and for each exposed trait.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentBuilder, ComponentCollection, DependencyDescriptor, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// struct Host { greeter: Arc<dyn Greeter> }
///
/// let mut components = ComponentCollection::new();
/// components.add_component(
///     "english",
///     ComponentBuilder::<English>::new()
///         .supplier(|_| Ok(English))
///         .expose::<dyn Greeter>(|e| e as Arc<dyn Greeter>),
/// );
/// components.add_component(
///     "host",
///     ComponentBuilder::<Host>::new().constructor(
///         vec![DependencyDescriptor::of::<dyn Greeter>()],
///         |args| Ok(Host { greeter: args.required::<dyn Greeter>(0)? }),
///     ),
/// );
///
/// let container = components.build().unwrap();
/// assert_eq!(container.get::<Host>().unwrap().greeter.greet(), "hello");
/// ```
pub struct ComponentBuilder<T> {
    definition: ComponentDefinition,
    component_type: ResolvableType,
    constructors: Vec<Constructor>,
    extra_views: Vec<TypeView>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Default for ComponentBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> ComponentBuilder<T> {
    pub fn new() -> Self {
        Self {
            definition: ComponentDefinition::new(),
            component_type: ResolvableType::of::<T>(),
            constructors: Vec::new(),
            extra_views: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Always hands out `instance` itself.
    pub fn instance(self, instance: Arc<T>) -> Self {
        self.supplier_arc(move |_| Ok(instance.clone()))
    }

    pub fn supplier<F>(self, supplier: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.supplier_arc(move |ctx| supplier(ctx).map(Arc::new))
    }

    pub fn supplier_arc<F>(mut self, supplier: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.definition.source = Some(InstanceSource::Supplier(Arc::new(move |ctx: &ResolverContext<'_>| {
            supplier(ctx).map(|instance| instance as AnyArc)
        })));
        self
    }

    /// Adds a constructor candidate; may be called more than once.
    pub fn constructor<F>(mut self, params: Vec<DependencyDescriptor>, build: F) -> Self
    where
        F: Fn(ConstructorArgs) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor::new(params, move |args| {
            build(args).map(|instance| Arc::new(instance) as AnyArc)
        }));
        self
    }

    /// Builds `T` from the component named `owner`, whose concrete type is `O`.
    pub fn factory_method<O, F>(mut self, owner: impl Into<String>, build: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(Arc<O>, &ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        let owner = owner.into();
        let owner_name = owner.clone();
        self.definition.source = Some(InstanceSource::FactoryMethod {
            owner,
            build: Arc::new(move |instance: AnyArc, ctx: &ResolverContext<'_>| {
                let typed = instance.downcast::<O>().map_err(|_| DiError::TypeMismatch {
                    name: owner_name.clone(),
                    required_type: std::any::type_name::<O>().to_string(),
                    actual_type: "<factory owner of another type>".to_string(),
                })?;
                build(typed, ctx).map(|built| Arc::new(built) as AnyArc)
            }),
        });
        self
    }

    /// Makes the component a candidate for `I` as well.
    pub fn expose<I>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.extra_views.push(TypeView::upcast::<T, I>(upcast));
        self
    }

    /// Like [`expose`](Self::expose), with generic metadata for `I`, e.g.
    /// `dyn Repository` carrying the argument `User`.
    pub fn expose_generic<I>(mut self, generics: Vec<ResolvableType>, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let target = ResolvableType::of::<I>().with_generics(generics);
        self.extra_views.push(TypeView::upcast_as::<T, I>(target, upcast));
        self
    }

    /// Generic metadata for `T` itself.
    pub fn generic_type(mut self, generics: Vec<ResolvableType>) -> Self {
        self.component_type = ResolvableType::of::<T>().with_generics(generics);
        self
    }

    pub fn singleton(mut self) -> Self {
        self.definition.lifetime = Some(Lifetime::Singleton);
        self
    }

    pub fn prototype(mut self) -> Self {
        self.definition.lifetime = Some(Lifetime::Prototype);
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.definition.lazy_init = Some(lazy);
        self
    }

    pub fn primary(mut self) -> Self {
        self.definition.primary = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.definition.priority = Some(priority);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.definition.order = Some(order);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.definition.depends_on.push(name.into());
        self
    }

    pub fn autowire_candidate(mut self, eligible: bool) -> Self {
        self.definition.autowire_candidate = eligible;
        self
    }

    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.definition.qualifiers.push(qualifier);
        self
    }

    pub fn property(mut self, member: impl Into<String>, value: PropertyValue) -> Self {
        self.definition.properties.push((member.into(), value));
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.definition.parent = Some(parent.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.definition.role = role;
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.definition.origin = Some(origin.into());
        self
    }

    /// Called once the instance is populated, before initialization
    /// processors see it.
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn(&T) -> DiResult<()> + Send + Sync + 'static,
    {
        self.definition.init = Some(Arc::new(move |instance: &AnyArc| {
            match (**instance).downcast_ref::<T>() {
                Some(typed) => init(typed),
                None => Err(DiError::TypeMismatch {
                    name: std::any::type_name::<T>().to_string(),
                    required_type: std::any::type_name::<T>().to_string(),
                    actual_type: "<substituted instance>".to_string(),
                }),
            }
        }));
        self
    }

    /// Called when the singleton is destroyed; skipped for substituted
    /// instances of another type.
    pub fn destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.definition.destroy = Some(Arc::new(move |instance: &AnyArc| {
            match (**instance).downcast_ref::<T>() {
                Some(typed) => destroy(typed),
                None => warn!(
                    component_type = std::any::type_name::<T>(),
                    "Destroy callback skipped for a substituted instance"
                ),
            }
        }));
        self
    }

    pub fn build(mut self) -> ComponentDefinition {
        if !self.constructors.is_empty() {
            self.definition.source = Some(InstanceSource::Constructors(self.constructors));
        }
        let mut views = vec![TypeView::identity_as::<T>(self.component_type.clone())];
        views.extend(self.extra_views);
        self.definition.views = views;
        self.definition.component_type = Some(self.component_type);
        self.definition
    }
}

impl<T: Send + Sync + 'static> From<ComponentBuilder<T>> for ComponentDefinition {
    fn from(builder: ComponentBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    fn supplied() -> ComponentDefinition {
        ComponentBuilder::<Widget>::new().supplier(|_| Ok(Widget)).build()
    }

    #[test]
    fn test_validate_requires_a_source() {
        let err = ComponentDefinition::new().validate("widget").unwrap_err();
        assert!(matches!(err, DiError::InvalidDefinition { .. }));
        assert!(supplied().validate("widget").is_ok());
    }

    #[test]
    fn test_abstract_template_needs_no_source() {
        let mut template = ComponentDefinition::new();
        template.is_abstract = true;
        assert!(template.validate("template").is_ok());
    }

    #[test]
    fn test_merge_inherits_unset_fields() {
        let mut parent = supplied();
        parent.lifetime = Some(Lifetime::Prototype);
        parent.priority = Some(3);
        parent.qualifiers.push(Qualifier::new("region", "eu"));
        parent.primary = true;

        let mut child = ComponentDefinition::child_of("parent");
        child.priority = Some(1);

        let merged = child.merged_over(&parent);
        assert_eq!(merged.lifetime(), Lifetime::Prototype);
        assert_eq!(merged.priority, Some(1));
        assert!(merged.source.is_some());
        assert!(merged.has_qualifier(&Qualifier::new("region", "eu")));
        assert!(!merged.primary);
        assert!(merged.parent.is_none());
        assert_eq!(merged.concrete_type(), Some(TypeKey::of::<Widget>()));
    }

    #[test]
    fn test_builder_records_identity_view() {
        let definition = supplied();
        assert_eq!(definition.views.len(), 1);
        assert_eq!(definition.views[0].target(), &ResolvableType::of::<Widget>());
        assert!(definition.autowire_candidate);
    }

    #[test]
    fn test_factory_owner_is_exposed() {
        struct Factory;
        let definition = ComponentBuilder::<Widget>::new()
            .factory_method::<Factory, _>("widget_factory", |_, _| Ok(Widget))
            .build();
        assert_eq!(definition.factory_owner(), Some("widget_factory"));
    }
}
