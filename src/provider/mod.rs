//! The container: registration surface, lookups and shutdown.
//!
//! [`Container`] is a cheap handle over the shared state. Component
//! creation lives in `lifecycle`, candidate search in
//! [`resolver`](crate::resolver).

use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::{concrete_type_of, AnyArc, TypeCatalog, TypeView};
use crate::config::ContainerConfig;
use crate::definition::ComponentDefinition;
use crate::descriptors::DependencyDescriptor;
use crate::injection::{Injector, StructureRegistry, TypeStructure};
use crate::key::{MatchMode, ResolvableType, TypeKey};
use crate::metrics::{MetricsSnapshot, ResolutionMetrics};
use crate::processor::{OnDefinitionReset, OnDestroy, OnEarlyExpose, OnInitialize, OnInstantiate, OnPopulate, ProcessorChain};
use crate::registry::{DefinitionRegistry, RegisterOutcome, TypeProbe};
use crate::resolver::Resolution;
use crate::singletons::SingletonRegistry;
use crate::traits::ResolverCore;
use crate::DiResult;

pub mod context;
pub mod deferred;
mod lifecycle;

pub use context::ResolverContext;
pub use deferred::{ComponentProvider, Provider};

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(1);

/// Dependency injection container.
///
/// Holds definitions, singleton instances, the type catalog and the
/// processor chain. Cloning is cheap and every clone sees the same state.
/// Lookups and creation are safe from any number of threads; singleton
/// creation is single-flight per name.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ComponentBuilder, Container, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// let container = Container::new();
/// container
///     .register_definition(
///         "database",
///         ComponentBuilder::<Database>::new().supplier(|_| Ok(Database { url: "postgres://localhost".into() })),
///     )
///     .unwrap();
///
/// let first = container.get::<Database>().unwrap();
/// let second = container.get_named::<Database>("database").unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(first.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) id: usize,
    pub(crate) this: Weak<ContainerInner>,
    pub(crate) config: ContainerConfig,
    pub(crate) registry: DefinitionRegistry,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) catalog: TypeCatalog,
    pub(crate) resolvable: DashMap<TypeId, (TypeKey, AnyArc)>,
    pub(crate) structures: Arc<StructureRegistry>,
    pub(crate) injector: Arc<Injector>,
    pub(crate) processors: RwLock<Arc<ProcessorChain>>,
    pub(crate) metrics: ResolutionMetrics,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let structures = Arc::new(StructureRegistry::new());
        let injector = Arc::new(Injector::new(structures.clone()));
        let mut chain = ProcessorChain::new();
        chain.add_populate(injector.clone());
        chain.add_reset(injector.clone());

        let inner = Arc::new_cyclic(|this| ContainerInner {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            this: this.clone(),
            registry: DefinitionRegistry::new(&config),
            config,
            singletons: SingletonRegistry::new(),
            catalog: TypeCatalog::new(),
            resolvable: DashMap::new(),
            structures,
            injector,
            processors: RwLock::new(Arc::new(chain)),
            metrics: ResolutionMetrics::new(),
        });
        Self { inner }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Registers `definition` under `name`.
    ///
    /// Replacing a definition (or one its merged view inherits from)
    /// destroys the affected singletons and notifies reset processors.
    pub fn register_definition(
        &self,
        name: &str,
        definition: impl Into<ComponentDefinition>,
    ) -> DiResult<RegisterOutcome> {
        let definition = definition.into();
        let previous = self.previous_definition(name);
        let concrete = definition.concrete_type();
        let views = definition.views.clone();

        // Views first, so no type query can cache a result without them
        if let Some(concrete) = concrete {
            for view in views {
                self.inner.catalog.register(concrete, view);
            }
        }
        let outcome = self.inner.registry.register(name, definition)?;
        if outcome.replaced || self.inner.singletons.contains(name) {
            self.inner.reset_components(name, previous, &outcome.invalidated);
        }
        Ok(outcome)
    }

    /// Removes the definition `name`, destroying its singleton and those
    /// of definitions inheriting from it.
    pub fn remove_definition(&self, name: &str) -> DiResult<()> {
        let previous = self.previous_definition(name);
        let invalidated = self.inner.registry.remove(name)?;
        self.inner.reset_components(name, previous, &invalidated);
        Ok(())
    }

    fn previous_definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        if self.inner.registry.is_alias(name) {
            None
        } else {
            self.inner.registry.get(name).ok()
        }
    }

    pub fn register_alias(&self, name: &str, alias: &str) -> DiResult<()> {
        self.inner.registry.register_alias(name, alias)
    }

    /// Registers an already created instance under `name`. It takes part in
    /// type search as a `T` without having a definition.
    pub fn register_singleton<T: Send + Sync + 'static>(&self, name: &str, instance: Arc<T>) -> DiResult<()> {
        self.inner.catalog.register(TypeKey::of::<T>(), TypeView::identity::<T>());
        self.inner.registry.invalidate_type_cache();
        self.inner.singletons.register_manual(name, instance)?;
        debug!(name, type_name = std::any::type_name::<T>(), "Registered singleton instance");
        Ok(())
    }

    /// Lets components of concrete type `C` be resolved as `I`.
    pub fn expose<C, I>(&self, upcast: fn(Arc<C>) -> Arc<I>)
    where
        C: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        self.inner.catalog.register(TypeKey::of::<C>(), TypeView::upcast::<C, I>(upcast));
        self.inner.registry.invalidate_type_cache();
    }

    /// Registers `value` as the answer for dependencies on exactly `T`,
    /// without a component name.
    pub fn register_resolvable_dependency<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        let key = TypeKey::of::<T>();
        self.inner.resolvable.insert(key.id(), (key, Arc::new(value) as AnyArc));
        debug!(type_name = key.name(), "Registered resolvable dependency");
    }

    /// Adds injection metadata for a type; cached scans are dropped.
    pub fn register_structure(&self, structure: TypeStructure) {
        self.inner.structures.insert(structure);
        self.inner.injector.clear_cache();
    }

    fn update_processors<F: FnOnce(&mut ProcessorChain)>(&self, update: F) {
        let mut guard = self.inner.processors.write();
        let mut chain = (**guard).clone();
        update(&mut chain);
        *guard = Arc::new(chain);
    }

    pub fn add_instantiate_processor(&self, processor: Arc<dyn OnInstantiate>) {
        self.update_processors(|chain| chain.add_instantiate(processor));
    }

    pub fn add_early_expose_processor(&self, processor: Arc<dyn OnEarlyExpose>) {
        self.update_processors(|chain| chain.add_early_expose(processor));
    }

    pub fn add_populate_processor(&self, processor: Arc<dyn OnPopulate>) {
        self.update_processors(|chain| chain.add_populate(processor));
    }

    pub fn add_initialize_processor(&self, processor: Arc<dyn OnInitialize>) {
        self.update_processors(|chain| chain.add_initialize(processor));
    }

    pub fn add_destroy_processor(&self, processor: Arc<dyn OnDestroy>) {
        self.update_processors(|chain| chain.add_destroy(processor));
    }

    pub fn add_reset_processor(&self, processor: Arc<dyn OnDefinitionReset>) {
        self.update_processors(|chain| chain.add_reset(processor));
    }

    pub(crate) fn add_processors(&self, processors: ProcessorChain) {
        self.update_processors(|chain| chain.extend(processors));
    }

    /// The component `name` (or an alias of it), created on first request.
    /// The value is the instance as stored; use
    /// [`Resolver::get_named`](crate::Resolver::get_named) for a typed handle.
    pub fn get_component(&self, name: &str) -> DiResult<AnyArc> {
        self.inner.get_component_for(name, None)
    }

    /// Names of definitions usable as `required`, in registration order.
    pub fn names_of_type(&self, required: &ResolvableType, include_non_singletons: bool, allow_eager_init: bool) -> Vec<String> {
        self.inner
            .registry
            .names_of_type(required, include_non_singletons, allow_eager_init, &*self.inner)
            .to_vec()
    }

    /// Freezes the configuration; type queries are cached from now on.
    pub fn freeze_configuration(&self) {
        self.inner.registry.freeze();
    }

    pub fn is_configuration_frozen(&self) -> bool {
        self.inner.registry.is_frozen()
    }

    /// Freezes the configuration and creates every non-abstract, non-lazy
    /// singleton in registration order.
    pub fn preinstantiate_singletons(&self) -> DiResult<()> {
        self.inner.registry.freeze();
        self.inner.registry.mark_creation_started();
        let names = self.inner.registry.names();
        let mut created = 0usize;
        for name in names.iter() {
            let definition = self.inner.registry.merged(name)?;
            if definition.is_abstract || !definition.is_singleton() || definition.is_lazy() {
                continue;
            }
            self.inner.get_component_for(name, None)?;
            created += 1;
        }
        info!(count = created, "Pre-instantiated singletons");
        Ok(())
    }

    /// Destroys the singleton `name` and, before it, its dependents.
    pub fn destroy_singleton(&self, name: &str) {
        let canonical = self.inner.registry.canonical_name(name);
        self.inner.singletons.destroy(&canonical);
    }

    /// Destroys every singleton, most recently created first.
    pub fn destroy_singletons(&self) {
        let count = self.inner.singletons.len();
        self.inner.singletons.destroy_all();
        info!(count, "Destroyed singletons");
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn contains_definition(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    /// The definition as registered.
    pub fn definition(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        self.inner.registry.get(name)
    }

    /// The definition layered over its parents.
    pub fn merged_definition(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        self.inner.registry.merged(name)
    }

    pub fn definition_names(&self) -> Vec<String> {
        self.inner.registry.names().to_vec()
    }

    pub fn aliases(&self, name: &str) -> Vec<String> {
        self.inner.registry.aliases_of(&self.inner.registry.canonical_name(name))
    }

    pub fn canonical_name(&self, name: &str) -> String {
        self.inner.registry.canonical_name(name)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.inner.singletons.contains(&self.inner.registry.canonical_name(name))
    }

    /// Committed singleton names, in creation order.
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.singletons.names()
    }

    /// Names of the components that resolved `name` as a dependency.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.inner.singletons.dependents_of(&self.inner.registry.canonical_name(name))
    }

    /// Names of the components `name` resolved as dependencies.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.inner.singletons.dependencies_of(&self.inner.registry.canonical_name(name))
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = self.inner.registry.to_debug_string();
        s.push_str("=== Singletons ===\n");
        for name in self.inner.singletons.names() {
            s.push_str(&format!("  {}\n", name));
        }
        s
    }
}

impl ContainerInner {
    /// Destroys the singletons of `invalidated` and tells reset processors.
    fn reset_components(&self, name: &str, previous: Option<Arc<ComponentDefinition>>, invalidated: &[String]) {
        let processors = self.processor_chain();
        for affected in invalidated {
            let before = if affected == name {
                previous.clone()
            } else {
                self.registry.get(affected).ok()
            };
            self.singletons.destroy(affected);
            for processor in &processors.reset {
                processor.reset_definition(affected, before.as_deref());
            }
            debug!(component = %affected, "Reset component definition");
        }
    }
}

impl TypeProbe for ContainerInner {
    fn instantiated_type(&self, name: &str) -> Option<TypeId> {
        self.singletons
            .get(name)
            .or_else(|| self.singletons.early_object(name))
            .map(|instance| concrete_type_of(&instance))
    }

    fn eager_type(&self, name: &str) -> Option<TypeId> {
        if self.singletons.is_in_creation(name) {
            return None;
        }
        match self.get_component_for(name, None) {
            Ok(instance) => Some(concrete_type_of(&instance)),
            Err(e) => {
                debug!(component = name, error = %e, "Eager creation for type matching failed; skipping candidate");
                None
            }
        }
    }

    fn type_matches(&self, concrete: TypeId, required: &ResolvableType) -> bool {
        self.catalog.matches(concrete, required, MatchMode::Fallback)
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 && self.inner.singletons.has_disposers() {
            warn!("Container dropped with undestroyed singletons; call destroy_singletons() before dropping");
        }
    }
}

impl ResolverCore for Container {
    fn resolve(&self, descriptor: &DependencyDescriptor) -> DiResult<Resolution> {
        self.inner
            .resolve_dependency(descriptor, None)
            .map(|(resolution, _)| resolution)
    }

    fn resolve_named(&self, name: &str, required: &ResolvableType) -> DiResult<AnyArc> {
        self.inner.resolve_named_for(name, required, None)
    }
}
