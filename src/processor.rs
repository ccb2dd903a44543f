//! Lifecycle extension points.
//!
//! Processors are registered on the container and called, in registration
//! order, at fixed points of every component's creation. Each trait covers
//! one hook family; a processor type implements whichever it needs and is
//! registered once per family.

use std::sync::Arc;

use crate::catalog::AnyArc;
use crate::definition::ComponentDefinition;
use crate::provider::{ContainerInner, ResolverContext};
use crate::DiResult;

/// The component a hook is called for.
pub struct LifecycleContext<'a> {
    name: &'a str,
    definition: &'a ComponentDefinition,
    inner: &'a ContainerInner,
}

impl<'a> LifecycleContext<'a> {
    pub(crate) fn new(name: &'a str, definition: &'a ComponentDefinition, inner: &'a ContainerInner) -> Self {
        Self { name, definition, inner }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// The merged definition being built.
    pub fn definition(&self) -> &ComponentDefinition {
        self.definition
    }

    pub(crate) fn container(&self) -> &'a ContainerInner {
        self.inner
    }

    /// Resolves dependencies on behalf of the component.
    pub fn resolver(&self) -> ResolverContext<'a> {
        ResolverContext::new(self.inner, Some(self.name))
    }
}

/// Hooks around raw instantiation.
pub trait OnInstantiate: Send + Sync {
    /// Returning an instance skips instantiation, population and
    /// `before_init`; only `after_init` processors still see it.
    fn before_instantiation(&self, _ctx: &LifecycleContext<'_>) -> DiResult<Option<AnyArc>> {
        Ok(None)
    }

    /// Returning `false` skips population of this instance.
    fn after_instantiation(&self, _ctx: &LifecycleContext<'_>, _instance: &AnyArc) -> DiResult<bool> {
        Ok(true)
    }
}

/// Substitutes the reference handed out to cycle participants.
///
/// Implementations that wrap instances in `after_init` should return the
/// same wrapper here, so early holders and the committed result agree.
pub trait OnEarlyExpose: Send + Sync {
    fn early_reference(&self, name: &str, instance: AnyArc) -> DiResult<AnyArc>;
}

/// Property population: autowiring of injection points and explicit values.
pub trait OnPopulate: Send + Sync {
    fn populate(&self, ctx: &LifecycleContext<'_>, instance: &AnyArc) -> DiResult<()>;
}

/// Initialization hooks; may substitute the instance.
pub trait OnInitialize: Send + Sync {
    fn before_init(&self, _ctx: &LifecycleContext<'_>, instance: AnyArc) -> DiResult<AnyArc> {
        Ok(instance)
    }

    fn after_init(&self, _ctx: &LifecycleContext<'_>, instance: AnyArc) -> DiResult<AnyArc> {
        Ok(instance)
    }
}

/// Runs before a singleton's own destroy callback.
pub trait OnDestroy: Send + Sync {
    fn before_destroy(&self, name: &str, instance: &AnyArc) -> DiResult<()>;
}

/// Told when a definition is replaced or removed, or its parent changed.
/// `previous` is the definition that was in effect, if any.
pub trait OnDefinitionReset: Send + Sync {
    fn reset_definition(&self, name: &str, previous: Option<&ComponentDefinition>);
}

/// Registered processors, grouped by hook family.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    pub(crate) instantiate: Vec<Arc<dyn OnInstantiate>>,
    pub(crate) early_expose: Vec<Arc<dyn OnEarlyExpose>>,
    pub(crate) populate: Vec<Arc<dyn OnPopulate>>,
    pub(crate) initialize: Vec<Arc<dyn OnInitialize>>,
    pub(crate) destroy: Vec<Arc<dyn OnDestroy>>,
    pub(crate) reset: Vec<Arc<dyn OnDefinitionReset>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instantiate(&mut self, processor: Arc<dyn OnInstantiate>) {
        self.instantiate.push(processor);
    }

    pub fn add_early_expose(&mut self, processor: Arc<dyn OnEarlyExpose>) {
        self.early_expose.push(processor);
    }

    pub fn add_populate(&mut self, processor: Arc<dyn OnPopulate>) {
        self.populate.push(processor);
    }

    pub fn add_initialize(&mut self, processor: Arc<dyn OnInitialize>) {
        self.initialize.push(processor);
    }

    pub fn add_destroy(&mut self, processor: Arc<dyn OnDestroy>) {
        self.destroy.push(processor);
    }

    pub fn add_reset(&mut self, processor: Arc<dyn OnDefinitionReset>) {
        self.reset.push(processor);
    }

    /// Appends every processor of `other` after this chain's own.
    pub fn extend(&mut self, other: ProcessorChain) {
        self.instantiate.extend(other.instantiate);
        self.early_expose.extend(other.early_expose);
        self.populate.extend(other.populate);
        self.initialize.extend(other.initialize);
        self.destroy.extend(other.destroy);
        self.reset.extend(other.reset);
    }

    pub fn is_empty(&self) -> bool {
        self.instantiate.is_empty()
            && self.early_expose.is_empty()
            && self.populate.is_empty()
            && self.initialize.is_empty()
            && self.destroy.is_empty()
            && self.reset.is_empty()
    }
}
