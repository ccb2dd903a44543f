//! Component creation: lookup, instantiation, early exposure, population,
//! initialization and disposal registration.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::catalog::AnyArc;
use crate::definition::{ComponentDefinition, Constructor, ConstructorArgs, InstanceSource};
use crate::error::Phase;
use crate::internal::CreationGuard;
use crate::processor::{LifecycleContext, ProcessorChain};
use crate::provider::{ContainerInner, ResolverContext};
use crate::singletons::same_instance;
use crate::{DiError, DiResult};

impl ContainerInner {
    pub(crate) fn processor_chain(&self) -> Arc<ProcessorChain> {
        self.processors.read().clone()
    }

    /// Returns the component `name`, creating it if needed, and records
    /// `requesting` as its dependent.
    pub(crate) fn get_component_for(&self, name: &str, requesting: Option<&str>) -> DiResult<AnyArc> {
        let canonical = self.registry.canonical_name(name);
        let instance = self.do_get(&canonical)?;
        if let Some(requesting) = requesting {
            let requesting = self.registry.canonical_name(requesting);
            if requesting != canonical {
                self.singletons.register_dependent(&canonical, &requesting);
                if !self.singletons.contains(&canonical) {
                    if let Some(early) = self.singletons.early_object(&canonical) {
                        if same_instance(&early, &instance) {
                            self.singletons.register_early_holder(&canonical, &requesting);
                        }
                    }
                }
            }
        }
        Ok(instance)
    }

    fn do_get(&self, name: &str) -> DiResult<AnyArc> {
        if let Some(instance) = self.singletons.get_allow_early(name)? {
            return Ok(instance);
        }
        let definition = self.registry.merged(name)?;
        if definition.is_abstract {
            return Err(DiError::InvalidDefinition {
                name: name.to_string(),
                reason: "abstract definitions cannot be instantiated".to_string(),
            });
        }

        for dependency in &definition.depends_on {
            let dependency = self.registry.canonical_name(dependency);
            if self.singletons.is_dependent(name, &dependency) {
                return Err(DiError::CircularConstruction {
                    path: vec![name.to_string(), dependency.clone(), name.to_string()],
                }
                .in_phase(name, Phase::Requested));
            }
            self.singletons.register_dependent(&dependency, name);
            self.get_component_for(&dependency, None)
                .map_err(|e| e.in_phase(name, Phase::Requested))?;
        }

        if definition.is_singleton() {
            let (instance, created) = self.singletons.get_or_create(name, || {
                let _guard = CreationGuard::enter(self.id, name, false)?;
                self.create_component(name, &definition)
            })?;
            if created {
                self.metrics.record_singleton_committed();
            }
            Ok(instance)
        } else {
            let _guard = CreationGuard::enter(self.id, name, true)?;
            self.create_component(name, &definition)
        }
    }

    fn create_component(&self, name: &str, definition: &ComponentDefinition) -> DiResult<AnyArc> {
        self.registry.mark_creation_started();
        let result = self.build_component(name, definition);
        if let Err(e) = &result {
            self.metrics.record_creation_failure();
            debug!(component = name, error = %e, "Component creation failed");
        }
        result
    }

    fn build_component(&self, name: &str, definition: &ComponentDefinition) -> DiResult<AnyArc> {
        let processors = self.processor_chain();
        let ctx = LifecycleContext::new(name, definition, self);

        for processor in &processors.instantiate {
            let substitute = processor
                .before_instantiation(&ctx)
                .map_err(|e| e.in_phase(name, Phase::Instantiating))?;
            if let Some(substitute) = substitute {
                trace!(component = name, "Instantiation short-circuited by a processor");
                self.metrics.record_instance_created();
                let mut current = substitute;
                for processor in &processors.initialize {
                    current = processor
                        .after_init(&ctx, current)
                        .map_err(|e| e.in_phase(name, Phase::Initializing))?;
                }
                return Ok(current);
            }
        }

        trace!(component = name, phase = %Phase::Instantiating, "Lifecycle phase");
        let raw = self
            .instantiate(name, definition)
            .map_err(|e| e.in_phase(name, Phase::Instantiating))?;
        self.metrics.record_instance_created();

        let early_exposed = definition.is_singleton()
            && self.config.allow_circular_references
            && self.singletons.is_in_creation(name);
        if early_exposed {
            trace!(component = name, phase = %Phase::EarlyExposed, "Lifecycle phase");
            let container = self.this.clone();
            let early_name = name.to_string();
            let early_raw = raw.clone();
            self.singletons.add_early_factory(
                name,
                Box::new(move || {
                    let inner = container.upgrade().ok_or(DiError::ContainerDropped)?;
                    inner.early_reference(&early_name, early_raw)
                }),
            );
        }

        trace!(component = name, phase = %Phase::Populating, "Lifecycle phase");
        self.populate(&processors, &ctx, &raw)
            .map_err(|e| e.in_phase(name, Phase::Populating))?;

        trace!(component = name, phase = %Phase::Initializing, "Lifecycle phase");
        let mut exposed = self
            .initialize(&processors, &ctx, raw.clone())
            .map_err(|e| e.in_phase(name, Phase::Initializing))?;

        if early_exposed {
            if let Some(early) = self.singletons.early_object(name) {
                if same_instance(&exposed, &raw) {
                    exposed = early;
                } else if !self.config.allow_raw_injection_despite_wrapping {
                    let holders = self.singletons.early_holders_of(name);
                    if !holders.is_empty() {
                        let mut path = vec![name.to_string()];
                        path.extend(holders);
                        path.push(name.to_string());
                        return Err(DiError::CircularConstruction { path }.in_phase(name, Phase::Initializing));
                    }
                }
            }
        }

        if definition.is_singleton() {
            self.register_disposer(name, definition, &processors, &exposed);
        }
        trace!(component = name, phase = %Phase::Ready, "Lifecycle phase");
        Ok(exposed)
    }

    fn instantiate(&self, name: &str, definition: &ComponentDefinition) -> DiResult<AnyArc> {
        let source = definition.source.as_ref().ok_or_else(|| DiError::InvalidDefinition {
            name: name.to_string(),
            reason: "no supplier, constructor or factory method".to_string(),
        })?;
        match source {
            InstanceSource::Supplier(supplier) => supplier(&ResolverContext::new(self, Some(name))),
            InstanceSource::FactoryMethod { owner, build } => {
                let owner_instance = self.get_component_for(owner, Some(name))?;
                build(owner_instance, &ResolverContext::new(self, Some(name)))
            }
            InstanceSource::Constructors(constructors) => self.construct(name, constructors),
        }
    }

    /// Tries constructors from most to fewest parameters; the first whose
    /// parameters all resolve is used.
    fn construct(&self, name: &str, constructors: &[Constructor]) -> DiResult<AnyArc> {
        let mut ordered: Vec<&Constructor> = constructors.iter().collect();
        ordered.sort_by(|a, b| b.params().len().cmp(&a.params().len()));

        let mut last_unsatisfied = None;
        'candidates: for constructor in ordered {
            let mut values = Vec::with_capacity(constructor.params().len());
            for param in constructor.params() {
                match self.resolve_dependency(param, Some(name)) {
                    Ok((resolution, _)) => values.push(resolution),
                    Err(e) if e.is_unsatisfied() => {
                        trace!(
                            component = name,
                            arity = constructor.params().len(),
                            error = %e,
                            "Constructor not satisfiable"
                        );
                        last_unsatisfied = Some(e);
                        continue 'candidates;
                    }
                    Err(e) => return Err(e),
                }
            }
            return constructor.invoke(ConstructorArgs::new(name, values));
        }
        Err(last_unsatisfied.unwrap_or_else(|| DiError::InvalidDefinition {
            name: name.to_string(),
            reason: "constructor list is empty".to_string(),
        }))
    }

    fn populate(&self, processors: &ProcessorChain, ctx: &LifecycleContext<'_>, raw: &AnyArc) -> DiResult<()> {
        for processor in &processors.instantiate {
            if !processor.after_instantiation(ctx, raw)? {
                trace!(component = ctx.name(), "Population vetoed by a processor");
                return Ok(());
            }
        }
        for processor in &processors.populate {
            processor.populate(ctx, raw)?;
        }
        Ok(())
    }

    fn initialize(&self, processors: &ProcessorChain, ctx: &LifecycleContext<'_>, raw: AnyArc) -> DiResult<AnyArc> {
        let mut current = raw;
        for processor in &processors.initialize {
            current = processor.before_init(ctx, current)?;
        }
        if let Some(init) = &ctx.definition().init {
            init(&current)?;
        }
        for processor in &processors.initialize {
            current = processor.after_init(ctx, current)?;
        }
        Ok(current)
    }

    /// Wraps `raw` with every early-exposure processor.
    pub(crate) fn early_reference(&self, name: &str, raw: AnyArc) -> DiResult<AnyArc> {
        let mut current = raw;
        for processor in &self.processor_chain().early_expose {
            current = processor
                .early_reference(name, current)
                .map_err(|e| e.in_phase(name, Phase::EarlyExposed))?;
        }
        self.metrics.record_early_reference();
        Ok(current)
    }

    fn register_disposer(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        processors: &Arc<ProcessorChain>,
        instance: &AnyArc,
    ) {
        let destroy = definition.destroy.clone();
        if destroy.is_none() && processors.destroy.is_empty() {
            return;
        }
        let chain = processors.clone();
        let instance = instance.clone();
        let component = name.to_string();
        self.singletons.register_disposer(
            name,
            Box::new(move || {
                for processor in &chain.destroy {
                    if let Err(e) = processor.before_destroy(&component, &instance) {
                        warn!(component = %component, error = %e, "Destruction processor failed");
                    }
                }
                if let Some(destroy) = destroy {
                    destroy(&instance);
                }
            }),
        );
    }
}
