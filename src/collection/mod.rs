//! Component collection module for dependency injection.
//!
//! This module contains the ComponentCollection type, which gathers
//! definitions, aliases, instances and processors and then builds a
//! [`Container`] from them.

use std::sync::Arc;

use crate::config::ContainerConfig;
use crate::definition::{ComponentBuilder, ComponentDefinition};
use crate::injection::TypeStructure;
use crate::key::default_name;
use crate::processor::{
    OnDefinitionReset, OnDestroy, OnEarlyExpose, OnInitialize, OnInstantiate, OnPopulate, ProcessorChain,
};
use crate::provider::{Container, ResolverContext};
use crate::DiResult;

pub mod module_system;
pub use module_system::*;

type Action = Box<dyn FnOnce(&Container) -> DiResult<()> + Send>;

enum Entry {
    Definition(String, ComponentDefinition),
    Alias { name: String, alias: String },
    Action(Action),
}

/// Registration surface for a [`Container`].
///
/// Registrations are recorded in order and applied by [`build`](Self::build),
/// which reports the first one the container rejects.
pub struct ComponentCollection {
    config: ContainerConfig,
    entries: Vec<Entry>,
    processors: ProcessorChain,
    eager: bool,
}

impl Default for ComponentCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentCollection {
    /// Creates an empty collection with the default configuration.
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
            entries: Vec::new(),
            processors: ProcessorChain::new(),
            eager: false,
        }
    }

    pub fn with_config(&mut self, config: ContainerConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    // ----- Definitions -----

    /// Registers a definition (or a [`ComponentBuilder`]) under `name`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_ioc::{ComponentBuilder, ComponentCollection, Resolver};
    /// struct Mailer;
    ///
    /// let mut components = ComponentCollection::new();
    /// components.add_component(
    ///     "mailer",
    ///     ComponentBuilder::<Mailer>::new().supplier(|_| Ok(Mailer)).lazy(true),
    /// );
    /// let container = components.build().unwrap();
    /// assert!(container.get_named::<Mailer>("mailer").is_ok());
    /// ```
    pub fn add_component(&mut self, name: &str, definition: impl Into<ComponentDefinition>) -> &mut Self {
        self.entries
            .push(Entry::Definition(name.to_string(), definition.into()));
        self
    }

    pub fn add_alias(&mut self, name: &str, alias: &str) -> &mut Self {
        self.entries.push(Entry::Alias {
            name: name.to_string(),
            alias: alias.to_string(),
        });
        self
    }

    // ----- Concrete Type Registrations -----

    /// Registers `value` as a singleton named after its type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_ioc::ComponentCollection;
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut components = ComponentCollection::new();
    /// components.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// assert_eq!(components.definition_names(), vec!["config".to_string()]);
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add_named_singleton(&default_name::<T>(), value)
    }

    pub fn add_named_singleton<T: Send + Sync + 'static>(&mut self, name: &str, value: T) -> &mut Self {
        self.add_component(
            name,
            ComponentBuilder::<T>::new().instance(Arc::new(value)).singleton(),
        )
    }

    /// Registers a singleton factory called once, on first request.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_named_singleton_factory(&default_name::<T>(), factory)
    }

    /// Registers a factory called on every request; results are not cached.
    pub fn add_prototype_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_named_prototype_factory(&default_name::<T>(), factory)
    }

    pub fn add_named_singleton_factory<T, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_component(name, ComponentBuilder::<T>::new().supplier(factory).singleton())
    }

    pub fn add_named_prototype_factory<T, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_component(name, ComponentBuilder::<T>::new().supplier(factory).prototype())
    }

    // ----- Instances and type metadata -----

    /// Registers an existing instance without a definition.
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, name: &str, instance: Arc<T>) -> &mut Self {
        let name = name.to_string();
        self.entries.push(Entry::Action(Box::new(move |container: &Container| {
            container.register_singleton(&name, instance)
        })));
        self
    }

    /// Registers the answer for dependencies on exactly `T`.
    pub fn add_resolvable_dependency<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.entries.push(Entry::Action(Box::new(move |container: &Container| {
            container.register_resolvable_dependency::<T>(value);
            Ok(())
        })));
        self
    }

    pub fn add_structure(&mut self, structure: TypeStructure) -> &mut Self {
        self.entries.push(Entry::Action(Box::new(move |container: &Container| {
            container.register_structure(structure);
            Ok(())
        })));
        self
    }

    /// Lets components of concrete type `C` be resolved as `I`.
    pub fn expose<C, I>(&mut self, upcast: fn(Arc<C>) -> Arc<I>) -> &mut Self
    where
        C: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        self.entries.push(Entry::Action(Box::new(move |container: &Container| {
            container.expose::<C, I>(upcast);
            Ok(())
        })));
        self
    }

    // ----- Processors -----

    pub fn add_instantiate_processor(&mut self, processor: Arc<dyn OnInstantiate>) -> &mut Self {
        self.processors.add_instantiate(processor);
        self
    }

    pub fn add_early_expose_processor(&mut self, processor: Arc<dyn OnEarlyExpose>) -> &mut Self {
        self.processors.add_early_expose(processor);
        self
    }

    pub fn add_populate_processor(&mut self, processor: Arc<dyn OnPopulate>) -> &mut Self {
        self.processors.add_populate(processor);
        self
    }

    pub fn add_initialize_processor(&mut self, processor: Arc<dyn OnInitialize>) -> &mut Self {
        self.processors.add_initialize(processor);
        self
    }

    pub fn add_destroy_processor(&mut self, processor: Arc<dyn OnDestroy>) -> &mut Self {
        self.processors.add_destroy(processor);
        self
    }

    pub fn add_reset_processor(&mut self, processor: Arc<dyn OnDefinitionReset>) -> &mut Self {
        self.processors.add_reset(processor);
        self
    }

    /// Creates every non-lazy singleton during [`build`](Self::build).
    pub fn eager_singletons(&mut self) -> &mut Self {
        self.eager = true;
        self
    }

    /// Names of the definitions registered so far, in order.
    pub fn definition_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Definition(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the container, applying every registration in order.
    pub fn build(self) -> DiResult<Container> {
        let container = Container::with_config(self.config);
        container.add_processors(self.processors);
        for entry in self.entries {
            match entry {
                Entry::Definition(name, definition) => {
                    container.register_definition(&name, definition)?;
                }
                Entry::Alias { name, alias } => container.register_alias(&name, &alias)?,
                Entry::Action(apply) => apply(&container)?,
            }
        }
        if self.eager {
            container.preinstantiate_singletons()?;
        }
        Ok(container)
    }
}
