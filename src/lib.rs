//! # ferrous-ioc
//!
//! A name-keyed inversion-of-control container for Rust: definitions are
//! registered under names, singletons are cached, dependencies are resolved
//! by type with qualifier and priority disambiguation, and instances move
//! through a fixed lifecycle that pluggable processors can observe or
//! replace.
//!
//! ## Features
//!
//! - **Named definitions**: aliases, parent definitions and override policy
//! - **Type search**: concrete types and exposed trait objects, qualifiers, primary and priority rules
//! - **Collection shapes**: ordered lists, name-keyed maps and deferred providers
//! - **Singleton caching**: single-flight creation and early references that break field-injection cycles
//! - **Lifecycle processors**: short-circuit, populate, initialize and destroy hooks
//! - **Field injection**: declared injection points, shortcut caching and explicit property values
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{ComponentCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut components = ComponentCollection::new();
//! components.add_singleton(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! components.add_prototype_factory::<UserService, _>(|resolver| {
//!     Ok(UserService {
//!         db: resolver.get::<Database>()?,
//!     })
//! });
//!
//! let container = components.build().unwrap();
//! let user_service = container.get::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: created once per container and cached under its name
//! - **Prototype**: created fresh on every request, never cached
//!
//! ## Trait Resolution
//!
//! ```rust
//! use ferrous_ioc::{ComponentBuilder, ComponentCollection, Qualifier, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn prefix(&self) -> &str;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn prefix(&self) -> &str { "console" }
//! }
//!
//! struct FileLogger;
//! impl Logger for FileLogger {
//!     fn prefix(&self) -> &str { "file" }
//! }
//!
//! let mut components = ComponentCollection::new();
//! components.add_component(
//!     "console",
//!     ComponentBuilder::<ConsoleLogger>::new()
//!         .supplier(|_| Ok(ConsoleLogger))
//!         .primary()
//!         .expose::<dyn Logger>(|l| l as Arc<dyn Logger>),
//! );
//! components.add_component(
//!     "file",
//!     ComponentBuilder::<FileLogger>::new()
//!         .supplier(|_| Ok(FileLogger))
//!         .expose::<dyn Logger>(|l| l as Arc<dyn Logger>),
//! );
//!
//! let container = components.build().unwrap();
//! assert_eq!(container.get::<dyn Logger>().unwrap().prefix(), "console");
//! let file = container.get_qualified::<dyn Logger>(Qualifier::named("file")).unwrap();
//! assert_eq!(file.prefix(), "file");
//! ```
//!
//! ## Field Injection
//!
//! ```rust
//! use ferrous_ioc::{Autowired, ComponentCollection, InjectionPoint, Resolver, TypeStructure};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! #[derive(Default)]
//! struct Scheduler {
//!     clock: Autowired<Arc<Clock>>,
//! }
//!
//! let mut components = ComponentCollection::new();
//! components.add_singleton(Clock);
//! components.add_singleton_factory::<Scheduler, _>(|_| Ok(Scheduler::default()));
//! components.add_structure(
//!     TypeStructure::of::<Scheduler>()
//!         .point(InjectionPoint::single::<Scheduler, Clock>("clock", |s| &s.clock)),
//! );
//!
//! let container = components.build().unwrap();
//! let scheduler = container.get::<Scheduler>().unwrap();
//! assert!(scheduler.clock.is_set());
//! ```

// Module declarations
pub mod catalog;
pub mod collection;
pub mod config;
pub mod definition;
pub mod descriptors;
pub mod error;
pub mod injection;
pub mod key;
pub mod lifetime;
pub mod metrics;
pub mod processor;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod traits;

// Internal modules
mod internal;
mod singletons;

// Re-export core types
pub use catalog::{downcast_view, AnyArc, TypeCatalog, TypeView};
pub use collection::{ComponentCollection, ComponentCollectionExt, ComponentModule};
pub use config::ContainerConfig;
pub use definition::{
    ComponentBuilder, ComponentDefinition, Constructor, ConstructorArgs, InstanceSource, PropertyValue, Role,
};
pub use descriptors::{DependencyDescriptor, Qualifier, Shape, DEFAULT_QUALIFIER};
pub use error::{DiError, DiResult, Phase};
pub use injection::{Autowired, InjectionPoint, Injector, MetadataSource, StructureRegistry, TypeStructure};
pub use key::{MatchMode, ResolvableType, TypeKey};
pub use lifetime::Lifetime;
pub use metrics::{MetricsSnapshot, ResolutionMetrics};
pub use processor::{
    LifecycleContext, OnDefinitionReset, OnDestroy, OnEarlyExpose, OnInitialize, OnInstantiate, OnPopulate,
    ProcessorChain,
};
pub use provider::{ComponentProvider, Container, Provider, ResolverContext};
pub use registry::{DefinitionRegistry, RegisterOutcome, TypeProbe};
pub use resolver::{Resolution, ResolvedComponent};
pub use traits::{Resolver, ResolverCore};
