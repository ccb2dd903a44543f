//! Resolver traits for component resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{downcast_view, AnyArc};
use crate::descriptors::{DependencyDescriptor, Qualifier};
use crate::error::{DiError, DiResult};
use crate::key::ResolvableType;
use crate::provider::Provider;
use crate::resolver::Resolution;

/// Core resolver trait for object-safe component resolution.
///
/// Implemented by [`Container`](crate::Container) and by the
/// [`ResolverContext`](crate::ResolverContext) handed to instance sources.
/// Most callers use the generic methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves a dependency descriptor through the full candidate search.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution)` - The matched value(s) or a deferred handle
    /// * `Err(DiError)` - No match, ambiguity, or a creation failure
    fn resolve(&self, descriptor: &DependencyDescriptor) -> DiResult<Resolution>;

    /// Fetches the component `name` as a view value of `required`, without
    /// a candidate search.
    fn resolve_named(&self, name: &str, required: &ResolvableType) -> DiResult<AnyArc>;
}

/// High-level resolver interface with typed methods.
///
/// Every method accepts concrete types and trait objects alike: `T` is
/// whatever the component was registered or exposed as.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ComponentBuilder, ComponentCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Plugin: Send + Sync {
///     fn name(&self) -> &str;
/// }
///
/// struct PluginA;
/// impl Plugin for PluginA {
///     fn name(&self) -> &str { "Plugin A" }
/// }
///
/// struct PluginB;
/// impl Plugin for PluginB {
///     fn name(&self) -> &str { "Plugin B" }
/// }
///
/// let mut components = ComponentCollection::new();
/// components.add_component(
///     "plugin_b",
///     ComponentBuilder::<PluginB>::new()
///         .supplier(|_| Ok(PluginB))
///         .order(2)
///         .expose::<dyn Plugin>(|p| p as Arc<dyn Plugin>),
/// );
/// components.add_component(
///     "plugin_a",
///     ComponentBuilder::<PluginA>::new()
///         .supplier(|_| Ok(PluginA))
///         .order(1)
///         .expose::<dyn Plugin>(|p| p as Arc<dyn Plugin>),
/// );
///
/// let container = components.build().unwrap();
/// let plugins = container.get_all::<dyn Plugin>().unwrap();
/// let names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
/// assert_eq!(names, vec!["Plugin A", "Plugin B"]);
/// assert!(container.get::<dyn Plugin>().is_err());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves exactly one `T`.
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.resolve(&DependencyDescriptor::of::<T>())?.into_required::<T>()
    }

    /// Resolves one `T`, or `None` when nothing matches. Ambiguity is an error.
    fn get_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.resolve(&DependencyDescriptor::optional::<T>())?.into_optional::<T>()
    }

    /// Resolves exactly one `T` carrying `qualifier`.
    fn get_qualified<T: ?Sized + Send + Sync + 'static>(&self, qualifier: Qualifier) -> DiResult<Arc<T>> {
        self.resolve(&DependencyDescriptor::of::<T>().with_qualifier(qualifier))?
            .into_required::<T>()
    }

    /// Every `T`, sorted by order (then priority); empty when nothing matches.
    fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve(&DependencyDescriptor::collection::<T>(true))?.into_vec::<T>()
    }

    /// Every `T` keyed by component name.
    fn get_map<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<HashMap<String, Arc<T>>> {
        self.resolve(&DependencyDescriptor::map::<T>())?.into_map::<T>()
    }

    /// The component `name` as a `T`.
    fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let view = self.resolve_named(name, &ResolvableType::of::<T>())?;
        downcast_view::<T>(view).ok_or_else(|| DiError::TypeMismatch {
            name: name.to_string(),
            required_type: std::any::type_name::<T>().to_string(),
            actual_type: "<a view of another type>".to_string(),
        })
    }

    /// A handle that resolves `T` on each call.
    fn get_provider<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Provider<T>> {
        self.resolve(&DependencyDescriptor::deferred::<T>())?.into_provider::<T>()
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
