//! Resolver context for suppliers, constructors and factory methods.

use crate::catalog::AnyArc;
use crate::descriptors::DependencyDescriptor;
use crate::key::ResolvableType;
use crate::provider::ContainerInner;
use crate::resolver::Resolution;
use crate::traits::ResolverCore;
use crate::DiResult;

/// Context passed to instance sources for resolving dependencies.
///
/// Every lookup made through the context is attributed to the component
/// being built, so self-references are excluded and the component is
/// recorded as a dependent of what it resolves.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ComponentCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut components = ComponentCollection::new();
/// components.add_singleton(Database { url: "postgres://localhost".to_string() });
/// components.add_singleton_factory::<UserService, _>(|resolver| {
///     Ok(UserService { db: resolver.get::<Database>()? })
/// });
///
/// let container = components.build().unwrap();
/// assert_eq!(container.get::<UserService>().unwrap().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    inner: &'a ContainerInner,
    requesting: Option<&'a str>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(inner: &'a ContainerInner, requesting: Option<&'a str>) -> Self {
        Self { inner, requesting }
    }

    /// The component on whose behalf lookups are made.
    pub fn requesting(&self) -> Option<&str> {
        self.requesting
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve(&self, descriptor: &DependencyDescriptor) -> DiResult<Resolution> {
        self.inner
            .resolve_dependency(descriptor, self.requesting)
            .map(|(resolution, _)| resolution)
    }

    fn resolve_named(&self, name: &str, required: &ResolvableType) -> DiResult<AnyArc> {
        self.inner.resolve_named_for(name, required, self.requesting)
    }
}
