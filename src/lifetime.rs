//! Component lifetime definitions.

/// Component lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct RequestModel;
///
/// let mut components = ComponentCollection::new();
/// components.add_singleton_factory::<Clock, _>(|_| Ok(Clock));
/// components.add_prototype_factory::<RequestModel, _>(|_| Ok(RequestModel));
///
/// let container = components.build().unwrap();
///
/// // Singleton: the same instance on every lookup
/// let a = container.get::<Clock>().unwrap();
/// let b = container.get::<Clock>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// // Prototype: a fresh instance per lookup, never cached
/// let x = container.get::<RequestModel>().unwrap();
/// let y = container.get::<RequestModel>().unwrap();
/// assert!(!Arc::ptr_eq(&x, &y));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance per container, created on first request (or eagerly
    /// during pre-instantiation) and cached until destroyed.
    ///
    /// Only singletons take part in early-reference exposure, so only
    /// singletons can sit on a field-injection cycle.
    #[default]
    Singleton,
    /// New instance per resolution, never cached and never registered for
    /// destruction.
    Prototype,
}

impl Lifetime {
    #[inline]
    pub fn is_singleton(self) -> bool {
        self == Lifetime::Singleton
    }
}
