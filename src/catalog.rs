//! Type catalog: which required types a concrete type can be used as.
//!
//! Instances live in the container as `Arc<C>` erased to [`AnyArc`], where
//! `C` is the concrete type. A *view* turns such an instance into the value
//! handed to an injection point: always an `Arc<Arc<T>>` erased to `AnyArc`,
//! with `T` either `C` itself or a `dyn Trait` that `C` was exposed as. This
//! lets one extraction path ([`downcast_view`]) serve concrete and trait
//! object targets alike.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

use crate::key::{MatchMode, ResolvableType, TypeKey};

/// Type-erased shared instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Converts an erased concrete instance into an erased view value.
pub type CastFn = Arc<dyn Fn(AnyArc) -> Option<AnyArc> + Send + Sync>;

/// One way of using a concrete type.
#[derive(Clone)]
pub struct TypeView {
    target: ResolvableType,
    cast: CastFn,
}

impl std::fmt::Debug for TypeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeView").field("target", &self.target).finish()
    }
}

impl TypeView {
    /// The view of `C` as itself.
    pub fn identity<C: Send + Sync + 'static>() -> Self {
        Self::identity_as::<C>(ResolvableType::of::<C>())
    }

    /// The view of `C` as itself, described by `target` (which carries
    /// generic metadata for `C`).
    pub fn identity_as<C: Send + Sync + 'static>(target: ResolvableType) -> Self {
        Self {
            target,
            cast: Arc::new(|any: AnyArc| {
                any.downcast::<C>()
                    .ok()
                    .map(|concrete| Arc::new(concrete) as AnyArc)
            }),
        }
    }

    /// The view of `C` as the trait object `I`.
    pub fn upcast<C, I>(upcast: fn(Arc<C>) -> Arc<I>) -> Self
    where
        C: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        Self::upcast_as::<C, I>(ResolvableType::of::<I>(), upcast)
    }

    /// The view of `C` as `I`, where `target` carries generic metadata for `I`.
    pub fn upcast_as<C, I>(target: ResolvableType, upcast: fn(Arc<C>) -> Arc<I>) -> Self
    where
        C: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            target,
            cast: Arc::new(move |any: AnyArc| {
                any.downcast::<C>()
                    .ok()
                    .map(|concrete| Arc::new(upcast(concrete)) as AnyArc)
            }),
        }
    }

    pub fn target(&self) -> &ResolvableType {
        &self.target
    }

    pub fn apply(&self, instance: AnyArc) -> Option<AnyArc> {
        (self.cast)(instance)
    }
}

/// Concrete `TypeId` to the views registered for it.
#[derive(Default)]
pub struct TypeCatalog {
    views: DashMap<TypeId, Vec<TypeView>>,
    names: DashMap<TypeId, &'static str>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a view of concrete type `concrete`. A second view with the same
    /// target replaces the first.
    pub fn register(&self, concrete: TypeKey, view: TypeView) {
        self.names.insert(concrete.id(), concrete.name());
        let mut views = self.views.entry(concrete.id()).or_default();
        if let Some(existing) = views.iter_mut().find(|v| v.target == view.target) {
            *existing = view;
        } else {
            views.push(view);
        }
    }

    pub fn is_known(&self, concrete: TypeId) -> bool {
        self.views.contains_key(&concrete)
    }

    /// Display name recorded for a concrete type.
    pub fn type_name(&self, concrete: TypeId) -> &'static str {
        self.names
            .get(&concrete)
            .map(|name| *name)
            .unwrap_or("<unregistered type>")
    }

    /// Whether any view of `concrete` satisfies `required`.
    pub fn matches(&self, concrete: TypeId, required: &ResolvableType, mode: MatchMode) -> bool {
        self.views
            .get(&concrete)
            .map(|views| views.iter().any(|v| required.matches(&v.target, mode)))
            .unwrap_or(false)
    }

    /// Turns an instance into the view value for `required`, if one of the
    /// instance's runtime type views fits.
    pub fn cast(&self, instance: &AnyArc, required: &ResolvableType) -> Option<AnyArc> {
        let concrete = (**instance).type_id();
        let view = {
            let views = self.views.get(&concrete)?;
            views
                .iter()
                .find(|v| required.matches(&v.target, MatchMode::Fallback))
                .cloned()?
        };
        view.apply(instance.clone())
    }
}

/// Extracts the typed `Arc<T>` from a view value.
#[inline]
pub fn downcast_view<T: ?Sized + Send + Sync + 'static>(view: AnyArc) -> Option<Arc<T>> {
    view.downcast::<Arc<T>>().ok().map(|inner| (*inner).clone())
}

/// Runtime concrete type of an erased instance.
#[inline]
pub fn concrete_type_of(instance: &AnyArc) -> TypeId {
    (**instance).type_id()
}
