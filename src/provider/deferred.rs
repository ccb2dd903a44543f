//! Deferred dependency handles.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::catalog::{downcast_view, AnyArc};
use crate::descriptors::DependencyDescriptor;
use crate::provider::ContainerInner;
use crate::resolver::Resolution;
use crate::{DiError, DiResult};

/// Runs a dependency resolution each time it is asked for a value.
///
/// The handle holds the container weakly; once the container is dropped
/// every call fails with [`DiError::ContainerDropped`].
#[derive(Clone)]
pub struct ComponentProvider {
    container: Weak<ContainerInner>,
    descriptor: DependencyDescriptor,
    requesting: Option<String>,
}

impl fmt::Debug for ComponentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentProvider")
            .field("descriptor", &self.descriptor)
            .field("requesting", &self.requesting)
            .finish()
    }
}

impl ComponentProvider {
    pub(crate) fn new(
        container: Weak<ContainerInner>,
        descriptor: DependencyDescriptor,
        requesting: Option<String>,
    ) -> Self {
        Self {
            container,
            descriptor,
            requesting,
        }
    }

    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.descriptor
    }

    fn run(&self, descriptor: &DependencyDescriptor) -> DiResult<Option<AnyArc>> {
        let inner = self.container.upgrade().ok_or(DiError::ContainerDropped)?;
        let (resolution, _) = inner.resolve_dependency(descriptor, self.requesting.as_deref())?;
        match resolution {
            Resolution::Single(found) => Ok(found.map(|c| c.value)),
            _ => Err(DiError::InvalidDefinition {
                name: self.requesting.clone().unwrap_or_default(),
                reason: "deferred handles resolve single values only".to_string(),
            }),
        }
    }

    /// The value; fails when nothing or more than one candidate qualifies.
    pub fn get(&self) -> DiResult<AnyArc> {
        self.run(&self.descriptor.clone().with_required(true))?
            .ok_or_else(|| DiError::NoMatchingCandidate {
                required_type: self.descriptor.required_type().to_string(),
                requesting: self.requesting.clone(),
            })
    }

    /// The value, or `None` when nothing qualifies. Ambiguity is still an error.
    pub fn get_if_available(&self) -> DiResult<Option<AnyArc>> {
        self.run(&self.descriptor.clone().with_required(false))
    }

    /// The value, or `None` when nothing or more than one candidate qualifies.
    pub fn get_if_unique(&self) -> DiResult<Option<AnyArc>> {
        match self.get_if_available() {
            Err(DiError::NonUniqueCandidate { .. }) => Ok(None),
            other => other,
        }
    }
}

/// Typed [`ComponentProvider`].
pub struct Provider<T: ?Sized> {
    inner: ComponentProvider,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.inner).finish()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> {
    pub(crate) fn new(inner: ComponentProvider) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    fn typed(&self, value: AnyArc) -> DiResult<Arc<T>> {
        downcast_view::<T>(value).ok_or_else(|| DiError::TypeMismatch {
            name: "<deferred>".to_string(),
            required_type: std::any::type_name::<T>().to_string(),
            actual_type: self.inner.descriptor.required_type().to_string(),
        })
    }

    pub fn get(&self) -> DiResult<Arc<T>> {
        self.typed(self.inner.get()?)
    }

    pub fn get_if_available(&self) -> DiResult<Option<Arc<T>>> {
        self.inner.get_if_available()?.map(|v| self.typed(v)).transpose()
    }

    pub fn get_if_unique(&self) -> DiResult<Option<Arc<T>>> {
        self.inner.get_if_unique()?.map(|v| self.typed(v)).transpose()
    }

    pub fn untyped(&self) -> &ComponentProvider {
        &self.inner
    }
}
