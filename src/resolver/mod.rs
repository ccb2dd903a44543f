//! Candidate resolution results and their typed conversions.
//!
//! The search itself lives in [`candidates`]; this module holds what it
//! produces. A [`Resolution`] carries view values (see
//! [`catalog`](crate::catalog)), so converting it to `Arc<T>` is a single
//! downcast whether `T` is a concrete type or a trait object.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{downcast_view, AnyArc};
use crate::provider::{ComponentProvider, Provider};
use crate::{DiError, DiResult};

pub(crate) mod candidates;

/// One resolved value and the component it came from.
///
/// `name` is `None` for explicit property values and resolvable
/// dependencies, which have no component name.
#[derive(Clone)]
pub struct ResolvedComponent {
    pub name: Option<String>,
    pub value: AnyArc,
}

impl ResolvedComponent {
    pub fn new(name: Option<String>, value: AnyArc) -> Self {
        Self { name, value }
    }

    /// The value as `Arc<T>`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast_view::<T>(self.value.clone()).ok_or_else(|| DiError::TypeMismatch {
            name: self.name.clone().unwrap_or_else(|| "<explicit value>".to_string()),
            required_type: std::any::type_name::<T>().to_string(),
            actual_type: "<a view of another type>".to_string(),
        })
    }
}

impl std::fmt::Debug for ResolvedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedComponent").field("name", &self.name).finish()
    }
}

/// What resolving a dependency descriptor produced.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// Single and optional shapes; `None` is an absent optional dependency.
    Single(Option<ResolvedComponent>),
    /// Collection and map shapes, possibly empty.
    Many(Vec<ResolvedComponent>),
    /// A handle resolving on demand.
    Deferred(ComponentProvider),
}

impl Resolution {
    /// Names of the components that contributed.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Resolution::Single(Some(c)) => c.name.as_deref().into_iter().collect(),
            Resolution::Many(all) => all.iter().filter_map(|c| c.name.as_deref()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_required<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Arc<T>> {
        match self {
            Resolution::Single(Some(component)) => component.downcast::<T>(),
            Resolution::Single(None) => Err(DiError::NoMatchingCandidate {
                required_type: std::any::type_name::<T>().to_string(),
                requesting: None,
            }),
            Resolution::Many(_) => Err(shape_mismatch::<T>("a collection")),
            Resolution::Deferred(provider) => {
                let value = provider.get()?;
                ResolvedComponent::new(None, value).downcast::<T>()
            }
        }
    }

    pub fn into_optional<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Option<Arc<T>>> {
        match self {
            Resolution::Single(Some(component)) => component.downcast::<T>().map(Some),
            Resolution::Single(None) => Ok(None),
            Resolution::Many(_) => Err(shape_mismatch::<T>("a collection")),
            Resolution::Deferred(provider) => match provider.get_if_available()? {
                Some(value) => ResolvedComponent::new(None, value).downcast::<T>().map(Some),
                None => Ok(None),
            },
        }
    }

    /// Every value, in resolution order. A single value becomes a
    /// one-element vector and an absent one an empty vector.
    pub fn into_vec<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Vec<Arc<T>>> {
        match self {
            Resolution::Many(all) => all.iter().map(|c| c.downcast::<T>()).collect(),
            Resolution::Single(Some(component)) => Ok(vec![component.downcast::<T>()?]),
            Resolution::Single(None) => Ok(Vec::new()),
            Resolution::Deferred(_) => Err(shape_mismatch::<T>("a deferred handle")),
        }
    }

    /// Values keyed by component name; unnamed values are left out.
    pub fn into_map<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<HashMap<String, Arc<T>>> {
        let all = match self {
            Resolution::Many(all) => all,
            Resolution::Single(one) => one.into_iter().collect(),
            Resolution::Deferred(_) => return Err(shape_mismatch::<T>("a deferred handle")),
        };
        let mut map = HashMap::with_capacity(all.len());
        for component in all {
            let value = component.downcast::<T>()?;
            if let Some(name) = component.name {
                map.insert(name, value);
            }
        }
        Ok(map)
    }

    pub fn into_provider<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Provider<T>> {
        match self {
            Resolution::Deferred(provider) => Ok(Provider::new(provider)),
            _ => Err(shape_mismatch::<T>("an immediate value")),
        }
    }
}

fn shape_mismatch<T: ?Sized>(found: &str) -> DiError {
    DiError::TypeMismatch {
        name: "<resolution>".to_string(),
        required_type: std::any::type_name::<T>().to_string(),
        actual_type: found.to_string(),
    }
}
