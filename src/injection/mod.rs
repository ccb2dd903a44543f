//! Injection points and the type structures that declare them.
//!
//! A [`TypeStructure`] is the metadata layer's description of one concrete
//! type: the members it wants autowired and, optionally, the ancestor type
//! whose own injection points it inherits. Members are [`Autowired`] slots,
//! write-once cells the injector fills after instantiation, which is what
//! lets two singletons reference each other through fields.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_ioc::{Autowired, ComponentBuilder, ComponentCollection, InjectionPoint, Resolver, TypeStructure};
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
//! components.add_component("scheduler", ComponentBuilder::<Scheduler>::new().supplier(|_| Ok(Scheduler::default())));
//! components.add_structure(
//!     TypeStructure::of::<Scheduler>()
//!         .point(InjectionPoint::single::<Scheduler, Clock>("clock", |s| &s.clock)),
//! );
//!
//! let container = components.build().unwrap();
//! let scheduler = container.get::<Scheduler>().unwrap();
//! assert!(scheduler.clock.get().is_some());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::descriptors::{DependencyDescriptor, Qualifier};
use crate::key::{ResolvableType, TypeKey};
use crate::provider::Provider;
use crate::resolver::Resolution;
use crate::{DiError, DiResult};

pub(crate) mod injector;

pub use injector::Injector;

/// Writes a resolution into one member of a target object.
pub type Setter = Arc<dyn Fn(&dyn Any, Resolution) -> DiResult<()> + Send + Sync>;

/// A member filled by the injector after construction.
pub struct Autowired<V> {
    cell: OnceCell<V>,
}

impl<V> Autowired<V> {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Stores `value` unless the slot is already filled; returns whether it was stored.
    pub fn set(&self, value: V) -> bool {
        self.cell.set(value).is_ok()
    }

    pub fn get(&self) -> Option<&V> {
        self.cell.get()
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<V: Clone> Autowired<V> {
    pub fn cloned(&self) -> Option<V> {
        self.cell.get().cloned()
    }
}

impl<V> Default for Autowired<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Autowired<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            f.write_str("Autowired(<set>)")
        } else {
            f.write_str("Autowired(<unset>)")
        }
    }
}

/// One autowired member: its name, what it asks for, and how to write it.
#[derive(Clone)]
pub struct InjectionPoint {
    member: String,
    descriptor: DependencyDescriptor,
    setter: Setter,
}

impl fmt::Debug for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("member", &self.member)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

fn owner_of<'a, O: 'static>(member: &str, target: &'a dyn Any) -> DiResult<&'a O> {
    target.downcast_ref::<O>().ok_or_else(|| DiError::TypeMismatch {
        name: member.to_string(),
        required_type: std::any::type_name::<O>().to_string(),
        actual_type: "<injection target of another type>".to_string(),
    })
}

impl InjectionPoint {
    /// A point with a hand-written setter. The descriptor's declaring name
    /// is set to `member` unless it already has one.
    pub fn new<F>(member: impl Into<String>, descriptor: DependencyDescriptor, setter: F) -> Self
    where
        F: Fn(&dyn Any, Resolution) -> DiResult<()> + Send + Sync + 'static,
    {
        let member = member.into();
        let descriptor = match descriptor.declaring_name() {
            Some(_) => descriptor,
            None => descriptor.declared_as(member.clone()),
        };
        Self {
            member,
            descriptor,
            setter: Arc::new(setter),
        }
    }

    /// A required `Arc<T>` member of `O`.
    pub fn single<O, T>(member: &str, field: fn(&O) -> &Autowired<Arc<T>>) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let name = member.to_string();
        Self::new(member, DependencyDescriptor::of::<T>(), move |target: &dyn Any, resolution: Resolution| {
            let owner = owner_of::<O>(&name, target)?;
            field(owner).set(resolution.into_required::<T>()?);
            Ok(())
        })
    }

    /// An `Arc<T>` member of `O` left empty when nothing matches.
    pub fn optional<O, T>(member: &str, field: fn(&O) -> &Autowired<Arc<T>>) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let name = member.to_string();
        Self::new(member, DependencyDescriptor::optional::<T>(), move |target: &dyn Any, resolution: Resolution| {
            let owner = owner_of::<O>(&name, target)?;
            if let Some(value) = resolution.into_optional::<T>()? {
                field(owner).set(value);
            }
            Ok(())
        })
    }

    /// Every `T`, sorted by order and priority when `ordered`.
    pub fn collection<O, T>(member: &str, ordered: bool, field: fn(&O) -> &Autowired<Vec<Arc<T>>>) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let name = member.to_string();
        Self::new(
            member,
            DependencyDescriptor::collection::<T>(ordered),
            move |target: &dyn Any, resolution: Resolution| {
                let owner = owner_of::<O>(&name, target)?;
                field(owner).set(resolution.into_vec::<T>()?);
                Ok(())
            },
        )
    }

    /// Every `T` keyed by component name.
    pub fn map<O, T>(member: &str, field: fn(&O) -> &Autowired<HashMap<String, Arc<T>>>) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let name = member.to_string();
        Self::new(member, DependencyDescriptor::map::<T>(), move |target: &dyn Any, resolution: Resolution| {
            let owner = owner_of::<O>(&name, target)?;
            field(owner).set(resolution.into_map::<T>()?);
            Ok(())
        })
    }

    /// A [`Provider<T>`] member resolving on each call.
    pub fn deferred<O, T>(member: &str, field: fn(&O) -> &Autowired<Provider<T>>) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let name = member.to_string();
        Self::new(member, DependencyDescriptor::deferred::<T>(), move |target: &dyn Any, resolution: Resolution| {
            let owner = owner_of::<O>(&name, target)?;
            field(owner).set(resolution.into_provider::<T>()?);
            Ok(())
        })
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.descriptor = self.descriptor.with_qualifier(qualifier);
        self
    }

    /// Overrides the name used for name-based tie-breaking.
    pub fn declared_as(mut self, name: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.declared_as(name);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.descriptor = self.descriptor.with_required(required);
        self
    }

    pub fn with_generics(mut self, generics: impl IntoIterator<Item = ResolvableType>) -> Self {
        self.descriptor = self.descriptor.with_generics(generics);
        self
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.descriptor
    }

    pub(crate) fn apply(&self, target: &dyn Any, resolution: Resolution) -> DiResult<()> {
        (self.setter)(target, resolution)
    }
}

/// Borrows the embedded ancestor out of a derived value.
pub(crate) trait Project: Send + Sync {
    fn project<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any>;
}

struct Projection<D, B> {
    base: fn(&D) -> &B,
}

impl<D: 'static, B: 'static> Project for Projection<D, B> {
    fn project<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any> {
        target.downcast_ref::<D>().map(|derived| (self.base)(derived) as &dyn Any)
    }
}

#[derive(Clone)]
pub(crate) struct Ancestor {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) projection: Arc<dyn Project>,
}

/// Injection metadata of one concrete type.
#[derive(Clone)]
pub struct TypeStructure {
    type_key: TypeKey,
    points: Vec<InjectionPoint>,
    ancestor: Option<Ancestor>,
}

impl fmt::Debug for TypeStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeStructure")
            .field("type", &self.type_key.name())
            .field("points", &self.points)
            .field("ancestor", &self.ancestor.as_ref().map(|a| a.type_name))
            .finish()
    }
}

impl TypeStructure {
    pub fn of<D: Send + Sync + 'static>() -> Self {
        Self {
            type_key: TypeKey::of::<D>(),
            points: Vec::new(),
            ancestor: None,
        }
    }

    pub fn point(mut self, point: InjectionPoint) -> Self {
        self.points.push(point);
        self
    }

    /// Declares `B`, embedded in `D`, as this type's ancestor. `B`'s
    /// injection points are applied first, to the embedded value.
    pub fn extends<D, B>(mut self, base: fn(&D) -> &B) -> Self
    where
        D: Send + Sync + 'static,
        B: Send + Sync + 'static,
    {
        self.ancestor = Some(Ancestor {
            type_id: TypeId::of::<B>(),
            type_name: std::any::type_name::<B>(),
            projection: Arc::new(Projection { base }),
        });
        self
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn points(&self) -> &[InjectionPoint] {
        &self.points
    }

    pub(crate) fn ancestor(&self) -> Option<&Ancestor> {
        self.ancestor.as_ref()
    }
}

/// Supplies type structures to the injector.
pub trait MetadataSource: Send + Sync {
    fn structure(&self, type_id: TypeId) -> Option<Arc<TypeStructure>>;
}

/// Structures registered programmatically, keyed by concrete type.
#[derive(Default)]
pub struct StructureRegistry {
    structures: DashMap<TypeId, Arc<TypeStructure>>,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `structure`, replacing any earlier one for the same type.
    pub fn insert(&self, structure: TypeStructure) {
        self.structures.insert(structure.type_key.id(), Arc::new(structure));
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}

impl MetadataSource for StructureRegistry {
    fn structure(&self, type_id: TypeId) -> Option<Arc<TypeStructure>> {
        self.structures.get(&type_id).map(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedComponent;

    #[derive(Default)]
    struct Base {
        name: Autowired<Arc<String>>,
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
    }

    fn base_of(derived: &Derived) -> &Base {
        &derived.base
    }

    #[test]
    fn test_autowired_is_write_once() {
        let slot: Autowired<Arc<u8>> = Autowired::new();
        assert!(!slot.is_set());
        assert!(slot.set(Arc::new(1)));
        assert!(!slot.set(Arc::new(2)));
        assert_eq!(**slot.get().unwrap(), 1);
        assert_eq!(format!("{:?}", slot), "Autowired(<set>)");
    }

    #[test]
    fn test_single_point_sets_member() {
        let point = InjectionPoint::single::<Base, String>("name", |b| &b.name);
        assert_eq!(point.descriptor().declaring_name(), Some("name"));
        let base = Base::default();
        let value: crate::catalog::AnyArc = Arc::new(Arc::new("x".to_string()));
        point
            .apply(&base, Resolution::Single(Some(ResolvedComponent::new(None, value))))
            .unwrap();
        assert_eq!(base.name.get().unwrap().as_str(), "x");
    }

    #[test]
    fn test_setter_rejects_other_target() {
        let point = InjectionPoint::single::<Base, String>("name", |b| &b.name);
        let err = point.apply(&7u32, Resolution::Single(None)).unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_projection_reaches_ancestor() {
        let structure = TypeStructure::of::<Derived>().extends::<Derived, Base>(base_of);
        let derived = Derived::default();
        let ancestor = structure.ancestor().unwrap();
        assert_eq!(ancestor.type_id, TypeId::of::<Base>());
        let projected = ancestor.projection.project(&derived).unwrap();
        assert!(projected.downcast_ref::<Base>().is_some());
        assert!(ancestor.projection.project(&1u8).is_none());
    }
}
