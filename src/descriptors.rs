//! Dependency descriptors: what an injection point asks the resolver for.

use crate::key::{MatchMode, ResolvableType};

/// Qualifier kind used when none is given; values of this kind also match
/// candidate names and aliases.
pub const DEFAULT_QUALIFIER: &str = "qualifier";

/// A qualifying marker narrowing the candidate set.
///
/// A candidate satisfies a qualifier when its definition carries a qualifier
/// with the same kind and value. For the default kind, a candidate whose
/// name (or one of its aliases) equals the value satisfies it too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    pub kind: String,
    pub value: String,
}

impl Qualifier {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Default-kind qualifier, matching qualifier values and component names.
    pub fn named(value: impl Into<String>) -> Self {
        Self::new(DEFAULT_QUALIFIER, value)
    }

    pub fn is_default_kind(&self) -> bool {
        self.kind == DEFAULT_QUALIFIER
    }
}

/// What the injection point wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Exactly one value of the required type.
    Single,
    /// Zero or one value; absence is not an error.
    Optional,
    /// Every matching value, optionally sorted by order and priority.
    Collection { ordered: bool },
    /// Every matching value keyed by component name.
    Map,
    /// A handle that runs the resolution when called.
    Deferred,
}

impl Shape {
    /// True for the shapes served by the multi-candidate path.
    #[inline]
    pub fn is_multiple(self) -> bool {
        matches!(self, Shape::Collection { .. } | Shape::Map)
    }
}

/// One injection target: required type, multiplicity, required-ness,
/// qualifiers and the declaring element's name (field or parameter) used
/// for name-based tie-breaking.
///
/// Descriptors are immutable; the fallback and nested variants used during
/// resolution are derived copies.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{DependencyDescriptor, MatchMode, Qualifier, Shape};
///
/// trait Store: Send + Sync {}
///
/// let descriptor = DependencyDescriptor::of::<dyn Store>()
///     .declared_as("primary_store")
///     .with_qualifier(Qualifier::named("fast"));
///
/// assert!(descriptor.is_required());
/// assert_eq!(descriptor.shape(), Shape::Single);
/// assert_eq!(descriptor.declaring_name(), Some("primary_store"));
/// assert_eq!(descriptor.for_fallback_match().mode(), MatchMode::Fallback);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyDescriptor {
    required_type: ResolvableType,
    shape: Shape,
    required: bool,
    qualifiers: Vec<Qualifier>,
    declaring_name: Option<String>,
    mode: MatchMode,
}

impl DependencyDescriptor {
    /// A required single-value dependency on `required_type`.
    pub fn new(required_type: ResolvableType) -> Self {
        Self {
            required_type,
            shape: Shape::Single,
            required: true,
            qualifiers: Vec::new(),
            declaring_name: None,
            mode: MatchMode::Strict,
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ResolvableType::of::<T>())
    }

    /// Zero-or-one dependency on `T`.
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self::of::<T>().with_shape(Shape::Optional)
    }

    /// All `T` candidates, in registration order unless `ordered`.
    pub fn collection<T: ?Sized + 'static>(ordered: bool) -> Self {
        Self::of::<T>().with_shape(Shape::Collection { ordered })
    }

    /// All `T` candidates keyed by name.
    pub fn map<T: ?Sized + 'static>() -> Self {
        Self::of::<T>().with_shape(Shape::Map)
    }

    /// A deferred handle resolving `T` when called.
    pub fn deferred<T: ?Sized + 'static>() -> Self {
        Self::of::<T>().with_shape(Shape::Deferred)
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// Adds generic arguments to the required type.
    pub fn with_generics(mut self, generics: impl IntoIterator<Item = ResolvableType>) -> Self {
        self.required_type = self.required_type.with_generics(generics);
        self
    }

    /// Records the declaring field or parameter name.
    pub fn declared_as(mut self, name: impl Into<String>) -> Self {
        self.declaring_name = Some(name.into());
        self
    }

    pub fn required_type(&self) -> &ResolvableType {
        &self.required_type
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Optional shapes are never required, whatever the flag says.
    pub fn is_required(&self) -> bool {
        self.required && self.shape != Shape::Optional
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    pub fn declaring_name(&self) -> Option<&str> {
        self.declaring_name.as_deref()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// True when the dependency is plural: a multi shape, or a required
    /// type flagged as a collection type.
    pub fn is_plural(&self) -> bool {
        self.shape.is_multiple() || self.required_type.is_collection()
    }

    /// Same descriptor with relaxed generic matching.
    pub fn for_fallback_match(&self) -> Self {
        let mut relaxed = self.clone();
        relaxed.mode = MatchMode::Fallback;
        relaxed
    }

    /// The descriptor one wrapper layer down: an optional or deferred
    /// dependency becomes the single-value dependency it wraps.
    pub fn nested(&self) -> Self {
        let mut inner = self.clone();
        match self.shape {
            Shape::Optional => {
                inner.shape = Shape::Single;
                inner.required = false;
            }
            Shape::Deferred => {
                inner.shape = Shape::Single;
            }
            _ => {}
        }
        inner
    }
}
