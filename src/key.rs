//! Type identity keys and generic type shapes.

use std::any::TypeId;
use std::fmt;

/// Runtime identity of a Rust type.
///
/// Equality and hashing use the `TypeId` only; the name is kept for
/// diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let a = TypeKey::of::<String>();
/// let b = TypeKey::of::<String>();
/// assert_eq!(a, b);
/// assert!(a.name().contains("String"));
/// assert_ne!(TypeKey::of::<dyn Greeter>(), a);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`, which may be unsized (`dyn Trait`).
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline(always)]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline(always)]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// TypeId-only comparison; the name may differ between crates for the same type
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How strictly generic arguments are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Candidates must carry fully resolved, equal generic arguments.
    Strict,
    /// Candidates lacking generic information or carrying unresolved
    /// arguments are accepted.
    Fallback,
}

/// A type together with its generic shape.
///
/// Rust monomorphizes generics, so the generic arguments here are
/// metadata: the metadata layer describes `Repository<User>` as the raw
/// type `dyn Repository` with one argument `User`. A `None` raw type is a
/// wildcard that matches anything.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{MatchMode, ResolvableType};
///
/// trait Repository: Send + Sync {}
/// struct User;
/// struct Order;
///
/// let wanted = ResolvableType::of::<dyn Repository>().with_generic(ResolvableType::of::<User>());
/// let users = ResolvableType::of::<dyn Repository>().with_generic(ResolvableType::of::<User>());
/// let orders = ResolvableType::of::<dyn Repository>().with_generic(ResolvableType::of::<Order>());
/// let unknown = ResolvableType::of::<dyn Repository>();
///
/// assert!(wanted.matches(&users, MatchMode::Strict));
/// assert!(!wanted.matches(&orders, MatchMode::Fallback));
/// assert!(!wanted.matches(&unknown, MatchMode::Strict));
/// assert!(wanted.matches(&unknown, MatchMode::Fallback));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvableType {
    raw: Option<TypeKey>,
    generics: Vec<ResolvableType>,
    collection: bool,
}

impl ResolvableType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            raw: Some(TypeKey::of::<T>()),
            generics: Vec::new(),
            collection: false,
        }
    }

    pub fn from_key(key: TypeKey) -> Self {
        Self {
            raw: Some(key),
            generics: Vec::new(),
            collection: false,
        }
    }

    /// A wildcard standing for a generic argument that could not be resolved.
    pub fn unresolved() -> Self {
        Self {
            raw: None,
            generics: Vec::new(),
            collection: false,
        }
    }

    pub fn with_generic(mut self, generic: ResolvableType) -> Self {
        self.generics.push(generic);
        self
    }

    pub fn with_generics(mut self, generics: impl IntoIterator<Item = ResolvableType>) -> Self {
        self.generics.extend(generics);
        self
    }

    /// Marks the type as plural-shaped (a collection or array type used as a whole).
    pub fn as_collection(mut self) -> Self {
        self.collection = true;
        self
    }

    pub fn raw(&self) -> Option<TypeKey> {
        self.raw
    }

    pub fn generics(&self) -> &[ResolvableType] {
        &self.generics
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// True if this type or any nested argument is a wildcard.
    pub fn has_unresolvable_generics(&self) -> bool {
        self.generics
            .iter()
            .any(|g| g.raw.is_none() || g.has_unresolvable_generics())
    }

    /// Whether a candidate of type `candidate` can satisfy `self`.
    pub fn matches(&self, candidate: &ResolvableType, mode: MatchMode) -> bool {
        let Some(required_raw) = self.raw else {
            return true;
        };
        let Some(candidate_raw) = candidate.raw else {
            return mode == MatchMode::Fallback;
        };
        if required_raw != candidate_raw {
            return false;
        }
        if self.generics.is_empty() {
            return true;
        }
        if candidate.generics.is_empty() {
            return mode == MatchMode::Fallback;
        }
        if self.generics.len() != candidate.generics.len() {
            return false;
        }
        self.generics
            .iter()
            .zip(&candidate.generics)
            .all(|(required, offered)| required.matches(offered, mode))
    }
}

impl fmt::Display for ResolvableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw {
            Some(raw) => f.write_str(raw.name())?,
            None => f.write_str("?")?,
        }
        if !self.generics.is_empty() {
            f.write_str("<")?;
            for (i, generic) in self.generics.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", generic)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// Default component name for `T`: the snake-cased last path segment of its
/// type name, without generic arguments.
///
/// ```rust
/// struct UserService;
/// assert_eq!(ferrous_ioc::key::default_name::<UserService>(), "user_service");
/// ```
pub fn default_name<T: ?Sized + 'static>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let segment = base.rsplit("::").next().unwrap_or(base);
    let mut name = String::with_capacity(segment.len() + 4);
    for (i, ch) in segment.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                name.push('_');
            }
            name.extend(ch.to_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Left;
    struct Right;

    #[test]
    fn test_raw_mismatch_never_matches() {
        let left = ResolvableType::of::<Left>();
        let right = ResolvableType::of::<Right>();
        assert!(!left.matches(&right, MatchMode::Fallback));
    }

    #[test]
    fn test_unresolved_candidate_argument_needs_fallback() {
        let required = ResolvableType::of::<Vec<u8>>().with_generic(ResolvableType::of::<Left>());
        let offered = ResolvableType::of::<Vec<u8>>().with_generic(ResolvableType::unresolved());
        assert!(!required.matches(&offered, MatchMode::Strict));
        assert!(required.matches(&offered, MatchMode::Fallback));
        assert!(offered.has_unresolvable_generics());
    }

    #[test]
    fn test_arity_mismatch() {
        let required = ResolvableType::of::<Left>()
            .with_generics([ResolvableType::of::<u8>(), ResolvableType::of::<u16>()]);
        let offered = ResolvableType::of::<Left>().with_generic(ResolvableType::of::<u8>());
        assert!(!required.matches(&offered, MatchMode::Fallback));
    }

    #[test]
    fn test_display_nested() {
        let ty = ResolvableType::of::<Left>().with_generic(ResolvableType::unresolved());
        assert!(ty.to_string().ends_with("Left<?>"));
    }

    #[test]
    fn test_default_name_strips_path_and_generics() {
        assert_eq!(default_name::<Left>(), "left");
        assert_eq!(default_name::<Vec<u8>>(), "vec");
        struct HttpClientPool;
        assert_eq!(default_name::<HttpClientPool>(), "http_client_pool");
    }
}
