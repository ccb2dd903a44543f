//! Error types for the dependency injection container.

use std::fmt;

/// Lifecycle phase a component was in when something went wrong.
///
/// Every component moves through these phases in order; `Failed` is
/// reachable from any phase before `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The merged definition is being looked up and its `depends_on` list honored.
    Requested,
    /// A supplier, constructor or factory method is producing the raw instance.
    Instantiating,
    /// An early reference is being published to break cycles.
    EarlyExposed,
    /// Injection points and explicit property values are being applied.
    Populating,
    /// Init callbacks and initialization processors run.
    Initializing,
    /// Committed (singleton) or handed out (prototype).
    Ready,
    /// Construction aborted.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Requested => "requested",
            Phase::Instantiating => "instantiating",
            Phase::EarlyExposed => "early-exposed",
            Phase::Populating => "populating",
            Phase::Initializing => "initializing",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Dependency injection errors
///
/// Every variant names the component involved, and dependency errors also
/// name the requiring component and the target type, so a caller can find
/// the wiring defect from the message alone.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, DiError, Resolver};
///
/// let container = Container::new();
/// match container.get::<String>() {
///     Err(DiError::NoMatchingCandidate { required_type, .. }) => {
///         assert!(required_type.contains("String"));
///     }
///     other => panic!("unexpected: {:?}", other.map(|_| ())),
/// }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// Lookup by name with no definition and no alias resolving to one
    #[error("No component named '{name}' is defined")]
    DefinitionNotFound { name: String },

    /// Registration collided with an existing entry and overriding is disabled
    #[error("Cannot register component '{name}': it is already bound to {existing} and overriding is disabled")]
    DefinitionOverrideRejected { name: String, existing: String },

    /// A definition failed validation or cannot be used the way it was requested
    #[error("Invalid component definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// A required dependency had no eligible candidate, even after the fallback pass
    #[error("No qualifying component of type {required_type} available{}", requester(.requesting))]
    NoMatchingCandidate {
        required_type: String,
        requesting: Option<String>,
    },

    /// More than one eligible candidate and no disambiguation winner
    #[error("Expected a single matching component of type {required_type}{} but found {}: {reason}", requester(.requesting), .candidates.join(", "))]
    NonUniqueCandidate {
        required_type: String,
        requesting: Option<String>,
        candidates: Vec<String>,
        reason: String,
    },

    /// A construction cycle that no early reference could break
    #[error("Circular construction: {}", .path.join(" -> "))]
    CircularConstruction { path: Vec<String> },

    /// A resolved value's runtime type is not usable as the required type
    #[error("Component '{name}' of type {actual_type} is not assignable to {required_type}")]
    TypeMismatch {
        name: String,
        required_type: String,
        actual_type: String,
    },

    /// Failure while building a component, wrapped with its name and phase
    #[error("Error creating component '{component}' while {phase}: {cause}")]
    Lifecycle {
        component: String,
        phase: Phase,
        #[source]
        cause: Box<DiError>,
    },

    /// Maximum creation nesting depth exceeded
    #[error("Max creation depth {0} exceeded")]
    DepthExceeded(usize),

    /// A deferred handle outlived the container it resolves against
    #[error("The container backing this provider has been dropped")]
    ContainerDropped,
}

fn requester(requesting: &Option<String>) -> String {
    match requesting {
        Some(name) => format!(" for component '{}'", name),
        None => String::new(),
    }
}

impl DiError {
    /// Wraps `self` as a lifecycle failure of `component` in `phase`.
    pub fn in_phase(self, component: &str, phase: Phase) -> DiError {
        DiError::Lifecycle {
            component: component.to_string(),
            phase,
            cause: Box::new(self),
        }
    }

    /// The innermost error below any chain of [`DiError::Lifecycle`] wrappers.
    ///
    /// ```rust
    /// use ferrous_ioc::{DiError, Phase};
    ///
    /// let err = DiError::CircularConstruction { path: vec!["a".into(), "b".into(), "a".into()] }
    ///     .in_phase("b", Phase::Instantiating)
    ///     .in_phase("a", Phase::Instantiating);
    /// assert!(matches!(err.root_cause(), DiError::CircularConstruction { .. }));
    /// ```
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::Lifecycle { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// True when this error means "no usable candidate" for a single dependency,
    /// as opposed to a failure while building one.
    pub(crate) fn is_unsatisfied(&self) -> bool {
        matches!(
            self,
            DiError::NoMatchingCandidate { .. } | DiError::NonUniqueCandidate { .. }
        )
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-ioc.
pub type DiResult<T> = Result<T, DiError>;
