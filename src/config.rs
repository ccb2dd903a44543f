//! Container configuration.
//!
//! Settings are layered: built-in defaults, then an optional JSON document
//! (with the `config` feature), then environment variables carrying the
//! `FERROUS_IOC_` prefix.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult};

/// Prefix for environment overrides, e.g. `FERROUS_IOC_ALLOW_CIRCULAR_REFERENCES=false`.
pub const ENV_PREFIX: &str = "FERROUS_IOC";

/// Policy switches for registry and lifecycle behavior.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ContainerConfig};
///
/// let config = ContainerConfig {
///     allow_definition_overriding: false,
///     ..ContainerConfig::default()
/// };
///
/// let mut components = ComponentCollection::new();
/// components.with_config(config);
/// components.add_named_singleton("port", 8080u16);
/// components.add_named_singleton("port", 9090u16);
/// assert!(components.build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Re-registering a name replaces the existing definition instead of failing.
    pub allow_definition_overriding: bool,
    /// Singletons publish early references so field-injection cycles resolve.
    pub allow_circular_references: bool,
    /// Type queries may create singletons whose type is not declared.
    pub allow_eager_init_for_type_matching: bool,
    /// Accept a wrapped singleton even though the raw instance already leaked
    /// into a cycle through an early reference.
    pub allow_raw_injection_despite_wrapping: bool,
    /// Memoize type queries once the configuration is frozen.
    pub cache_type_queries: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_definition_overriding: true,
            allow_circular_references: true,
            allow_eager_init_for_type_matching: true,
            allow_raw_injection_despite_wrapping: false,
            cache_type_queries: true,
        }
    }
}

impl ContainerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> DiResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Parses a JSON document; absent keys keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::InvalidDefinition {
            name: "container configuration".to_string(),
            reason: e.to_string(),
        })
    }

    /// Applies `FERROUS_IOC_*` variables on top of the current values.
    pub fn apply_env(&mut self) -> DiResult<()> {
        self.apply_source(|key| env::var(env_key(key)).ok())
    }

    fn apply_source<F>(&mut self, lookup: F) -> DiResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut bool); 5] = [
            ("allow_definition_overriding", &mut self.allow_definition_overriding),
            ("allow_circular_references", &mut self.allow_circular_references),
            ("allow_eager_init_for_type_matching", &mut self.allow_eager_init_for_type_matching),
            ("allow_raw_injection_despite_wrapping", &mut self.allow_raw_injection_despite_wrapping),
            ("cache_type_queries", &mut self.cache_type_queries),
        ];
        for (key, slot) in fields {
            if let Some(raw) = lookup(key) {
                *slot = parse_flag(key, &raw)?;
            }
        }
        Ok(())
    }
}

fn env_key(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.to_uppercase())
}

fn parse_flag(key: &str, raw: &str) -> DiResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(DiError::InvalidDefinition {
            name: env_key(key),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}
