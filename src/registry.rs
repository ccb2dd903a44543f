//! Definition registry: named definitions, aliases, merged views and type
//! queries.

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashSet;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use crate::config::ContainerConfig;
use crate::definition::ComponentDefinition;
use crate::key::ResolvableType;
use crate::{DiError, DiResult};

/// Type facts the registry cannot know itself: runtime types of created
/// singletons, eager creation for undeclared types, and assignability.
pub trait TypeProbe {
    /// Runtime concrete type of an already created (or early exposed) singleton.
    fn instantiated_type(&self, name: &str) -> Option<TypeId>;

    /// Creates the component to learn its runtime type.
    fn eager_type(&self, name: &str) -> Option<TypeId>;

    /// Whether a component of concrete type `concrete` can be used as `required`.
    fn type_matches(&self, concrete: TypeId, required: &ResolvableType) -> bool;
}

/// What a registration changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// An existing definition was replaced.
    pub replaced: bool,
    /// Names whose merged view was dropped: the name itself and every
    /// definition inheriting from it.
    pub invalidated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TypeQuery {
    required: ResolvableType,
    include_non_singletons: bool,
    allow_eager_init: bool,
}

/// Named component definitions.
///
/// The definition map is concurrent. The ordered name list is copy-on-write:
/// readers take the current `Arc<Vec<String>>` and iterate it without
/// observing later registrations or removals.
pub struct DefinitionRegistry {
    definitions: DashMap<String, Arc<ComponentDefinition>>,
    names: RwLock<Arc<Vec<String>>>,
    aliases: DashMap<String, String>,
    merged: DashMap<String, Arc<ComponentDefinition>>,
    type_cache: DashMap<TypeQuery, Arc<Vec<String>>>,
    // Bumped before every invalidation; cache fills computed under an
    // older value are discarded.
    generation: AtomicU64,
    frozen: AtomicBool,
    creation_started: AtomicBool,
    allow_overriding: bool,
    cache_type_queries: bool,
}

impl DefinitionRegistry {
    pub fn new(config: &ContainerConfig) -> Self {
        Self {
            definitions: DashMap::new(),
            names: RwLock::new(Arc::new(Vec::new())),
            aliases: DashMap::new(),
            merged: DashMap::new(),
            type_cache: DashMap::new(),
            generation: AtomicU64::new(0),
            frozen: AtomicBool::new(false),
            creation_started: AtomicBool::new(false),
            allow_overriding: config.allow_definition_overriding,
            cache_type_queries: config.cache_type_queries,
        }
    }

    /// Validates and stores `definition` under `name`.
    pub fn register(&self, name: &str, definition: ComponentDefinition) -> DiResult<RegisterOutcome> {
        definition.validate(name)?;

        if let Some(target) = self.aliases.get(name).map(|t| t.clone()) {
            if !self.allow_overriding {
                return Err(DiError::DefinitionOverrideRejected {
                    name: name.to_string(),
                    existing: format!("an alias for '{}'", target),
                });
            }
            debug!(name, alias_target = %target, "Definition replaces alias");
            self.aliases.remove(name);
        }

        // The names lock orders concurrent registrations of the same name
        let mut names = self.names.write();
        let replaced = match self.definitions.get(name).map(|d| d.clone()) {
            Some(existing) => {
                if !self.allow_overriding {
                    return Err(DiError::DefinitionOverrideRejected {
                        name: name.to_string(),
                        existing: describe(&existing),
                    });
                }
                log_override(name, &existing, &definition);
                true
            }
            None => false,
        };

        self.definitions.insert(name.to_string(), Arc::new(definition));
        if !replaced {
            self.update_names(&mut *names, |names| names.push(name.to_string()));
            debug!(name, "Registered component definition");
        }
        drop(names);

        let invalidated = self.reset_merged(name);
        Ok(RegisterOutcome { replaced, invalidated })
    }

    /// Removes the definition stored under `name`; returns the names whose
    /// merged view was dropped.
    pub fn remove(&self, name: &str) -> DiResult<Vec<String>> {
        let mut names = self.names.write();
        if self.definitions.remove(name).is_none() {
            return Err(DiError::DefinitionNotFound { name: name.to_string() });
        }
        self.update_names(&mut *names, |names| names.retain(|n| n != name));
        drop(names);
        debug!(name, "Removed component definition");
        Ok(self.reset_merged(name))
    }

    fn update_names<F: FnOnce(&mut Vec<String>)>(&self, names: &mut Arc<Vec<String>>, update: F) {
        if self.creation_started.load(Ordering::Acquire) {
            // Readers may be iterating the current list; publish a new one.
            let mut copy = (**names).clone();
            update(&mut copy);
            *names = Arc::new(copy);
        } else {
            update(Arc::make_mut(names));
        }
    }

    /// Drops every cached type query. Called when assignability facts
    /// outside the registry change, such as new catalog views.
    pub(crate) fn invalidate_type_cache(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.type_cache.clear();
    }

    #[inline]
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Drops the merged view of `name` and of every definition inheriting
    /// from it, plus all cached type queries.
    pub fn reset_merged(&self, name: &str) -> Vec<String> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut invalidated = Vec::new();
        let mut pending = vec![name.to_string()];
        let mut seen = AHashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            self.merged.remove(&current);
            for entry in self.definitions.iter() {
                if entry.value().parent.as_deref() == Some(current.as_str()) {
                    pending.push(entry.key().clone());
                }
            }
            invalidated.push(current);
        }
        self.type_cache.clear();
        invalidated
    }

    /// Registers `alias` for `name`.
    pub fn register_alias(&self, name: &str, alias: &str) -> DiResult<()> {
        if alias == name {
            self.aliases.remove(alias);
            return Ok(());
        }
        if let Some(existing) = self.aliases.get(alias).map(|t| t.clone()) {
            if existing == name {
                return Ok(());
            }
            if !self.allow_overriding {
                return Err(DiError::DefinitionOverrideRejected {
                    name: alias.to_string(),
                    existing: format!("an alias for '{}'", existing),
                });
            }
            info!(alias, previous = %existing, target = name, "Overriding alias");
        }
        if self.definitions.contains_key(alias) && !self.allow_overriding {
            return Err(DiError::DefinitionOverrideRejected {
                name: alias.to_string(),
                existing: "a component definition".to_string(),
            });
        }
        if self.resolves_through(name, alias) {
            return Err(DiError::InvalidDefinition {
                name: alias.to_string(),
                reason: format!("alias cycle: '{}' already resolves to '{}'", name, alias),
            });
        }
        self.aliases.insert(alias.to_string(), name.to_string());
        self.invalidate_type_cache();
        debug!(alias, target = name, "Registered alias");
        Ok(())
    }

    // True if following aliases from `start` reaches `target`.
    fn resolves_through(&self, start: &str, target: &str) -> bool {
        let mut current = start.to_string();
        for _ in 0..=self.aliases.len() {
            if current == target {
                return true;
            }
            match self.aliases.get(&current) {
                Some(next) => current = next.clone(),
                None => return false,
            }
        }
        false
    }

    /// Follows aliases to the canonical definition name.
    pub fn canonical_name(&self, name: &str) -> String {
        let mut current = name.to_string();
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(&current) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Every alias resolving, directly or through other aliases, to `name`.
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let all: Vec<String> = self.aliases.iter().map(|entry| entry.key().clone()).collect();
        let mut found: Vec<String> = all
            .into_iter()
            .filter(|alias| self.canonical_name(alias) == name)
            .collect();
        found.sort();
        found
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(&self.canonical_name(name))
    }

    /// The definition as registered, without parent merging.
    pub fn get(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        let canonical = self.canonical_name(name);
        self.definitions
            .get(&canonical)
            .map(|d| d.clone())
            .ok_or_else(|| DiError::DefinitionNotFound { name: name.to_string() })
    }

    /// The definition layered over its parent chain; cached until the name
    /// or an ancestor changes.
    pub fn merged(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        let canonical = self.canonical_name(name);
        if let Some(cached) = self.merged.get(&canonical) {
            return Ok(cached.clone());
        }
        let generation = self.generation();
        let merged = self.merge_chain(&canonical, &mut Vec::new())?;
        self.merged.insert(canonical.clone(), merged.clone());
        if self.generation() != generation {
            // A reset ran meanwhile; the view may predate it
            self.merged.remove(&canonical);
        }
        Ok(merged)
    }

    fn merge_chain(&self, name: &str, visiting: &mut Vec<String>) -> DiResult<Arc<ComponentDefinition>> {
        if visiting.iter().any(|n| n == name) {
            visiting.push(name.to_string());
            return Err(DiError::InvalidDefinition {
                name: visiting[0].clone(),
                reason: format!("parent cycle: {}", visiting.join(" -> ")),
            });
        }
        let definition = self
            .definitions
            .get(name)
            .map(|d| d.clone())
            .ok_or_else(|| DiError::DefinitionNotFound { name: name.to_string() })?;

        let Some(parent_name) = definition.parent.clone() else {
            return Ok(definition);
        };
        visiting.push(name.to_string());
        let parent_canonical = self.canonical_name(&parent_name);
        let parent = match self.merged.get(&parent_canonical).map(|p| p.clone()) {
            Some(cached) => cached,
            None => self.merge_chain(&parent_canonical, visiting).map_err(|e| match e {
                DiError::DefinitionNotFound { .. } => DiError::InvalidDefinition {
                    name: name.to_string(),
                    reason: format!("parent definition '{}' does not exist", parent_name),
                },
                other => other,
            })?,
        };
        visiting.pop();
        Ok(Arc::new(definition.merged_over(&parent)))
    }

    /// Registration-ordered snapshot of the definition names.
    pub fn names(&self) -> Arc<Vec<String>> {
        self.names.read().clone()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn mark_creation_started(&self) {
        self.creation_started.store(true, Ordering::Release);
    }

    /// Names of definitions whose type can be used as `required`.
    ///
    /// Three filters apply in order: the definition must be concrete with a
    /// type that is declared, already instantiated, or (when
    /// `allow_eager_init`) learnable by creating it; its type must match;
    /// and the name must not be an alias. Results are memoized while the
    /// registry is frozen.
    pub fn names_of_type(
        &self,
        required: &ResolvableType,
        include_non_singletons: bool,
        allow_eager_init: bool,
        probe: &dyn TypeProbe,
    ) -> Arc<Vec<String>> {
        let query = TypeQuery {
            required: required.clone(),
            include_non_singletons,
            allow_eager_init,
        };
        let cacheable = self.cache_type_queries && self.is_frozen();
        if cacheable {
            if let Some(cached) = self.type_cache.get(&query) {
                return cached.clone();
            }
        }

        let generation = self.generation();
        let mut result = Vec::new();
        for name in self.names().iter() {
            let definition = match self.merged(name) {
                Ok(definition) => definition,
                Err(e) => {
                    trace!(name = %name, error = %e, "Skipping definition during type query");
                    continue;
                }
            };
            if definition.is_abstract {
                continue;
            }
            if !include_non_singletons && !definition.is_singleton() {
                continue;
            }
            let concrete = match definition.concrete_type() {
                Some(key) => Some(key.id()),
                None => probe.instantiated_type(name).or_else(|| {
                    if allow_eager_init && definition.is_singleton() {
                        probe.eager_type(name)
                    } else {
                        None
                    }
                }),
            };
            let Some(concrete) = concrete else {
                trace!(name = %name, "Type not determinable without eager creation");
                continue;
            };
            if !probe.type_matches(concrete, required) {
                continue;
            }
            if self.is_alias(name) {
                continue;
            }
            result.push(name.clone());
        }

        let result = Arc::new(result);
        if cacheable {
            self.type_cache.insert(query.clone(), result.clone());
            if self.generation() != generation {
                self.type_cache.remove(&query);
            }
        }
        result
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Definition Registry ===\n");
        for name in self.names().iter() {
            if let Some(definition) = self.definitions.get(name) {
                s.push_str(&format!("  {}: {:?}\n", name, definition.value()));
            }
        }
        for entry in self.aliases.iter() {
            s.push_str(&format!("  alias {} -> {}\n", entry.key(), entry.value()));
        }
        s
    }
}

fn describe(definition: &ComponentDefinition) -> String {
    match (&definition.component_type, &definition.origin) {
        (Some(ty), Some(origin)) => format!("a definition of {} from {}", ty, origin),
        (Some(ty), None) => format!("a definition of {}", ty),
        (None, Some(origin)) => format!("a definition from {}", origin),
        (None, None) => "an existing definition".to_string(),
    }
}

fn log_override(name: &str, existing: &ComponentDefinition, replacement: &ComponentDefinition) {
    if existing.role < replacement.role {
        warn!(
            name,
            existing_role = ?existing.role,
            new_role = ?replacement.role,
            "Overriding user-authored definition with a lower-importance one"
        );
    } else if existing.role == replacement.role {
        debug!(name, "Overriding definition with an equivalent-role replacement");
    } else {
        info!(
            name,
            existing_role = ?existing.role,
            new_role = ?replacement.role,
            "Overriding definition"
        );
    }
}
