//! Singleton instance registry with early references and single-flight
//! creation.
//!
//! Each singleton name moves through three slot states: empty, early
//! reference exposed (instance allocated but not yet populated) and fully
//! initialized. Lookups of committed instances are lock-free map reads;
//! creation is serialized by one re-entrant lock, so a second thread asking
//! for a name under construction waits for the first thread's result
//! instead of starting its own.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::catalog::AnyArc;
use crate::internal::{DisposeBag, Disposer};
use crate::{DiError, DiResult};

/// Produces the early reference for a singleton under construction.
pub(crate) type EarlyFactory = Box<dyn FnOnce() -> DiResult<AnyArc> + Send + Sync>;

/// Data-pointer identity of two erased instances.
#[inline]
pub(crate) fn same_instance(a: &AnyArc, b: &AnyArc) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[derive(Default)]
pub(crate) struct SingletonRegistry {
    singletons: DashMap<String, AnyArc>,
    early_objects: DashMap<String, AnyArc>,
    early_factories: DashMap<String, EarlyFactory>,
    commit_order: Mutex<Vec<String>>,
    manual: Mutex<Vec<String>>,
    creation_lock: ReentrantMutex<()>,
    in_creation: Mutex<Vec<String>>,
    dependents: Mutex<AHashMap<String, AHashSet<String>>>,
    dependencies: Mutex<AHashMap<String, AHashSet<String>>>,
    // Components handed the early reference of a singleton still in creation
    early_holders: Mutex<AHashMap<String, AHashSet<String>>>,
    disposers: Mutex<DisposeBag>,
}

impl SingletonRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A committed instance, without considering early references.
    #[inline]
    pub(crate) fn get(&self, name: &str) -> Option<AnyArc> {
        self.singletons.get(name).map(|v| v.clone())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    /// A committed instance, or the early reference of a singleton under
    /// construction.
    ///
    /// For a name in creation the caller takes the creation lock: the owning
    /// thread re-enters and gets the early reference, any other thread waits
    /// until construction ends and then sees the committed instance.
    pub(crate) fn get_allow_early(&self, name: &str) -> DiResult<Option<AnyArc>> {
        if let Some(instance) = self.get(name) {
            return Ok(Some(instance));
        }
        if !self.is_in_creation(name) {
            return Ok(None);
        }
        let _guard = self.creation_lock.lock();
        if let Some(instance) = self.get(name) {
            return Ok(Some(instance));
        }
        if let Some(early) = self.early_objects.get(name).map(|v| v.clone()) {
            return Ok(Some(early));
        }
        if let Some((_, factory)) = self.early_factories.remove(name) {
            let early = factory()?;
            trace!(component = name, "Early reference materialized");
            self.early_objects.insert(name.to_string(), early.clone());
            return Ok(Some(early));
        }
        Ok(None)
    }

    /// The early reference handed out while `name` was under construction, if any.
    pub(crate) fn early_object(&self, name: &str) -> Option<AnyArc> {
        self.early_objects.get(name).map(|v| v.clone())
    }

    /// Returns the committed instance or runs `create` exactly once, under
    /// the creation lock, and commits its result.
    ///
    /// On failure nothing stays reachable under `name`: early references
    /// are evicted and components that captured one are destroyed.
    pub(crate) fn get_or_create<F>(&self, name: &str, create: F) -> DiResult<(AnyArc, bool)>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        if let Some(instance) = self.get(name) {
            return Ok((instance, false));
        }
        let _guard = self.creation_lock.lock();
        if let Some(instance) = self.get(name) {
            return Ok((instance, false));
        }
        self.begin_creation(name)?;
        let created = create();
        self.end_creation(name);
        match created {
            Ok(instance) => {
                self.commit(name, instance.clone());
                Ok((instance, true))
            }
            Err(e) => {
                debug!(component = name, error = %e, "Singleton creation failed; rolling back");
                self.destroy(name);
                Err(e)
            }
        }
    }

    fn begin_creation(&self, name: &str) -> DiResult<()> {
        let mut in_creation = self.in_creation.lock();
        if let Some(start) = in_creation.iter().position(|n| n == name) {
            let mut path: Vec<String> = in_creation[start..].to_vec();
            path.push(name.to_string());
            return Err(DiError::CircularConstruction { path });
        }
        in_creation.push(name.to_string());
        Ok(())
    }

    fn end_creation(&self, name: &str) {
        let mut in_creation = self.in_creation.lock();
        if let Some(position) = in_creation.iter().rposition(|n| n == name) {
            in_creation.remove(position);
        }
    }

    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        self.in_creation.lock().iter().any(|n| n == name)
    }

    /// Publishes the early-reference factory for a singleton under construction.
    pub(crate) fn add_early_factory(&self, name: &str, factory: EarlyFactory) {
        if self.singletons.contains_key(name) {
            return;
        }
        self.early_objects.remove(name);
        self.early_factories.insert(name.to_string(), factory);
    }

    fn commit(&self, name: &str, instance: AnyArc) {
        self.singletons.insert(name.to_string(), instance);
        self.early_objects.remove(name);
        self.early_factories.remove(name);
        self.early_holders.lock().remove(name);
        let mut order = self.commit_order.lock();
        if !order.iter().any(|n| n == name) {
            order.push(name.to_string());
        }
        debug!(component = name, "Singleton committed");
    }

    /// Registers an externally created instance.
    pub(crate) fn register_manual(&self, name: &str, instance: AnyArc) -> DiResult<()> {
        let _guard = self.creation_lock.lock();
        if self.singletons.contains_key(name) {
            return Err(DiError::DefinitionOverrideRejected {
                name: name.to_string(),
                existing: "a registered singleton instance".to_string(),
            });
        }
        self.commit(name, instance);
        self.manual.lock().push(name.to_string());
        Ok(())
    }

    /// Names of instances registered without a definition.
    pub(crate) fn manual_names(&self) -> Vec<String> {
        self.manual.lock().clone()
    }

    pub(crate) fn register_disposer(&self, name: &str, hook: Disposer) {
        self.disposers.lock().push(name, hook);
    }

    pub(crate) fn has_disposers(&self) -> bool {
        !self.disposers.lock().is_empty()
    }

    /// Records that `dependent` holds a reference to `dependency`.
    pub(crate) fn register_dependent(&self, dependency: &str, dependent: &str) {
        self.dependents
            .lock()
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
        self.dependencies
            .lock()
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    pub(crate) fn dependents_of(&self, name: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .dependents
            .lock()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        found.sort();
        found
    }

    /// Records that `holder` received the early reference of `name`.
    pub(crate) fn register_early_holder(&self, name: &str, holder: &str) {
        self.early_holders
            .lock()
            .entry(name.to_string())
            .or_default()
            .insert(holder.to_string());
    }

    /// Components holding the early reference of `name`, sorted.
    pub(crate) fn early_holders_of(&self, name: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .early_holders
            .lock()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        found.sort();
        found
    }

    pub(crate) fn dependencies_of(&self, name: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .dependencies
            .lock()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        found.sort();
        found
    }

    /// Whether `candidate` depends on `name`, directly or transitively.
    pub(crate) fn is_dependent(&self, name: &str, candidate: &str) -> bool {
        let dependents = self.dependents.lock();
        let mut seen = AHashSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(set) = dependents.get(&current) {
                if set.contains(candidate) {
                    return true;
                }
                pending.extend(set.iter().cloned());
            }
        }
        false
    }

    /// Evicts `name` and, first, everything that depends on it; runs the
    /// destruction hooks.
    pub(crate) fn destroy(&self, name: &str) {
        let removed = self.singletons.remove(name).is_some();
        self.early_objects.remove(name);
        self.early_factories.remove(name);
        self.early_holders.lock().remove(name);
        self.commit_order.lock().retain(|n| n != name);
        self.manual.lock().retain(|n| n != name);
        // Take the hook before recursing so a dependency cycle runs it once
        let hook = self.disposers.lock().take(name);

        let dependents = self.dependents.lock().remove(name);
        if let Some(dependents) = dependents {
            for dependent in dependents {
                trace!(component = name, dependent = %dependent, "Destroying dependent first");
                self.destroy(&dependent);
            }
        }

        if let Some(hook) = hook {
            hook();
        }

        let mut dependents = self.dependents.lock();
        for set in dependents.values_mut() {
            set.remove(name);
        }
        drop(dependents);
        if let Some(dependencies) = self.dependencies.lock().remove(name) {
            let mut dependents = self.dependents.lock();
            for dependency in dependencies {
                if let Some(set) = dependents.get_mut(&dependency) {
                    set.remove(name);
                }
            }
        }
        if removed {
            debug!(component = name, "Singleton destroyed");
        }
    }

    /// Destroys every singleton, most recently committed first.
    pub(crate) fn destroy_all(&self) {
        let names: Vec<String> = self.commit_order.lock().iter().rev().cloned().collect();
        for name in names {
            self.destroy(&name);
        }
        let leftover = self.disposers.lock().names_reverse();
        for name in leftover {
            self.destroy(&name);
        }
        self.singletons.clear();
        self.early_objects.clear();
        self.early_factories.clear();
        self.dependents.lock().clear();
        self.dependencies.lock().clear();
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.commit_order.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.singletons.len()
    }
}
