//! The built-in population processor.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashSet;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::catalog::{concrete_type_of, AnyArc};
use crate::definition::{ComponentDefinition, PropertyValue};
use crate::descriptors::Shape;
use crate::injection::{InjectionPoint, MetadataSource, Project};
use crate::processor::{LifecycleContext, OnDefinitionReset, OnPopulate};
use crate::resolver::{Resolution, ResolvedComponent};
use crate::{DiError, DiResult};

struct InjectedElement {
    /// Projections from the concrete instance down to the declaring ancestor.
    path: Vec<Arc<dyn Project>>,
    point: InjectionPoint,
    /// Per host component: the name its last full resolution settled on,
    /// when that was unique.
    shortcuts: DashMap<String, String>,
}

impl InjectedElement {
    fn target<'a>(&self, instance: &'a dyn Any, component: &str) -> DiResult<&'a dyn Any> {
        let mut target = instance;
        for step in &self.path {
            target = step.project(target).ok_or_else(|| DiError::InvalidDefinition {
                name: component.to_string(),
                reason: format!(
                    "ancestor of injection point '{}' is not embedded in the instance",
                    self.point.member()
                ),
            })?;
        }
        Ok(target)
    }
}

#[derive(Default)]
struct InjectionMetadata {
    elements: Vec<InjectedElement>,
}

impl InjectionMetadata {
    fn element(&self, member: &str) -> Option<&InjectedElement> {
        self.elements.iter().find(|e| e.point.member() == member)
    }
}

/// Resolves and assigns injection points, and applies explicit property
/// values, during population.
///
/// Scan results are cached per concrete type. Each cached element keeps a
/// shortcut per host component: after a full resolution for that component
/// settles on one named candidate, its later populations fetch that name
/// directly. A shortcut whose target has since
/// been removed is dropped and the full search runs again.
pub struct Injector {
    source: Arc<dyn MetadataSource>,
    cache: DashMap<TypeId, Arc<InjectionMetadata>>,
}

impl Injector {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
        }
    }

    /// Drops every cached scan result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Member names of the injection points found for `type_id`, ancestors first.
    pub fn scanned_members(&self, type_id: TypeId) -> DiResult<Vec<String>> {
        Ok(self
            .metadata(type_id)?
            .elements
            .iter()
            .map(|e| e.point.member().to_string())
            .collect())
    }

    fn metadata(&self, type_id: TypeId) -> DiResult<Arc<InjectionMetadata>> {
        if let Some(cached) = self.cache.get(&type_id) {
            return Ok(cached.clone());
        }
        let mut visiting = AHashSet::new();
        let elements = self
            .scan(type_id, &mut visiting)?
            .into_iter()
            .map(|(path, point)| InjectedElement {
                path,
                point,
                shortcuts: DashMap::new(),
            })
            .collect();
        let built = Arc::new(InjectionMetadata { elements });
        Ok(self.cache.entry(type_id).or_insert(built).clone())
    }

    fn scan(
        &self,
        type_id: TypeId,
        visiting: &mut AHashSet<TypeId>,
    ) -> DiResult<Vec<(Vec<Arc<dyn Project>>, InjectionPoint)>> {
        let Some(structure) = self.source.structure(type_id) else {
            return Ok(Vec::new());
        };
        if !visiting.insert(type_id) {
            return Err(DiError::InvalidDefinition {
                name: structure.type_key().name().to_string(),
                reason: "type structure is its own ancestor".to_string(),
            });
        }

        let mut found = Vec::new();
        if let Some(ancestor) = structure.ancestor() {
            for (path, point) in self.scan(ancestor.type_id, visiting)? {
                let mut full = Vec::with_capacity(path.len() + 1);
                full.push(ancestor.projection.clone());
                full.extend(path);
                found.push((full, point));
            }
        }
        for point in structure.points() {
            // A redeclared member replaces the ancestor's point
            found.retain(|(_, existing)| existing.member() != point.member());
            found.push((Vec::new(), point.clone()));
        }
        trace!(
            type_name = structure.type_key().name(),
            points = found.len(),
            "Scanned injection points"
        );
        Ok(found)
    }

    fn resolve_element(&self, ctx: &LifecycleContext<'_>, element: &InjectedElement) -> DiResult<Resolution> {
        let inner = ctx.container();
        let descriptor = element.point.descriptor();
        let host = ctx.name();
        let shortcut = element.shortcuts.get(host).map(|name| name.clone());
        if let Some(name) = shortcut {
            if inner.registry.canonical_name(&name) != host {
                match inner.resolve_named_for(&name, descriptor.required_type(), Some(ctx.name())) {
                    Ok(value) => {
                        inner.metrics.record_shortcut_hit();
                        trace!(component = ctx.name(), member = element.point.member(), target = %name, "Injection shortcut");
                        return Ok(Resolution::Single(Some(ResolvedComponent::new(Some(name), value))));
                    }
                    Err(DiError::DefinitionNotFound { .. }) => {
                        inner.metrics.record_stale_shortcut();
                        debug!(component = ctx.name(), member = element.point.member(), target = %name, "Dropping stale injection shortcut");
                        element.shortcuts.remove(host);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let (resolution, names) = inner.resolve_dependency(descriptor, Some(ctx.name()))?;
        if matches!(descriptor.shape(), Shape::Single | Shape::Optional)
            && names.len() == 1
            && inner.registry.contains(&names[0])
        {
            element.shortcuts.insert(host.to_string(), names[0].clone());
        }
        Ok(resolution)
    }

    fn property_resolution(
        &self,
        ctx: &LifecycleContext<'_>,
        element: &InjectedElement,
        value: &PropertyValue,
    ) -> DiResult<Resolution> {
        let descriptor = element.point.descriptor();
        if descriptor.shape() == Shape::Deferred {
            return Err(DiError::InvalidDefinition {
                name: ctx.name().to_string(),
                reason: format!(
                    "deferred injection point '{}' cannot take an explicit value",
                    element.point.member()
                ),
            });
        }
        let component = match value {
            PropertyValue::Value(view) => ResolvedComponent::new(None, view.clone()),
            PropertyValue::Reference(target) => {
                let value = ctx
                    .container()
                    .resolve_named_for(target, descriptor.required_type(), Some(ctx.name()))?;
                ResolvedComponent::new(Some(target.clone()), value)
            }
        };
        if descriptor.shape().is_multiple() {
            Ok(Resolution::Many(vec![component]))
        } else {
            Ok(Resolution::Single(Some(component)))
        }
    }
}

impl OnPopulate for Injector {
    fn populate(&self, ctx: &LifecycleContext<'_>, instance: &AnyArc) -> DiResult<()> {
        let metadata = self.metadata(concrete_type_of(instance))?;
        let definition = ctx.definition();
        if metadata.elements.is_empty() && definition.properties.is_empty() {
            return Ok(());
        }
        for (member, _) in &definition.properties {
            if metadata.element(member).is_none() {
                return Err(DiError::InvalidDefinition {
                    name: ctx.name().to_string(),
                    reason: format!("property '{}' has no matching injection point", member),
                });
            }
        }

        let target: &dyn Any = &**instance;
        for element in &metadata.elements {
            if definition.property(element.point.member()).is_some() {
                continue;
            }
            let resolution = self.resolve_element(ctx, element)?;
            element.point.apply(element.target(target, ctx.name())?, resolution)?;
        }
        for (member, value) in &definition.properties {
            if let Some(element) = metadata.element(member) {
                let resolution = self.property_resolution(ctx, element, value)?;
                element.point.apply(element.target(target, ctx.name())?, resolution)?;
            }
        }
        Ok(())
    }
}

impl OnDefinitionReset for Injector {
    fn reset_definition(&self, name: &str, previous: Option<&ComponentDefinition>) {
        if let Some(concrete) = previous.and_then(|d| d.concrete_type()) {
            if self.cache.remove(&concrete.id()).is_some() {
                trace!(component = name, type_name = concrete.name(), "Injection metadata invalidated");
            }
        }
    }
}
