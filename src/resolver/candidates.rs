//! Candidate search and disambiguation.
//!
//! Resolution of one descriptor runs: type search over definitions, manual
//! singletons and resolvable dependencies; self-reference exclusion;
//! eligibility and qualifier filtering; one relaxed-generics retry when
//! nothing matched; then primary, priority and name tie-breaking for
//! single-value shapes. The chosen component is materialized through the
//! lifecycle and checked against the required type by its runtime type.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use crate::catalog::{concrete_type_of, AnyArc};
use crate::definition::ComponentDefinition;
use crate::descriptors::{DependencyDescriptor, Shape};
use crate::key::{MatchMode, ResolvableType};
use crate::provider::{ComponentProvider, ContainerInner};
use crate::resolver::{Resolution, ResolvedComponent};
use crate::{DiError, DiResult};

type Candidates = SmallVec<[Candidate; 4]>;

enum CandidateSource {
    Definition(Arc<ComponentDefinition>),
    Manual,
    /// A view value registered for the required type itself.
    Resolvable(AnyArc),
}

struct Candidate {
    name: String,
    source: CandidateSource,
}

impl Candidate {
    fn definition(&self) -> Option<&ComponentDefinition> {
        match &self.source {
            CandidateSource::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    fn is_primary(&self) -> bool {
        self.definition().map(|d| d.primary).unwrap_or(false)
    }

    fn priority(&self) -> Option<i32> {
        self.definition().and_then(|d| d.priority)
    }

    fn sort_key(&self) -> i32 {
        self.definition()
            .and_then(|d| d.order.or(d.priority))
            .unwrap_or(i32::MAX)
    }

    fn component_name(&self) -> Option<&str> {
        match self.source {
            CandidateSource::Resolvable(_) => None,
            _ => Some(&self.name),
        }
    }
}

impl ContainerInner {
    /// Resolves `descriptor` on behalf of `requesting`; also returns the
    /// names of the components that contributed.
    pub(crate) fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> DiResult<(Resolution, Vec<String>)> {
        match descriptor.shape() {
            Shape::Deferred => {
                let provider = ComponentProvider::new(
                    self.this.clone(),
                    descriptor.nested(),
                    requesting.map(str::to_string),
                );
                Ok((Resolution::Deferred(provider), Vec::new()))
            }
            Shape::Optional => self.resolve_dependency(&descriptor.nested(), requesting),
            Shape::Collection { .. } | Shape::Map => self.resolve_multiple(descriptor, requesting),
            Shape::Single => self.resolve_single(descriptor, requesting),
        }
    }

    /// Fetches `name` and casts it to `required`, without a candidate search.
    pub(crate) fn resolve_named_for(
        &self,
        name: &str,
        required: &ResolvableType,
        requesting: Option<&str>,
    ) -> DiResult<AnyArc> {
        let instance = self.get_component_for(name, requesting)?;
        self.cast_instance(name, &instance, required)
    }

    pub(crate) fn cast_instance(&self, name: &str, instance: &AnyArc, required: &ResolvableType) -> DiResult<AnyArc> {
        self.catalog
            .cast(instance, required)
            .ok_or_else(|| DiError::TypeMismatch {
                name: name.to_string(),
                required_type: required.to_string(),
                actual_type: self.catalog.type_name(concrete_type_of(instance)).to_string(),
            })
    }

    fn resolve_single(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> DiResult<(Resolution, Vec<String>)> {
        self.metrics.record_full_resolution();
        let candidates = self.candidates_with_fallback(descriptor, requesting);
        let winner = match candidates.len() {
            0 => {
                if descriptor.is_required() {
                    return Err(DiError::NoMatchingCandidate {
                        required_type: descriptor.required_type().to_string(),
                        requesting: requesting.map(str::to_string),
                    });
                }
                return Ok((Resolution::Single(None), Vec::new()));
            }
            1 => 0,
            _ => match self.disambiguate(&candidates, descriptor, requesting)? {
                Some(index) => index,
                None if !descriptor.is_required() && descriptor.is_plural() => {
                    trace!(
                        required_type = %descriptor.required_type(),
                        "Ambiguous optional plural dependency left absent"
                    );
                    return Ok((Resolution::Single(None), Vec::new()));
                }
                None => {
                    return Err(non_unique(
                        &candidates,
                        descriptor,
                        requesting,
                        "no primary, priority or name match",
                    ))
                }
            },
        };

        let candidate = &candidates[winner];
        trace!(
            required_type = %descriptor.required_type(),
            candidate = %candidate.name,
            "Resolved single candidate"
        );
        let resolved = self.materialize(candidate, descriptor, requesting)?;
        let names = candidate.component_name().map(str::to_string).into_iter().collect();
        Ok((Resolution::Single(Some(resolved)), names))
    }

    fn resolve_multiple(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> DiResult<(Resolution, Vec<String>)> {
        self.metrics.record_full_resolution();
        let candidates = self.candidates_with_fallback(descriptor, requesting);
        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            resolved.push((candidate.sort_key(), candidate.component_name(), self.materialize(candidate, descriptor, requesting)?));
        }
        if matches!(descriptor.shape(), Shape::Collection { ordered: true }) {
            resolved.sort_by_key(|(key, _, _)| *key);
        }
        let names = resolved
            .iter()
            .filter_map(|(_, name, _)| name.map(str::to_string))
            .collect();
        let values = resolved.into_iter().map(|(_, _, component)| component).collect();
        Ok((Resolution::Many(values), names))
    }

    fn materialize(
        &self,
        candidate: &Candidate,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> DiResult<ResolvedComponent> {
        if let CandidateSource::Resolvable(view) = &candidate.source {
            return Ok(ResolvedComponent::new(None, view.clone()));
        }
        let value = self.resolve_named_for(&candidate.name, descriptor.required_type(), requesting)?;
        Ok(ResolvedComponent::new(Some(candidate.name.clone()), value))
    }

    fn candidates_with_fallback(&self, descriptor: &DependencyDescriptor, requesting: Option<&str>) -> Candidates {
        let found = self.find_candidates(descriptor, requesting);
        if !found.is_empty() || descriptor.mode() == MatchMode::Fallback {
            return found;
        }
        self.metrics.record_fallback_pass();
        trace!(required_type = %descriptor.required_type(), "No strict match; retrying with relaxed generics");
        self.find_candidates(&descriptor.for_fallback_match(), requesting)
    }

    fn find_candidates(&self, descriptor: &DependencyDescriptor, requesting: Option<&str>) -> Candidates {
        let required = descriptor.required_type();
        let requesting = requesting.map(|name| self.registry.canonical_name(name));
        let skip_factory_products = !descriptor.shape().is_multiple();
        let mut found = Candidates::new();

        let names = self.registry.names_of_type(
            required,
            true,
            self.config.allow_eager_init_for_type_matching,
            self,
        );
        for name in names.iter() {
            if requesting.as_deref() == Some(name.as_str()) {
                continue;
            }
            let Ok(definition) = self.registry.merged(name) else {
                continue;
            };
            if skip_factory_products {
                if let (Some(owner), Some(requesting)) = (definition.factory_owner(), requesting.as_deref()) {
                    if self.registry.canonical_name(owner) == requesting {
                        continue;
                    }
                }
            }
            if !definition.autowire_candidate {
                continue;
            }
            let concrete = definition
                .concrete_type()
                .map(|key| key.id())
                .or_else(|| self.singletons.get(name).map(|i| concrete_type_of(&i)));
            if let Some(concrete) = concrete {
                if !self.catalog.matches(concrete, required, descriptor.mode()) {
                    continue;
                }
            }
            if !self.qualifiers_satisfied(descriptor, name, Some(&definition)) {
                continue;
            }
            found.push(Candidate {
                name: name.clone(),
                source: CandidateSource::Definition(definition),
            });
        }

        for name in self.singletons.manual_names() {
            if self.registry.contains(&name) || requesting.as_deref() == Some(name.as_str()) {
                continue;
            }
            let Some(instance) = self.singletons.get(&name) else {
                continue;
            };
            if !self.catalog.matches(concrete_type_of(&instance), required, descriptor.mode()) {
                continue;
            }
            if !self.qualifiers_satisfied(descriptor, &name, None) {
                continue;
            }
            found.push(Candidate {
                name,
                source: CandidateSource::Manual,
            });
        }

        if descriptor.qualifiers().is_empty() {
            if let Some(key) = required.raw() {
                if let Some(entry) = self.resolvable.get(&key.id()) {
                    found.push(Candidate {
                        name: key.name().to_string(),
                        source: CandidateSource::Resolvable(entry.1.clone()),
                    });
                }
            }
        }

        trace!(
            required_type = %required,
            mode = ?descriptor.mode(),
            count = found.len(),
            "Candidate search"
        );
        found
    }

    fn qualifiers_satisfied(
        &self,
        descriptor: &DependencyDescriptor,
        name: &str,
        definition: Option<&ComponentDefinition>,
    ) -> bool {
        descriptor.qualifiers().iter().all(|qualifier| {
            definition.map(|d| d.has_qualifier(qualifier)).unwrap_or(false)
                || (qualifier.is_default_kind() && self.registry.canonical_name(&qualifier.value) == name)
        })
    }

    /// Primary, then lowest declared priority, then a resolvable dependency
    /// or the declaring name. `Ok(None)` means no rule picked a winner.
    fn disambiguate(
        &self,
        candidates: &Candidates,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> DiResult<Option<usize>> {
        let primaries: SmallVec<[usize; 4]> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary())
            .map(|(i, _)| i)
            .collect();
        match primaries.len() {
            0 => {}
            1 => return Ok(Some(primaries[0])),
            _ => {
                return Err(non_unique(
                    candidates,
                    descriptor,
                    requesting,
                    "more than one candidate is marked primary",
                ))
            }
        }

        if let Some(lowest) = candidates.iter().filter_map(|c| c.priority()).min() {
            let at_lowest: SmallVec<[usize; 4]> = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.priority() == Some(lowest))
                .map(|(i, _)| i)
                .collect();
            if at_lowest.len() == 1 {
                return Ok(Some(at_lowest[0]));
            }
            return Err(non_unique(
                candidates,
                descriptor,
                requesting,
                &format!("several candidates share the lowest priority {}", lowest),
            ));
        }

        if let Some(index) = candidates
            .iter()
            .position(|c| matches!(c.source, CandidateSource::Resolvable(_)))
        {
            return Ok(Some(index));
        }

        if let Some(declared) = descriptor.declaring_name() {
            let target = self.registry.canonical_name(declared);
            if let Some(index) = candidates
                .iter()
                .position(|c| c.name == declared || c.name == target)
            {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

fn non_unique(
    candidates: &Candidates,
    descriptor: &DependencyDescriptor,
    requesting: Option<&str>,
    reason: &str,
) -> DiError {
    DiError::NonUniqueCandidate {
        required_type: descriptor.required_type().to_string(),
        requesting: requesting.map(str::to_string),
        candidates: candidates.iter().map(|c| c.name.clone()).collect(),
        reason: reason.to_string(),
    }
}
