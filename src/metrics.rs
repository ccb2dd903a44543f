//! Resolution and lifecycle counters.
//!
//! Counters are relaxed atomics; a [`MetricsSnapshot`] is a point-in-time
//! copy and may interleave with concurrent updates.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a container.
#[derive(Debug, Default)]
pub struct ResolutionMetrics {
    full_resolutions: AtomicU64,
    fallback_passes: AtomicU64,
    shortcut_hits: AtomicU64,
    stale_shortcuts: AtomicU64,
    instances_created: AtomicU64,
    singletons_committed: AtomicU64,
    early_references_exposed: AtomicU64,
    creation_failures: AtomicU64,
}

/// Plain copy of [`ResolutionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Candidate searches run through the full type search.
    pub full_resolutions: u64,
    /// Searches that needed the relaxed generic pass.
    pub fallback_passes: u64,
    /// Injection points served from a recorded shortcut name.
    pub shortcut_hits: u64,
    /// Shortcuts discarded because their component disappeared.
    pub stale_shortcuts: u64,
    /// Raw instances produced by suppliers, constructors or factory methods.
    pub instances_created: u64,
    pub singletons_committed: u64,
    pub early_references_exposed: u64,
    pub creation_failures: u64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        #[inline]
        pub(crate) fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl ResolutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_full_resolution, full_resolutions);
    counter!(record_fallback_pass, fallback_passes);
    counter!(record_shortcut_hit, shortcut_hits);
    counter!(record_stale_shortcut, stale_shortcuts);
    counter!(record_instance_created, instances_created);
    counter!(record_singleton_committed, singletons_committed);
    counter!(record_early_reference, early_references_exposed);
    counter!(record_creation_failure, creation_failures);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            full_resolutions: self.full_resolutions.load(Ordering::Relaxed),
            fallback_passes: self.fallback_passes.load(Ordering::Relaxed),
            shortcut_hits: self.shortcut_hits.load(Ordering::Relaxed),
            stale_shortcuts: self.stale_shortcuts.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
            singletons_committed: self.singletons_committed.load(Ordering::Relaxed),
            early_references_exposed: self.early_references_exposed.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Field-wise difference `self - earlier`, saturating at zero.
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            full_resolutions: self.full_resolutions.saturating_sub(earlier.full_resolutions),
            fallback_passes: self.fallback_passes.saturating_sub(earlier.fallback_passes),
            shortcut_hits: self.shortcut_hits.saturating_sub(earlier.shortcut_hits),
            stale_shortcuts: self.stale_shortcuts.saturating_sub(earlier.stale_shortcuts),
            instances_created: self.instances_created.saturating_sub(earlier.instances_created),
            singletons_committed: self.singletons_committed.saturating_sub(earlier.singletons_committed),
            early_references_exposed: self
                .early_references_exposed
                .saturating_sub(earlier.early_references_exposed),
            creation_failures: self.creation_failures.saturating_sub(earlier.creation_failures),
        }
    }
}
