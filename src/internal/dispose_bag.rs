//! Internal disposal bag for managing per-component cleanup hooks.

/// Destruction hook for one committed singleton.
pub(crate) type Disposer = Box<dyn FnOnce() + Send>;

/// Cleanup hooks keyed by component name, kept in registration order.
///
/// Hooks can be taken out one at a time (single destruction) or drained in
/// LIFO order (container shutdown).
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<(String, Disposer)>,
}

impl DisposeBag {
    /// Adds the hook for `name`, replacing any earlier one.
    pub(crate) fn push(&mut self, name: &str, hook: Disposer) {
        self.hooks.retain(|(existing, _)| existing != name);
        self.hooks.push((name.to_string(), hook));
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Disposer> {
        let position = self.hooks.iter().position(|(existing, _)| existing == name)?;
        Some(self.hooks.remove(position).1)
    }

    /// Names with pending hooks, most recently registered first.
    pub(crate) fn names_reverse(&self) -> Vec<String> {
        self.hooks.iter().rev().map(|(name, _)| name.clone()).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
