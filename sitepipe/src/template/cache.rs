//! Compiled template cache.

use super::CompiledTemplate;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiled templates keyed by absolute path.
///
/// Entries are created on first compile and never evicted, so edits on disk
/// are not picked up until the cache is dropped. Two requests compiling the
/// same uncached path at once both do the work and the later insert wins;
/// the results are equivalent.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: DashMap<PathBuf, Arc<CompiledTemplate>>,
}

impl TemplateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached template for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<CompiledTemplate>> {
        self.entries.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Stores a compiled template, replacing any previous entry.
    pub fn insert(&self, path: PathBuf, template: Arc<CompiledTemplate>) {
        self.entries.insert(path, template);
    }

    /// Returns true if `path` has been compiled.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Returns the number of cached templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
