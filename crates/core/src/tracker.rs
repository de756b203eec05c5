use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Paths already handled during this run. Grows monotonically and is never
/// persisted; finished folders are remembered across runs by their manifests.
#[derive(Debug, Default, Clone)]
pub struct CompletionTracker {
    processed: HashSet<PathBuf>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the path was not already recorded.
    pub fn mark_completed(&mut self, path: impl Into<PathBuf>) -> bool {
        self.processed.insert(path.into())
    }

    pub fn is_completed(&self, path: &Path) -> bool {
        self.processed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
