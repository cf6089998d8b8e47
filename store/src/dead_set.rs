use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Concurrent-safe set of index paths marked for deletion during a pass.
///
/// Integrity workers are write-only against this set; the index-walk driver thread
/// is read-only until the pass's deletion phase, where it drains the set.
#[derive(Default)]
pub struct DeadIndexSet {
    inner: Mutex<HashSet<PathBuf>>,
}

impl DeadIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, path: impl Into<PathBuf>) {
        self.inner.lock().unwrap().insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().contains(path)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume self, returning the marked paths for the deletion phase.
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.inner.into_inner().unwrap().into_iter().collect()
    }

    /// Drain the marked paths without consuming self, for callers holding the set
    /// behind an `Arc`.
    pub fn drain_paths(&self) -> Vec<PathBuf> {
        let mut guard = self.inner.lock().unwrap();
        std::mem::take(&mut *guard).into_iter().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mark_and_drain() {
        let set = DeadIndexSet::new();
        set.mark("/a.nar");
        set.mark("/b.narinfo");
        set.mark("/a.nar"); // duplicate, should not double-count
        assert_eq!(set.len(), 2);
        assert!(set.contains(Path::new("/a.nar")));

        let paths = set.into_paths();
        assert_eq!(paths.len(), 2);
    }
}
