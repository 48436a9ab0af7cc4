//! Latest committed analysis per document.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lg_core::DocumentAnalysis;
use lsp_types::Url;
use std::sync::Arc;

/// An immutable analysis result, tagged with the document version it was computed
/// from and the scheduling sequence of the job that computed it.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    pub analysis: Arc<DocumentAnalysis>,
    pub diagnostics: Vec<lsp_types::Diagnostic>,
    pub version: i32,
    pub sequence: u64,
    /// Something in the scope changed since this was computed.
    pub stale: bool,
}

impl AnalysisSnapshot {
    pub fn new(
        analysis: DocumentAnalysis,
        diagnostics: Vec<lsp_types::Diagnostic>,
        version: i32,
        sequence: u64,
    ) -> Self {
        Self { analysis: Arc::new(analysis), diagnostics, version, sequence, stale: false }
    }

    pub fn tag(&self) -> (i32, u64) {
        (self.version, self.sequence)
    }

    /// True when this snapshot describes `version` and nothing it read has changed.
    pub fn is_current(&self, version: i32) -> bool {
        !self.stale && self.version == version
    }
}

/// uri -> latest committed snapshot. Each slot is swapped whole, so readers always
/// see a complete snapshot.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceIndex {
    snapshots: Arc<DashMap<Url, Arc<AnalysisSnapshot>>>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the snapshot unless the slot already holds one with an equal or newer
    /// tag. Returns whether it was stored.
    pub fn commit(&self, uri: &Url, snapshot: AnalysisSnapshot) -> bool {
        match self.snapshots.entry(uri.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().tag() >= snapshot.tag() {
                    return false;
                }
                entry.insert(Arc::new(snapshot));
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(snapshot));
                true
            }
        }
    }

    pub fn get(&self, uri: &Url) -> Option<Arc<AnalysisSnapshot>> {
        self.snapshots.get(uri).map(|entry| entry.value().clone())
    }

    pub fn mark_stale(&self, uri: &Url) {
        if let Some(mut entry) = self.snapshots.get_mut(uri) {
            if !entry.stale {
                let mut snapshot = AnalysisSnapshot::clone(entry.value());
                snapshot.stale = true;
                *entry = Arc::new(snapshot);
            }
        }
    }

    pub fn remove(&self, uri: &Url) -> Option<Arc<AnalysisSnapshot>> {
        self.snapshots.remove(uri).map(|(_, snapshot)| snapshot)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::lsp::tests::test_utils::{analysis_of, url};

    fn snapshot(version: i32, sequence: u64) -> AnalysisSnapshot {
        AnalysisSnapshot::new(analysis_of("main.lg", "# A\n- a"), vec![], version, sequence)
    }

    #[test]
    fn test_commit_only_when_newer() {
        let index = WorkspaceIndex::new();
        let uri = url("main.lg");

        assert!(index.commit(&uri, snapshot(2, 5)));
        assert!(!index.commit(&uri, snapshot(1, 9)));
        assert!(!index.commit(&uri, snapshot(2, 5)));
        assert!(index.commit(&uri, snapshot(2, 6)));
        assert_eq!(index.get(&uri).unwrap().tag(), (2, 6));
    }

    #[test]
    fn test_mark_stale_keeps_readers_snapshot() {
        let index = WorkspaceIndex::new();
        let uri = url("main.lg");
        index.commit(&uri, snapshot(1, 1));

        let held = index.get(&uri).unwrap();
        index.mark_stale(&uri);
        assert!(!held.stale);
        assert!(held.is_current(1));
        assert!(!index.get(&uri).unwrap().is_current(1));
    }

    #[test]
    fn test_remove_and_clear() {
        let index = WorkspaceIndex::new();
        index.commit(&url("a.lg"), snapshot(1, 1));
        index.commit(&url("b.lg"), snapshot(1, 2));

        assert!(index.remove(&url("a.lg")).is_some());
        assert_eq!(index.len(), 1);
        index.clear();
        assert!(index.is_empty());
    }
}
