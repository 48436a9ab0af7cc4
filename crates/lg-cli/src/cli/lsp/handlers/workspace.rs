//! Workspace-level notifications
//!
//! Files change on disk behind the server's back: a `git checkout`, an edit in
//! another tool. The editor reports them through `workspace/didChangeWatchedFiles`.

use super::Handler;
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lsp_types::*;
use std::collections::BTreeSet;

#[derive(Clone)]
pub struct WorkspaceHandler {
    workspace: SharedWorkspaceState,
}

impl WorkspaceHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    /// Drops cached copies of the changed files and marks every open document whose
    /// scope includes one of them as stale. Returns those documents, in uri order, so
    /// the caller can re-analyze them.
    pub fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) -> Vec<Url> {
        let mut affected = BTreeSet::new();
        for change in params.changes {
            self.workspace.files().invalidate(&change.uri);
            let workspace = self.workspace.read();
            if workspace.documents.contains(&change.uri) {
                // the buffer wins over the disk while open
                continue;
            }
            tracing::debug!(uri = %change.uri, kind = ?change.typ, "watched file changed");
            for dependent in workspace.open_dependents(&change.uri) {
                self.workspace.index().mark_stale(&dependent);
                affected.insert(dependent);
            }
        }
        affected.into_iter().collect()
    }
}

impl Handler for WorkspaceHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}
