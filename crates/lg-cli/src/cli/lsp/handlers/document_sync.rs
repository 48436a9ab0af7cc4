//! Document synchronization handler
//!
//! Handles document lifecycle events: open, change, save, close. Scheduling the
//! analysis that follows is left to the caller.

use super::Handler;
use crate::cli::lsp::workspace::{Document, DocumentError, SharedWorkspaceState};
use lsp_types::*;

#[derive(Clone)]
pub struct DocumentSyncHandler {
    workspace: SharedWorkspaceState,
}

impl DocumentSyncHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    /// Handle document open
    pub fn did_open(&self, params: DidOpenTextDocumentParams) -> Url {
        let item = params.text_document;
        tracing::debug!(uri = %item.uri, version = item.version, "document opened");
        let uri = item.uri.clone();
        self.workspace
            .write()
            .documents
            .open(Document::new(item.uri, item.version, item.text, item.language_id));
        uri
    }

    /// Handle document change. A rejected edit leaves the document untouched.
    pub fn did_change(&self, params: DidChangeTextDocumentParams) -> Result<Url, DocumentError> {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        self.workspace.write().documents.change(&uri, version, params.content_changes)?;
        self.workspace.index().mark_stale(&uri);
        self.mark_dependents_stale(&uri);
        Ok(uri)
    }

    /// Handle document save. The editor buffer is authoritative while the document is
    /// open, so the only effect is dropping any cached disk copy.
    pub fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.workspace.files().invalidate(&params.text_document.uri);
    }

    /// Handle document close. Returns whether the document was open.
    pub fn did_close(&self, params: DidCloseTextDocumentParams) -> bool {
        let uri = params.text_document.uri;
        let mut workspace = self.workspace.write();
        let was_open = workspace.documents.close(&uri).is_some();
        workspace.dependencies.remove_dependencies_of(&uri);
        self.workspace.index().remove(&uri);
        drop(workspace);
        // dependents now read the file from disk instead of the buffer
        self.mark_dependents_stale(&uri);
        tracing::debug!(%uri, was_open, "document closed");
        was_open
    }

    fn mark_dependents_stale(&self, uri: &Url) {
        let dependents = self.workspace.read().open_dependents(uri);
        for dependent in dependents {
            self.workspace.index().mark_stale(&dependent);
        }
    }
}

impl Handler for DocumentSyncHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}
