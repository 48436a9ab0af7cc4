use super::SharedWorkspaceState;
use lg_core::imports::SourceProvider;
use lg_core::SourceError;
use lsp_types::Url;
use std::sync::Arc;

/// Import sources as the editor sees them: open documents first, then disk.
pub struct WorkspaceSources<'a> {
    workspace: &'a SharedWorkspaceState,
}

impl<'a> WorkspaceSources<'a> {
    pub fn new(workspace: &'a SharedWorkspaceState) -> Self {
        Self { workspace }
    }
}

impl SourceProvider for WorkspaceSources<'_> {
    fn read_source(&self, uri: &Url) -> Result<Arc<str>, SourceError> {
        if let Some(document) = self.workspace.read().documents.get(uri) {
            return Ok(Arc::from(document.content()));
        }
        self.workspace.files().read(uri)
    }
}
