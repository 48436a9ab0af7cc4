//! LSP request handlers
//!
//! Each editor operation lives in its own handler. All of them share the same
//! workspace and read analysis results through [`TextDocumentHandler::analysis_at`].

use super::utils::position_to_offset;
use super::workspace::SharedWorkspaceState;
use lg_core::DocumentAnalysis;
use lsp_types::TextDocumentPositionParams;
use std::sync::Arc;

pub mod common;
mod completion;
mod definition;
mod document_sync;
mod hover;
mod references;
mod signature_help;
pub mod workspace;

pub use completion::{completion_items, CompletionHandler};
pub use definition::DefinitionHandler;
pub use document_sync::DocumentSyncHandler;
pub use hover::HoverHandler;
pub use references::ReferencesHandler;
pub use signature_help::SignatureHelpHandler;
pub use workspace::WorkspaceHandler;

/// Anything that answers editor requests from the shared workspace.
pub trait Handler: Send + Sync {
    fn workspace(&self) -> &SharedWorkspaceState;
}

pub trait TextDocumentHandler: Handler {
    /// Analysis of the document at the request position, with the position as a byte
    /// offset. `None` when the document is not open or the position is out of range.
    fn analysis_at(
        &self,
        params: &TextDocumentPositionParams,
    ) -> Option<(Arc<DocumentAnalysis>, usize)> {
        let analysis = self.workspace().current_analysis(&params.text_document.uri)?;
        let offset = position_to_offset(analysis.line_index(), params.position)?;
        Some((analysis, offset))
    }
}

/// One handler per editor feature, all over the same workspace.
#[derive(Clone)]
pub struct Handlers {
    pub completion: CompletionHandler,
    pub definition: DefinitionHandler,
    pub hover: HoverHandler,
    pub signature_help: SignatureHelpHandler,
    pub document_sync: DocumentSyncHandler,
    pub references: ReferencesHandler,
    pub workspace: WorkspaceHandler,
}

impl Handlers {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self {
            completion: CompletionHandler::new(workspace.clone()),
            definition: DefinitionHandler::new(workspace.clone()),
            hover: HoverHandler::new(workspace.clone()),
            signature_help: SignatureHelpHandler::new(workspace.clone()),
            document_sync: DocumentSyncHandler::new(workspace.clone()),
            references: ReferencesHandler::new(workspace.clone()),
            workspace: WorkspaceHandler::new(workspace),
        }
    }
}
