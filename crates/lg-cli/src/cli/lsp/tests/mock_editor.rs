//! Mock editor for testing LSP handlers.
//!
//! [`MockEditor`] drives the handlers the way an editor drives the server: it opens
//! documents, sends incremental edits with increasing versions and asks for
//! completion, hover and navigation at positions found by text markers. No message
//! loop or background analysis is involved; requests analyze on demand.

use super::test_utils::{position_after, url};
use crate::cli::lsp::handlers::Handlers;
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lsp_types::*;
use std::collections::HashMap;

pub struct MockEditor {
    workspace: SharedWorkspaceState,
    handlers: Handlers,
    /// Version and text of each open buffer, as the editor sees them.
    buffers: HashMap<Url, (i32, String)>,
}

impl MockEditor {
    pub fn new() -> Self {
        let workspace = SharedWorkspaceState::default();
        Self { handlers: Handlers::new(workspace.clone()), workspace, buffers: HashMap::new() }
    }

    pub fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }

    pub fn open(&mut self, name: &str, text: &str) -> Url {
        let uri = url(name);
        self.handlers.document_sync.did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem::new(uri.clone(), "lg".into(), 1, text.into()),
        });
        self.buffers.insert(uri.clone(), (1, text.to_string()));
        uri
    }

    /// Inserts `text` right after the first occurrence of `marker`.
    pub fn insert_after(&mut self, name: &str, marker: &str, text: &str) {
        let uri = url(name);
        let (version, content) = self.buffers.get(&uri).cloned().expect("document not open");
        let position = position_after(&content, marker);
        let offset = content.find(marker).unwrap() + marker.len();
        let change = TextDocumentContentChangeEvent {
            range: Some(Range::new(position, position)),
            range_length: None,
            text: text.to_string(),
        };
        self.send_changes(&uri, version + 1, vec![change]).unwrap();

        let mut updated = content;
        updated.insert_str(offset, text);
        self.buffers.insert(uri, (version + 1, updated));
    }

    /// Replaces the whole buffer.
    pub fn replace(&mut self, name: &str, text: &str) {
        let uri = url(name);
        let (version, _) = self.buffers.get(&uri).cloned().expect("document not open");
        let change = TextDocumentContentChangeEvent { range: None, range_length: None, text: text.into() };
        self.send_changes(&uri, version + 1, vec![change]).unwrap();
        self.buffers.insert(uri, (version + 1, text.to_string()));
    }

    pub fn send_changes(
        &self,
        uri: &Url,
        version: i32,
        content_changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Result<Url, crate::cli::lsp::workspace::DocumentError> {
        self.handlers.document_sync.did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier::new(uri.clone(), version),
            content_changes,
        })
    }

    pub fn close(&mut self, name: &str) {
        let uri = url(name);
        self.handlers.document_sync.did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier::new(uri.clone()),
        });
        self.buffers.remove(&uri);
    }

    pub fn completion_labels(&self, name: &str, marker: &str) -> Vec<String> {
        let params = CompletionParams {
            text_document_position: self.position(name, marker),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        };
        match self.handlers.completion.completion(params) {
            Some(CompletionResponse::Array(items)) => items.into_iter().map(|i| i.label).collect(),
            Some(CompletionResponse::List(list)) => list.items.into_iter().map(|i| i.label).collect(),
            None => Vec::new(),
        }
    }

    pub fn hover_text(&self, name: &str, marker: &str) -> Option<String> {
        let hover = self.handlers.hover.hover(HoverParams {
            text_document_position_params: self.position(name, marker),
            work_done_progress_params: Default::default(),
        })?;
        match hover.contents {
            HoverContents::Markup(content) => Some(content.value),
            other => panic!("unexpected hover contents {:?}", other),
        }
    }

    pub fn definitions(&self, name: &str, marker: &str) -> Vec<Location> {
        let response = self.handlers.definition.goto_definition(GotoDefinitionParams {
            text_document_position_params: self.position(name, marker),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        });
        match response {
            Some(GotoDefinitionResponse::Array(locations)) => locations,
            Some(GotoDefinitionResponse::Scalar(location)) => vec![location],
            Some(GotoDefinitionResponse::Link(_)) => panic!("unexpected location links"),
            None => Vec::new(),
        }
    }

    pub fn references(&self, name: &str, marker: &str, include_declaration: bool) -> Vec<Location> {
        self.handlers
            .references
            .find_references(ReferenceParams {
                text_document_position: self.position(name, marker),
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
                context: ReferenceContext { include_declaration },
            })
            .unwrap_or_default()
    }

    pub fn signature_label(&self, name: &str, marker: &str) -> Option<(String, u32)> {
        let help = self.handlers.signature_help.signature_help(SignatureHelpParams {
            context: None,
            text_document_position_params: self.position(name, marker),
            work_done_progress_params: Default::default(),
        })?;
        Some((help.signatures[0].label.clone(), help.active_parameter?))
    }

    pub fn assert_content(&self, name: &str, expected: &str) {
        let workspace = self.workspace.read();
        let document = workspace.documents.get(&url(name)).expect("document not open");
        assert_eq!(document.content(), expected, "server copy of {} diverged", name);
        assert_eq!(self.buffers[&url(name)].1, expected, "editor copy of {} diverged", name);
    }

    pub fn assert_version(&self, name: &str, expected: i32) {
        let workspace = self.workspace.read();
        let document = workspace.documents.get(&url(name)).expect("document not open");
        assert_eq!(document.version(), expected);
    }

    fn position(&self, name: &str, marker: &str) -> TextDocumentPositionParams {
        let uri = url(name);
        let (_, content) = self.buffers.get(&uri).expect("document not open");
        TextDocumentPositionParams::new(TextDocumentIdentifier::new(uri.clone()), position_after(content, marker))
    }
}
