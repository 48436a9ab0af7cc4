//! Open documents and ordered edit application.

use lg_core::types::{LineCol, LineIndex};
use lsp_types::{TextDocumentContentChangeEvent, Url};
use std::collections::HashMap;
use thiserror::Error;

/// Why an edit was refused. The document is unchanged in every case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The edit does not advance the document version
    #[error("stale edit for {uri}: version {received} is not newer than {current}")]
    StaleVersion { uri: Url, current: i32, received: i32 },

    /// The edit targets a document the editor never opened
    #[error("document {0} is not open")]
    NotOpen(Url),

    /// An incremental change points outside the document
    #[error("change range {line}:{character} is outside {uri}")]
    InvalidRange { uri: Url, line: u32, character: u32 },
}

/// An open document as the editor last described it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    uri: Url,
    version: i32,
    content: String,
    language_id: String,
}

impl Document {
    pub fn new(uri: Url, version: i32, content: String, language_id: String) -> Self {
        Self { uri, version, content, language_id }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    /// Applies a batch of changes for `version`, in order. Either every change lands
    /// and the version advances, or nothing changes.
    pub fn apply_changes(
        &mut self,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Result<(), DocumentError> {
        if version <= self.version {
            return Err(DocumentError::StaleVersion {
                uri: self.uri.clone(),
                current: self.version,
                received: version,
            });
        }

        let mut content = self.content.clone();
        for change in changes {
            match change.range {
                None => content = change.text,
                Some(range) => {
                    let index = LineIndex::new(&content);
                    let start = self.offset(&index, range.start)?;
                    let end = self.offset(&index, range.end)?.max(start);
                    content.replace_range(start..end, &change.text);
                }
            }
        }

        self.content = content;
        self.version = version;
        Ok(())
    }

    fn offset(&self, index: &LineIndex, position: lsp_types::Position) -> Result<usize, DocumentError> {
        index.offset(LineCol::new(position.line, position.character)).ok_or_else(|| {
            DocumentError::InvalidRange {
                uri: self.uri.clone(),
                line: position.line,
                character: position.character,
            }
        })
    }
}

/// Every document the editor has open.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<Url, Document>,
}

impl DocumentStore {
    /// Opening an already open document replaces it.
    pub fn open(&mut self, document: Document) {
        self.documents.insert(document.uri.clone(), document);
    }

    pub fn change(
        &mut self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Result<&Document, DocumentError> {
        let document =
            self.documents.get_mut(uri).ok_or_else(|| DocumentError::NotOpen(uri.clone()))?;
        document.apply_changes(version, changes)?;
        Ok(document)
    }

    pub fn close(&mut self, uri: &Url) -> Option<Document> {
        self.documents.remove(uri)
    }

    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}
