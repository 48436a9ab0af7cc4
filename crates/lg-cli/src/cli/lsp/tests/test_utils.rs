//! Shared test utilities for LSP tests.
//!
//! Provides helpers for building URLs, diagnostics, open documents and analyses.

use crate::cli::lsp::workspace::{Document, SharedWorkspaceState};
use lg_core::DocumentAnalysis;
use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

/// Creates a `file://` URL for testing.
///
/// # Examples
///
/// ```ignore
/// let uri = url("main.lg");
/// assert_eq!(uri.as_str(), "file:///main.lg");
/// ```
pub fn url(path: &str) -> Url {
    Url::parse(&format!("file:///{}", path)).unwrap()
}

/// Creates an error diagnostic spanning columns 0-10 of `line`.
pub fn error_diagnostic(message: &str, line: u32) -> Diagnostic {
    Diagnostic {
        range: Range::new(Position::new(line, 0), Position::new(line, 10)),
        severity: Some(DiagnosticSeverity::ERROR),
        message: message.to_string(),
        ..Default::default()
    }
}

/// Opens `name` in the workspace as the editor would.
pub fn open(workspace: &SharedWorkspaceState, name: &str, version: i32, text: &str) -> Url {
    let uri = url(name);
    workspace.write().documents.open(Document::new(
        uri.clone(),
        version,
        text.to_string(),
        "lg".to_string(),
    ));
    uri
}

/// Analysis of a single open document.
pub fn analysis_of(name: &str, text: &str) -> DocumentAnalysis {
    analysis_with(&[(name, text)])
}

/// Opens every file and analyzes the first one. Imports between them resolve
/// against the open buffers, so nothing touches the disk.
pub fn analysis_with(files: &[(&str, &str)]) -> DocumentAnalysis {
    let workspace = SharedWorkspaceState::default();
    for (name, text) in files {
        open(&workspace, name, 1, text);
    }
    let analysis = workspace.current_analysis(&url(files[0].0)).unwrap();
    (*analysis).clone()
}

/// Byte offset just past the first occurrence of `marker`, where a cursor would sit
/// after typing it.
pub fn offset_of(text: &str, marker: &str) -> usize {
    let start = text.find(marker).unwrap_or_else(|| panic!("{:?} not found in {:?}", marker, text));
    start + marker.len()
}

/// Editor position just past the first occurrence of `marker`.
pub fn position_after(text: &str, marker: &str) -> Position {
    let offset = offset_of(text, marker);
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let character = before[line_start..].encode_utf16().count() as u32;
    Position::new(line, character)
}
