//! Find-references handler
//!
//! References come from the analysis of the requesting document, so they cover every
//! file of its scope: the document itself and everything it imports.

use super::common::location;
use super::{Handler, TextDocumentHandler};
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lg_core::analysis::Target;
use lg_core::DocumentAnalysis;
use lsp_types::*;

#[derive(Clone)]
pub struct ReferencesHandler {
    workspace: SharedWorkspaceState,
}

impl ReferencesHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    pub fn find_references(&self, params: ReferenceParams) -> Option<Vec<Location>> {
        let (analysis, offset) = self.analysis_at(&params.text_document_position)?;
        Some(references_at(&analysis, offset, params.context.include_declaration))
    }
}

impl Handler for ReferencesHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}

impl TextDocumentHandler for ReferencesHandler {}

pub fn references_at(
    analysis: &DocumentAnalysis,
    offset: usize,
    include_declaration: bool,
) -> Vec<Location> {
    if let Some(symbol) = analysis.symbol_at(offset) {
        let mut locations = Vec::new();
        if include_declaration {
            locations.extend(
                analysis
                    .symbols
                    .active(&symbol.name)
                    .into_iter()
                    .filter_map(|d| location(analysis, &d.uri, d.name_span)),
            );
        }
        locations.extend(
            analysis
                .references
                .references_to(&symbol.name)
                .iter()
                .filter(|r| r.target == Target::Template)
                .filter_map(|r| location(analysis, &r.uri, r.span)),
        );
        return locations;
    }

    // Call sites of a builtin function.
    match analysis.references.at(&analysis.uri, offset) {
        Some(reference) if reference.target == Target::Function => analysis
            .references
            .references_to(&reference.key)
            .iter()
            .filter(|r| r.target == Target::Function)
            .filter_map(|r| location(analysis, &r.uri, r.span))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::lsp::tests::test_utils::{analysis_with, offset_of, url};

    fn files() -> [(&'static str, &'static str); 2] {
        [
            ("main.lg", "[common](common.lg)\n# Main\n- ${Greet()} and [Greet]"),
            ("common.lg", "# Greet\n- hi\n# Twice\n- ${Greet()}${Greet()}"),
        ]
    }

    #[test]
    fn test_references_span_the_scope() {
        let analysis = analysis_with(&files());
        let locations = references_at(&analysis, offset_of(analysis.text(), "${Gr"), false);
        assert_eq!(locations.len(), 4);
        assert_eq!(locations.iter().filter(|l| l.uri == url("main.lg")).count(), 2);
        assert_eq!(locations.iter().filter(|l| l.uri == url("common.lg")).count(), 2);
    }

    #[test]
    fn test_include_declaration() {
        let analysis = analysis_with(&files());
        let locations = references_at(&analysis, offset_of(analysis.text(), "${Gr"), true);
        assert_eq!(locations.len(), 5);
        assert_eq!(locations[0].uri, url("common.lg"));
        assert_eq!(locations[0].range.start, Position::new(0, 2));
    }

    #[test]
    fn test_function_call_sites() {
        let analysis = analysis_with(&[("main.lg", "# A(x)\n- ${trim(x)}\n# B(y)\n- ${trim(y)} ${length(y)}")]);
        let locations = references_at(&analysis, offset_of(analysis.text(), "${tr"), false);
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn test_plain_text_has_no_references() {
        let analysis = analysis_with(&files());
        assert!(references_at(&analysis, offset_of(analysis.text(), "and"), true).is_empty());
    }
}
