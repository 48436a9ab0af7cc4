//! Go-to-definition handler

use super::common::location;
use super::{Handler, TextDocumentHandler};
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lg_core::DocumentAnalysis;
use lsp_types::*;

#[derive(Clone)]
pub struct DefinitionHandler {
    workspace: SharedWorkspaceState,
}

impl DefinitionHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    pub fn goto_definition(&self, params: GotoDefinitionParams) -> Option<GotoDefinitionResponse> {
        let (analysis, offset) = self.analysis_at(&params.text_document_position_params)?;
        let locations = definitions_at(&analysis, offset);
        if locations.is_empty() {
            return None;
        }
        Some(GotoDefinitionResponse::Array(locations))
    }
}

impl Handler for DefinitionHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}

impl TextDocumentHandler for DefinitionHandler {}

/// Every active definition of the template at `offset`. A duplicated name yields one
/// location per definition.
pub fn definitions_at(analysis: &DocumentAnalysis, offset: usize) -> Vec<Location> {
    let Some(symbol) = analysis.symbol_at(offset) else {
        return Vec::new();
    };
    analysis
        .symbols
        .active(&symbol.name)
        .into_iter()
        .filter_map(|definition| location(analysis, &definition.uri, definition.name_span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::lsp::tests::test_utils::{analysis_with, offset_of, url};

    #[test]
    fn test_definition_in_imported_file() {
        let analysis = analysis_with(&[
            ("main.lg", "[common](common.lg)\n# Main\n- ${Greet()}"),
            ("common.lg", "# Other\n- o\n# Greet\n- hi"),
        ]);
        let locations = definitions_at(&analysis, offset_of(analysis.text(), "${Gr"));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].uri, url("common.lg"));
        assert_eq!(locations[0].range.start, Position::new(2, 2));
        assert_eq!(locations[0].range.end, Position::new(2, 7));
    }

    #[test]
    fn test_duplicate_definitions_all_returned() {
        let analysis = analysis_with(&[
            ("main.lg", "[a](a.lg)\n[b](b.lg)\n# Main\n- [Foo]"),
            ("a.lg", "# Foo\n- a"),
            ("b.lg", "# Foo\n- b"),
        ]);
        let locations = definitions_at(&analysis, offset_of(analysis.text(), "[Fo"));
        let uris: Vec<_> = locations.iter().map(|l| l.uri.clone()).collect();
        assert_eq!(uris, vec![url("a.lg"), url("b.lg")]);
    }

    #[test]
    fn test_local_definition_shadows_import() {
        let analysis = analysis_with(&[
            ("main.lg", "[common](common.lg)\n# Greet\n- mine\n# Main\n- ${Greet()}"),
            ("common.lg", "# Greet\n- theirs"),
        ]);
        let locations = definitions_at(&analysis, offset_of(analysis.text(), "${Gr"));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].uri, url("main.lg"));
    }

    #[test]
    fn test_unknown_name_has_no_definition() {
        let analysis = analysis_with(&[("main.lg", "# Main\n- ${Missing()}")]);
        assert!(definitions_at(&analysis, offset_of(analysis.text(), "${Mi")).is_empty());
    }
}
