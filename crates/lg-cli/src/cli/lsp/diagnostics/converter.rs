//! Conversion of analyzer findings to LSP diagnostics.

use crate::cli::config::ServerConfig;
use crate::cli::lsp::utils::span_to_range;
use lg_core::types::{Diagnostic as CoreDiagnostic, DiagnosticLevel, RelatedLocation};
use lg_core::DocumentAnalysis;
use lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString, Range,
};
use serde_json::json;

pub const DIAGNOSTIC_SOURCE: &str = "lg";

/// Converts every finding of an analysis, after rule overrides.
pub fn convert_diagnostics(analysis: &DocumentAnalysis, config: &ServerConfig) -> Vec<Diagnostic> {
    config
        .adjust_all(&analysis.diagnostics)
        .iter()
        .map(|diag| to_lsp_diagnostic(diag, analysis))
        .collect()
}

pub fn to_lsp_diagnostic(diag: &CoreDiagnostic, analysis: &DocumentAnalysis) -> Diagnostic {
    let related: Vec<DiagnosticRelatedInformation> =
        diag.related_locations.iter().map(|r| related_information(r, analysis)).collect();

    let data = json!({
        "kind": diag.kind().as_ref(),
        "related": related
            .iter()
            .map(|r| json!({
                "uri": r.location.uri.as_str(),
                "range": r.location.range,
                "message": r.message,
            }))
            .collect::<Vec<_>>(),
    });

    Diagnostic {
        range: span_to_range(analysis.line_index(), diag.span),
        severity: Some(severity(diag.level)),
        code: Some(NumberOrString::String(diag.code.to_string())),
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diag.message.clone(),
        related_information: if related.is_empty() { None } else { Some(related) },
        tags: None,
        data: Some(data),
    }
}

pub fn severity(level: DiagnosticLevel) -> DiagnosticSeverity {
    match level {
        DiagnosticLevel::Error => DiagnosticSeverity::ERROR,
        DiagnosticLevel::Warning => DiagnosticSeverity::WARNING,
        DiagnosticLevel::Information => DiagnosticSeverity::INFORMATION,
    }
}

/// Related locations may point into any file of the scope; each is positioned with that
/// file's own line index.
fn related_information(
    related: &RelatedLocation,
    analysis: &DocumentAnalysis,
) -> DiagnosticRelatedInformation {
    let range = analysis
        .scope
        .file(&related.uri)
        .map(|file| span_to_range(&file.line_index, related.span))
        .unwrap_or_else(Range::default);
    DiagnosticRelatedInformation {
        location: Location::new(related.uri.clone(), range),
        message: related.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::RuleLevel;
    use crate::cli::lsp::tests::test_utils::analysis_with;
    use lg_core::types::DiagnosticCode;
    use lsp_types::Position;

    #[test]
    fn test_duplicate_carries_related_information() {
        let analysis = analysis_with(&[
            ("main.lg", "[a](a.lg)\n[b](b.lg)\n# Main\n- ${Foo()}"),
            ("a.lg", "# Foo\n- a"),
            ("b.lg", "\n\n# Foo\n- b"),
        ]);
        let diagnostics = convert_diagnostics(&analysis, &ServerConfig::default());

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.code, Some(NumberOrString::String("duplicate-template".into())));
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic.range.start, Position::new(1, 0));

        let related = diagnostic.related_information.as_ref().unwrap();
        assert_eq!(related.len(), 2);
        // positioned in b.lg, not in main.lg
        assert_eq!(related[1].location.range.start, Position::new(2, 2));

        let data = diagnostic.data.as_ref().unwrap();
        assert_eq!(data["kind"], "structural");
        assert_eq!(data["related"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_rule_overrides_drop_and_relevel() {
        let analysis = analysis_with(&[("main.lg", "# Empty\n\n# A\n- ${Missing()}")]);
        let mut config = ServerConfig::default();
        config.rules.insert(DiagnosticCode::EmptyTemplate, RuleLevel::Off);
        config.rules.insert(DiagnosticCode::UnknownReference, RuleLevel::Information);

        let diagnostics = convert_diagnostics(&analysis, &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::INFORMATION));
        assert_eq!(diagnostics[0].source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    }
}
