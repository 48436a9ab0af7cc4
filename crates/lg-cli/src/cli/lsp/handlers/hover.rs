//! Hover information handler

use super::common::{file_name, template_header};
use super::{Handler, TextDocumentHandler};
use crate::cli::lsp::utils::span_to_range;
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lg_core::analysis::{TemplateSymbol, Target};
use lg_core::expressions::ExpressionEngine;
use lg_core::functions::{FunctionRegistry, FunctionSignature};
use lg_core::types::Span;
use lg_core::DocumentAnalysis;
use lsp_types::*;

#[derive(Clone)]
pub struct HoverHandler {
    workspace: SharedWorkspaceState,
}

impl HoverHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    pub fn hover(&self, params: HoverParams) -> Option<Hover> {
        let (analysis, offset) = self.analysis_at(&params.text_document_position_params)?;
        let services = self.workspace.services();
        hover_at(&analysis, offset, services.functions.as_ref(), services.expressions.as_ref())
    }
}

impl Handler for HoverHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}

impl TextDocumentHandler for HoverHandler {}

/// Templates and functions are described from the analysis; anything else inside an
/// expression is left to the expression engine, whose answer is passed through as is.
pub fn hover_at(
    analysis: &DocumentAnalysis,
    offset: usize,
    functions: &dyn FunctionRegistry,
    expressions: &dyn ExpressionEngine,
) -> Option<Hover> {
    let index = analysis.line_index();

    if let Some(symbol) = analysis.symbol_at(offset) {
        let span = analysis
            .symbols
            .defined_at(&analysis.uri, offset)
            .map(|definition| definition.name_span)
            .or_else(|| analysis.references.at(&analysis.uri, offset).map(|r| r.span));
        return Some(markdown(template_markdown(symbol), span.map(|s| span_to_range(index, s))));
    }

    if let Some(reference) = analysis.references.at(&analysis.uri, offset) {
        if reference.target == Target::Function {
            if let Some(function) = functions.get(&reference.name) {
                let range = span_to_range(index, reference.span);
                return Some(markdown(function_markdown(&function), Some(range)));
            }
        }
    }

    let segment = analysis.file().segment_at(offset)?;
    if !segment.content_span.contains(offset) {
        return None;
    }
    let base = segment.content_span.start;
    let hover = expressions.hover(&segment.expression, offset - base)?;
    let range = hover.span.map(|span| span_to_range(index, Span::from_relative(base, &span)));
    Some(markdown(hover.contents, range))
}

fn template_markdown(symbol: &TemplateSymbol) -> String {
    let mut value = format!("```lg\n{}\n```", template_header(symbol));
    if let Some(doc) = &symbol.doc {
        value.push_str("\n\n");
        value.push_str(doc);
    }
    value.push_str(&format!("\n\n*{}* template in `{}`", symbol.body_kind.label(), file_name(&symbol.uri)));
    value
}

fn function_markdown(function: &FunctionSignature) -> String {
    format!("```lg\n{}\n```\n\n{}\n\nTakes {}.", function.label(), function.documentation, function.arity)
}

fn markdown(value: String, range: Option<Range>) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent { kind: MarkupKind::Markdown, value }),
        range,
    }
}
