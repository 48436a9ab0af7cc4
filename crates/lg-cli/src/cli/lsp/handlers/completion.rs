//! Code completion handler
//!
//! Inside `${` the candidates are visible templates followed by functions; after
//! `alias.` only that import's templates; inside `[` only templates. Candidates are
//! ranked local, imported, then functions, and alphabetically (ignoring case) within
//! each group.

use super::common::{cursor_context, line_prefix, trailing_identifier, CursorContext};
use super::{Handler, TextDocumentHandler};
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lg_core::analysis::{Precedence, TemplateSymbol};
use lg_core::functions::{FunctionRegistry, FunctionSignature};
use lg_core::DocumentAnalysis;
use lsp_types::*;

#[derive(Clone)]
pub struct CompletionHandler {
    workspace: SharedWorkspaceState,
}

impl CompletionHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    pub fn completion(&self, params: CompletionParams) -> Option<CompletionResponse> {
        let (analysis, offset) = self.analysis_at(&params.text_document_position)?;
        let items = completion_items(&analysis, offset, self.workspace.services().functions.as_ref());
        Some(CompletionResponse::Array(items))
    }
}

impl Handler for CompletionHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}

impl TextDocumentHandler for CompletionHandler {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Local,
    Imported,
    Function,
}

impl Rank {
    fn of(symbol: &TemplateSymbol) -> Self {
        match symbol.precedence {
            Precedence::Local => Rank::Local,
            Precedence::Imported => Rank::Imported,
        }
    }
}

struct Candidate {
    rank: Rank,
    item: CompletionItem,
}

pub fn completion_items(
    analysis: &DocumentAnalysis,
    offset: usize,
    functions: &dyn FunctionRegistry,
) -> Vec<CompletionItem> {
    let Some(prefix) = line_prefix(analysis, offset) else {
        return Vec::new();
    };

    let candidates = match cursor_context(prefix) {
        CursorContext::Expression(expression) => {
            let word = trailing_identifier(expression);
            match word.rsplit_once('.') {
                Some((qualifier, member)) => alias_members(analysis, qualifier, member),
                None => {
                    let mut candidates = templates(analysis, word);
                    candidates.extend(function_candidates(functions, word));
                    candidates
                }
            }
        }
        CursorContext::Reference(name) => templates(analysis, name),
        CursorContext::Outside => Vec::new(),
    };

    ranked(candidates)
}

fn templates(analysis: &DocumentAnalysis, typed: &str) -> Vec<Candidate> {
    analysis
        .symbols
        .visible()
        .filter(|symbol| matches_prefix(&symbol.name, typed))
        .map(|symbol| Candidate { rank: Rank::of(symbol), item: template_item(symbol, &symbol.name) })
        .collect()
}

/// Templates of the import named `qualifier`, labelled by their bare name. A dotted
/// prefix that is not an alias is a property access and gets nothing.
fn alias_members(analysis: &DocumentAnalysis, qualifier: &str, member: &str) -> Vec<Candidate> {
    let is_alias = analysis.scope.files.iter().any(|file| file.alias.as_deref() == Some(qualifier));
    if !is_alias {
        return Vec::new();
    }
    let qualified = format!("{}.", qualifier);
    analysis
        .symbols
        .visible()
        .filter_map(|symbol| {
            let bare = symbol.name.strip_prefix(&qualified)?;
            matches_prefix(bare, member)
                .then(|| Candidate { rank: Rank::of(symbol), item: template_item(symbol, bare) })
        })
        .collect()
}

fn function_candidates(functions: &dyn FunctionRegistry, typed: &str) -> Vec<Candidate> {
    functions
        .list()
        .iter()
        .filter(|function| matches_prefix(&function.name, typed))
        .map(|function| Candidate { rank: Rank::Function, item: function_item(function) })
        .collect()
}

fn template_item(symbol: &TemplateSymbol, label: &str) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(CompletionItemKind::METHOD),
        detail: Some(symbol.signature()),
        documentation: symbol.doc.as_ref().map(|doc| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: doc.clone(),
            })
        }),
        ..Default::default()
    }
}

fn function_item(function: &FunctionSignature) -> CompletionItem {
    CompletionItem {
        label: function.name.clone(),
        kind: Some(CompletionItemKind::FUNCTION),
        detail: Some(function.label()),
        documentation: Some(Documentation::String(function.documentation.clone())),
        ..Default::default()
    }
}

fn matches_prefix(name: &str, typed: &str) -> bool {
    name.to_lowercase().starts_with(&typed.to_lowercase())
}

fn ranked(mut candidates: Vec<Candidate>) -> Vec<CompletionItem> {
    candidates.sort_by_cached_key(|c| (c.rank, c.item.label.to_lowercase(), c.item.label.clone()));
    candidates
        .into_iter()
        .enumerate()
        .map(|(position, candidate)| CompletionItem {
            sort_text: Some(format!("{:04}", position)),
            ..candidate.item
        })
        .collect()
}
