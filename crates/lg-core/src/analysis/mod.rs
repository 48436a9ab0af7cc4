//! Semantic analysis of a document within its resolution scope.

mod references;
mod symbols;

use std::collections::HashSet;
use std::sync::Arc;

use url::Url;

pub use references::{Reference, ReferenceIndex, ReferenceKind, Target};
pub use symbols::{qualify, Precedence, SymbolTable, TemplateSymbol};

use crate::errors::Cancelled;
use crate::expressions::ExpressionEngine;
use crate::functions::FunctionRegistry;
use crate::imports::{ImportResolver, ResolvedFile, ResolvedScope, SourceProvider};
use crate::parser;
use crate::types::{
    merge_diagnostics, Diagnostic, DiagnosticCode, ExpressionSegment, LgFile, LineIndex,
    RelatedLocation, Span, TemplateDefinition,
};

/// Capabilities an analysis pass runs against.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub sources: &'a dyn SourceProvider,
    pub expressions: &'a dyn ExpressionEngine,
    pub functions: &'a dyn FunctionRegistry,
}

/// Everything known about one version of a document.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub uri: Url,
    pub scope: ResolvedScope,
    pub symbols: SymbolTable,
    pub references: ReferenceIndex,
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentAnalysis {
    pub fn root(&self) -> &ResolvedFile {
        self.scope.root()
    }

    pub fn file(&self) -> &LgFile {
        &self.scope.root().file
    }

    pub fn text(&self) -> &str {
        &self.scope.root().text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.scope.root().line_index
    }

    /// The symbol referenced or defined at `offset` in the analyzed document.
    pub fn symbol_at(&self, offset: usize) -> Option<&TemplateSymbol> {
        if let Some(symbol) = self.symbols.defined_at(&self.uri, offset) {
            return Some(symbol);
        }
        let reference = self.references.at(&self.uri, offset)?;
        match reference.target {
            Target::Template => self.symbols.resolve(&reference.key),
            _ => None,
        }
    }
}

/// Parses, resolves and analyzes a document. Only cancellation makes this fail; every
/// problem in the text becomes a diagnostic.
pub fn analyze_document(
    uri: &Url,
    text: Arc<str>,
    ctx: &AnalysisContext,
    cancel: &dyn Fn() -> bool,
) -> Result<DocumentAnalysis, Cancelled> {
    let parsed = parser::parse(&text);
    if cancel() {
        return Err(Cancelled);
    }

    let scope = ImportResolver::new(ctx.sources).resolve(uri, text, Arc::new(parsed.file), cancel)?;
    if cancel() {
        return Err(Cancelled);
    }

    let symbols = SymbolTable::build(&scope);
    let mut analyzer = Analyzer::new(ctx, &scope, &symbols);
    analyzer.check_duplicates();
    for index in 0..scope.files.len() {
        if cancel() {
            return Err(Cancelled);
        }
        analyzer.visit_file(&scope.files[index]);
    }
    let Analyzer { references, diagnostics, .. } = analyzer;

    let diagnostics = merge_diagnostics([parsed.diagnostics, scope.diagnostics.clone(), diagnostics]);
    Ok(DocumentAnalysis { uri: uri.clone(), scope, symbols, references, diagnostics })
}

struct Analyzer<'a> {
    ctx: &'a AnalysisContext<'a>,
    scope: &'a ResolvedScope,
    symbols: &'a SymbolTable,
    aliases: HashSet<String>,
    references: ReferenceIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Analyzer<'a> {
    fn new(ctx: &'a AnalysisContext<'a>, scope: &'a ResolvedScope, symbols: &'a SymbolTable) -> Self {
        let aliases = scope.files.iter().filter_map(|f| f.alias.clone()).collect();
        Self {
            ctx,
            scope,
            symbols,
            aliases,
            references: ReferenceIndex::default(),
            diagnostics: Vec::new(),
        }
    }

    /// One error per duplicated name, on the second definition or on the root import line
    /// that brought it in.
    fn check_duplicates(&mut self) {
        let root = self.scope.root();
        for (name, active) in self.symbols.duplicates() {
            let second = active[1];
            let span = match second.via {
                None => second.name_span,
                Some(via) => root.file.imports[via].span,
            };
            let mut diagnostic = Diagnostic::error(
                DiagnosticCode::DuplicateTemplate,
                span,
                format!("template '{}' is defined {} times in this scope", name, active.len()),
            );
            for symbol in &active {
                diagnostic = diagnostic.with_related(RelatedLocation::new(
                    symbol.uri.clone(),
                    symbol.name_span,
                    format!("'{}' defined here", name),
                ));
            }
            self.diagnostics.push(diagnostic);
        }
    }

    /// Indexes references in any file of the scope; reports problems only for the root.
    fn visit_file(&mut self, file: &ResolvedFile) {
        let is_root = file.is_root();
        for template in &file.file.templates {
            if is_root {
                self.check_template_shape(template);
            }
            for segment in template.segments() {
                self.visit_segment(file, segment, is_root);
            }
            for reference in template.explicit_references() {
                let (key, target) = self.resolve_name(file, &reference.name, false);
                if is_root && target == Target::Unresolved {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::UnknownReference,
                        reference.span,
                        format!("unknown template '{}'", reference.name),
                    ));
                }
                self.references.insert(Reference {
                    name: reference.name.clone(),
                    key,
                    uri: file.uri.clone(),
                    span: reference.span,
                    kind: ReferenceKind::Explicit,
                    argument_count: None,
                    target,
                });
            }
        }
    }

    fn check_template_shape(&mut self, template: &TemplateDefinition) {
        let mut seen = HashSet::new();
        for parameter in &template.parameters {
            if !seen.insert(parameter.name.as_str()) {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::DuplicateParameter,
                    parameter.span,
                    format!("parameter '{}' is declared more than once", parameter.name),
                ));
            }
        }
        if template.is_empty() {
            self.diagnostics.push(Diagnostic::warning(
                DiagnosticCode::EmptyTemplate,
                template.name_span,
                format!("template '{}' has no body", template.name),
            ));
        }
    }

    fn visit_segment(&mut self, file: &ResolvedFile, segment: &ExpressionSegment, is_root: bool) {
        let base = segment.content_span.start;
        let parsed = self.ctx.expressions.parse(&segment.expression);

        if is_root {
            for error in &parsed.errors {
                let span = Span::from_relative(base, &error.span);
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ExpressionSyntax,
                    if span.is_empty() { segment.span } else { span },
                    error.message.clone(),
                ));
            }
        }

        for call in parsed.calls {
            let span = Span::from_relative(base, &call.span);
            let (key, target) = self.resolve_name(file, &call.name, true);
            if is_root {
                self.check_call(&call.name, &key, target, call.argument_count, span);
            }
            if target == Target::Unresolved && !self.is_qualified_call(&call.name) {
                // receiver.method(...) on a value, not something this scope defines
                continue;
            }
            self.references.insert(Reference {
                name: call.name,
                key,
                uri: file.uri.clone(),
                span,
                kind: ReferenceKind::Call,
                argument_count: call.argument_count,
                target,
            });
        }
    }

    fn check_call(
        &mut self,
        name: &str,
        key: &str,
        target: Target,
        argument_count: Option<usize>,
        span: Span,
    ) {
        match target {
            Target::Template => {
                let (Some(count), Some(symbol)) = (argument_count, self.symbols.resolve(key)) else {
                    return;
                };
                if count != symbol.parameters.len() {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::ArityMismatch,
                        span,
                        format!(
                            "template '{}' expects {} argument{} but got {}",
                            name,
                            symbol.parameters.len(),
                            if symbol.parameters.len() == 1 { "" } else { "s" },
                            count
                        ),
                    ));
                }
            }
            Target::Function => {
                let (Some(count), Some(function)) = (argument_count, self.ctx.functions.get(name))
                else {
                    return;
                };
                if !function.arity.accepts(count) {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::ArityMismatch,
                        span,
                        format!("function '{}' expects {} but got {}", name, function.arity, count),
                    ));
                }
            }
            Target::Unresolved if self.is_qualified_call(name) || !name.contains('.') => {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnknownReference,
                    span,
                    format!("unknown template or function '{}'", name),
                ));
            }
            Target::Unresolved => {}
        }
    }

    /// `alias.Name` where `alias` names an import of the root document.
    fn is_qualified_call(&self, name: &str) -> bool {
        name.split_once('.').map(|(alias, _)| self.aliases.contains(alias)).unwrap_or(false)
    }

    /// Resolves a name written in `file` to a symbol table key. Templates defined in the
    /// same file win, then the scope's table, then functions when `allow_functions`.
    fn resolve_name(&self, file: &ResolvedFile, name: &str, allow_functions: bool) -> (String, Target) {
        if !file.is_root() && file.file.template(name).is_some() {
            return (qualify(file.alias.as_deref(), name), Target::Template);
        }
        if self.symbols.contains(name) {
            return (name.to_string(), Target::Template);
        }
        if allow_functions && self.ctx.functions.get(name).is_some() {
            return (name.to_string(), Target::Function);
        }
        (name.to_string(), Target::Unresolved)
    }
}
