use std::collections::BTreeMap;

use url::Url;

use crate::imports::ResolvedScope;
use crate::types::{BodyKind, Span, TemplateDefinition};

/// Definitions in the analyzed document outrank definitions pulled in through imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Imported,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSymbol {
    /// Name as visible from the analyzed document, alias included.
    pub name: String,
    pub uri: Url,
    pub name_span: Span,
    pub span: Span,
    pub parameters: Vec<String>,
    pub doc: Option<String>,
    pub body_kind: BodyKind,
    pub precedence: Precedence,
    /// Root import that brought the definition into scope.
    pub via: Option<usize>,
}

impl TemplateSymbol {
    fn new(name: String, uri: &Url, template: &TemplateDefinition, via: Option<usize>) -> Self {
        Self {
            name,
            uri: uri.clone(),
            name_span: template.name_span,
            span: template.span,
            parameters: template.parameter_names(),
            doc: template.doc.clone(),
            body_kind: template.body.kind(),
            precedence: if via.is_none() { Precedence::Local } else { Precedence::Imported },
            via,
        }
    }

    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameters.join(", "))
    }
}

/// Template name to definitions, for one resolution scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Vec<TemplateSymbol>>,
}

impl SymbolTable {
    pub fn build(scope: &ResolvedScope) -> Self {
        let mut table = SymbolTable::default();
        for file in &scope.files {
            for template in &file.file.templates {
                let name = qualify(file.alias.as_deref(), &template.name);
                table.insert(TemplateSymbol::new(name, &file.uri, template, file.via));
            }
        }
        table
    }

    pub fn insert(&mut self, symbol: TemplateSymbol) {
        self.symbols.entry(symbol.name.clone()).or_default().push(symbol);
    }

    /// Every definition of a name, shadowed ones included.
    pub fn definitions(&self, name: &str) -> &[TemplateSymbol] {
        self.symbols.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Definitions at the highest precedence present for a name.
    pub fn active(&self, name: &str) -> Vec<&TemplateSymbol> {
        let definitions = self.definitions(name);
        let Some(top) = definitions.iter().map(|d| d.precedence).max() else {
            return Vec::new();
        };
        definitions.iter().filter(|d| d.precedence == top).collect()
    }

    pub fn resolve(&self, name: &str) -> Option<&TemplateSymbol> {
        self.active(name).into_iter().next()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// The first active definition of every name, in name order.
    pub fn visible(&self) -> impl Iterator<Item = &TemplateSymbol> {
        self.symbols.keys().filter_map(|name| self.resolve(name))
    }

    /// Names with more than one active definition.
    pub fn duplicates(&self) -> Vec<(&str, Vec<&TemplateSymbol>)> {
        self.symbols
            .keys()
            .map(|name| (name.as_str(), self.active(name)))
            .filter(|(_, active)| active.len() > 1)
            .collect()
    }

    /// The symbol whose definition name covers `offset` in `uri`.
    pub fn defined_at(&self, uri: &Url, offset: usize) -> Option<&TemplateSymbol> {
        self.symbols
            .values()
            .flatten()
            .find(|s| &s.uri == uri && s.name_span.contains(offset))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

pub fn qualify(alias: Option<&str>, name: &str) -> String {
    match alias {
        Some(alias) => format!("{}.{}", alias, name),
        None => name.to_string(),
    }
}
