use std::collections::BTreeMap;

use url::Url;

use crate::types::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `name(...)` inside an expression segment
    Call,
    /// `[Name]` in text
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Template,
    Function,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The name as written at the call site.
    pub name: String,
    /// Symbol table key the name resolved to. Equals `name` when unresolved.
    pub key: String,
    pub uri: Url,
    pub span: Span,
    pub kind: ReferenceKind,
    pub argument_count: Option<usize>,
    pub target: Target,
}

/// Every call site and explicit reference in a resolution scope, keyed by resolved name.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    by_key: BTreeMap<String, Vec<Reference>>,
}

impl ReferenceIndex {
    pub fn insert(&mut self, reference: Reference) {
        self.by_key.entry(reference.key.clone()).or_default().push(reference);
    }

    pub fn references_to(&self, key: &str) -> &[Reference] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// The reference whose span covers `offset` in `uri`.
    pub fn at(&self, uri: &Url, offset: usize) -> Option<&Reference> {
        self.iter().find(|r| &r.uri == uri && r.span.contains(offset))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.by_key.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
