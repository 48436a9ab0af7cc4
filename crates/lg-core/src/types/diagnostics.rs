use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use url::Url;

use super::span::Span;

/// Severity level for diagnostics
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Information,
    Warning,
    Error,
}

impl Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Information => write!(f, "info"),
        }
    }
}

/// Broad family a finding belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    Syntax,
    Reference,
    Structural,
    Protocol,
    Io,
}

/// Stable identifiers for every finding the parser and analyzer can produce.
///
/// The kebab-case form is what editors see in `Diagnostic.code` and what rule
/// configuration keys refer to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    InvalidTemplateHeader,
    UnexpectedBodyLine,
    UnterminatedExpression,
    UnterminatedStructure,
    InvalidStructuredProperty,
    DuplicateStructuredProperty,
    MisplacedKeyword,
    InvalidCondition,
    EmptyBranch,
    InvalidImport,
    ImportNotInHeader,
    ExpressionSyntax,
    UnknownReference,
    ArityMismatch,
    DuplicateTemplate,
    DuplicateParameter,
    EmptyTemplate,
    ImportCycle,
    UnreadableImport,
}

impl DiagnosticCode {
    pub fn kind(&self) -> ErrorKind {
        use DiagnosticCode::*;
        match self {
            InvalidTemplateHeader
            | UnexpectedBodyLine
            | UnterminatedExpression
            | UnterminatedStructure
            | InvalidStructuredProperty
            | DuplicateStructuredProperty
            | MisplacedKeyword
            | InvalidCondition
            | EmptyBranch
            | ImportNotInHeader
            | ExpressionSyntax => ErrorKind::Syntax,
            InvalidImport | UnknownReference | ArityMismatch => ErrorKind::Reference,
            DuplicateTemplate | DuplicateParameter | EmptyTemplate | ImportCycle => {
                ErrorKind::Structural
            }
            UnreadableImport => ErrorKind::Io,
        }
    }
}

/// A related location that provides additional context
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct RelatedLocation {
    pub uri: Url,
    pub span: Span,
    pub message: String,
}

impl RelatedLocation {
    pub fn new(uri: Url, span: Span, message: impl Into<String>) -> Self {
        Self { uri, span, message: message.into() }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Span,
    pub related_locations: Vec<RelatedLocation>,
}

impl Diagnostic {
    pub fn new(
        level: DiagnosticLevel,
        code: DiagnosticCode,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self { level, code, message: message.into(), span, related_locations: Vec::new() }
    }

    pub fn error(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, code, span, message)
    }

    pub fn warning(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, code, span, message)
    }

    pub fn information(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Information, code, span, message)
    }

    pub fn with_related(mut self, related: RelatedLocation) -> Self {
        self.related_locations.push(related);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

/// Concatenates findings from every stage, drops entries that repeat an earlier
/// `(span, code)` pair and orders the result by position.
pub fn merge_diagnostics<I>(sources: I) -> Vec<Diagnostic>
where
    I: IntoIterator<Item = Vec<Diagnostic>>,
{
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<Diagnostic> = sources
        .into_iter()
        .flatten()
        .filter(|diag| seen.insert((diag.span, diag.code)))
        .collect();
    merged.sort_by(|a, b| a.span.cmp(&b.span).then(a.code.cmp(&b.code)));
    merged
}
