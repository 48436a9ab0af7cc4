//! Syntax tree for `.lg` files.
//!
//! The tree is deliberately shallow: the core never interprets expression content, it only
//! records where each `${...}` fragment sits so the analyzer can hand it to an
//! [`ExpressionEngine`](crate::expressions::ExpressionEngine).

pub mod diagnostics;
pub mod span;

use serde::Serialize;

pub use diagnostics::{
    merge_diagnostics, Diagnostic, DiagnosticCode, DiagnosticLevel, ErrorKind, RelatedLocation,
};
pub use span::{LineCol, LineIndex, Span};

/// A parsed `.lg` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LgFile {
    pub imports: Vec<ImportStatement>,
    pub templates: Vec<TemplateDefinition>,
}

impl LgFile {
    pub fn template(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Template whose header name contains the offset.
    pub fn template_named_at(&self, offset: usize) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.name_span.contains(offset))
    }

    /// Expression segment enclosing the offset, anywhere in the file.
    pub fn segment_at(&self, offset: usize) -> Option<&ExpressionSegment> {
        self.templates
            .iter()
            .filter(|t| t.span.contains(offset))
            .flat_map(|t| t.segments())
            .find(|s| s.span.contains(offset))
    }
}

/// `[label](path/to/file.lg) as alias`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    pub target: String,
    pub alias: Option<String>,
    pub span: Span,
    pub target_span: Span,
    /// Import lines after the first template header still resolve, but are flagged.
    pub in_header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDefinition {
    pub name: String,
    pub name_span: Span,
    pub parameters: Vec<Parameter>,
    pub body: TemplateBody,
    /// From the header line through the last body line.
    pub span: Span,
    pub doc: Option<String>,
}

impl TemplateDefinition {
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    /// `Name(a, b)` as written in the header.
    pub fn signature(&self) -> String {
        if self.parameters.is_empty() {
            self.name.clone()
        } else {
            format!("{}({})", self.name, self.parameter_names().join(", "))
        }
    }

    /// Every expression segment in the body, in source order.
    pub fn segments(&self) -> Vec<&ExpressionSegment> {
        let mut segments = Vec::new();
        match &self.body {
            TemplateBody::PlainText(lines) => {
                segments.extend(lines.iter().flat_map(|l| l.segments.iter()));
            }
            TemplateBody::Structured(body) => {
                segments.extend(body.properties.iter().flat_map(|p| p.value.segments.iter()));
            }
            TemplateBody::Conditional(body) => {
                for branch in &body.branches {
                    segments.extend(branch.condition.iter());
                    segments.extend(branch.body.iter().flat_map(|l| l.segments.iter()));
                }
            }
            TemplateBody::Switch(body) => {
                segments.extend(body.subject.iter());
                for case in &body.cases {
                    segments.extend(case.value.iter());
                    segments.extend(case.body.iter().flat_map(|l| l.segments.iter()));
                }
                if let Some(default) = &body.default {
                    segments.extend(default.body.iter().flat_map(|l| l.segments.iter()));
                }
            }
        }
        segments.sort_by_key(|s| s.span.start);
        segments
    }

    /// Every `[Name]` reference in text lines.
    pub fn explicit_references(&self) -> Vec<&ExplicitReference> {
        self.text_lines().into_iter().flat_map(|l| l.references.iter()).collect()
    }

    fn text_lines(&self) -> Vec<&TextLine> {
        match &self.body {
            TemplateBody::PlainText(lines) => lines.iter().collect(),
            TemplateBody::Structured(body) => body.properties.iter().map(|p| &p.value).collect(),
            TemplateBody::Conditional(body) => {
                body.branches.iter().flat_map(|b| b.body.iter()).collect()
            }
            TemplateBody::Switch(body) => body
                .cases
                .iter()
                .flat_map(|c| c.body.iter())
                .chain(body.default.iter().flat_map(|d| d.body.iter()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.body {
            TemplateBody::PlainText(lines) => lines.is_empty(),
            TemplateBody::Structured(_) => false,
            TemplateBody::Conditional(body) => body.branches.is_empty(),
            TemplateBody::Switch(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TemplateBody {
    PlainText(Vec<TextLine>),
    Structured(StructuredBody),
    Conditional(ConditionalBody),
    Switch(SwitchBody),
}

impl TemplateBody {
    pub fn kind(&self) -> BodyKind {
        match self {
            TemplateBody::PlainText(_) => BodyKind::PlainText,
            TemplateBody::Structured(_) => BodyKind::Structured,
            TemplateBody::Conditional(_) => BodyKind::Conditional,
            TemplateBody::Switch(_) => BodyKind::Switch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BodyKind {
    PlainText,
    Structured,
    Conditional,
    Switch,
}

impl BodyKind {
    pub fn label(&self) -> &'static str {
        match self {
            BodyKind::PlainText => "text",
            BodyKind::Structured => "structured",
            BodyKind::Conditional => "conditional",
            BodyKind::Switch => "switch",
        }
    }
}

/// One bulleted variation, with any continuation lines folded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub text: String,
    pub span: Span,
    pub segments: Vec<ExpressionSegment>,
    pub references: Vec<ExplicitReference>,
}

/// `${ expression }` embedded in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionSegment {
    pub expression: String,
    /// Covers `${` through `}`.
    pub span: Span,
    /// Covers the expression text only.
    pub content_span: Span,
}

/// `[TemplateName]` inside text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplicitReference {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredBody {
    pub type_name: String,
    pub type_span: Span,
    pub properties: Vec<StructuredProperty>,
}

impl StructuredBody {
    pub fn property(&self, key: &str) -> Option<&StructuredProperty> {
        self.properties.iter().find(|p| p.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredProperty {
    pub key: String,
    pub key_span: Span,
    pub value: TextLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BranchKind {
    If,
    ElseIf,
    Else,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionalBranch {
    pub kind: BranchKind,
    pub condition: Option<ExpressionSegment>,
    pub body: Vec<TextLine>,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConditionalBody {
    pub branches: Vec<ConditionalBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchCase {
    pub value: Option<ExpressionSegment>,
    pub body: Vec<TextLine>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchDefault {
    pub body: Vec<TextLine>,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchBody {
    pub subject: Option<ExpressionSegment>,
    pub cases: Vec<SwitchCase>,
    pub default: Option<SwitchDefault>,
}
