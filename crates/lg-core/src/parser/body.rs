use std::collections::HashMap;

use super::line::{Keyword, LineKind, RawLine, PROPERTY, STRUCTURE_OPEN};
use super::segments::scan_text;
use crate::types::{
    BranchKind, ConditionalBody, ConditionalBranch, Diagnostic, DiagnosticCode,
    ExpressionSegment, Span, StructuredBody, StructuredProperty, SwitchBody, SwitchCase,
    SwitchDefault, TemplateBody, TextLine,
};

/// Parses the lines between a header and the next boundary. Returns the body and the end
/// offset of its last meaningful line.
pub(super) fn parse_body(
    source: &str,
    lines: &[RawLine],
    diagnostics: &mut Vec<Diagnostic>,
) -> (TemplateBody, Option<usize>) {
    let first = lines.iter().position(|l| !matches!(l.kind(), LineKind::Blank | LineKind::Comment));
    match first {
        None => (TemplateBody::PlainText(Vec::new()), None),
        Some(idx) if lines[idx].trimmed().0.starts_with('[') => {
            parse_structured(&lines[idx..], diagnostics)
        }
        Some(_) => {
            let items = group_items(source, lines);
            let end = items.iter().map(|item| item.span().end).max();
            let mut builder = BulletBodyBuilder::default();
            for item in items {
                builder.push(item, diagnostics);
            }
            (builder.finish(diagnostics), end)
        }
    }
}

enum BodyItem<'a> {
    /// A bullet with any continuation lines folded in. `text` excludes the `-` marker.
    Bullet { text: &'a str, start: usize },
    /// A run of non-bullet lines that does not continue a bullet.
    Stray(Span),
}

impl BodyItem<'_> {
    fn span(&self) -> Span {
        match self {
            BodyItem::Bullet { text, start } => Span::new(*start, start + text.len()),
            BodyItem::Stray(span) => *span,
        }
    }
}

fn group_items<'a>(source: &'a str, lines: &[RawLine<'a>]) -> Vec<BodyItem<'a>> {
    let mut items = Vec::new();
    let mut current: Option<(usize, usize, bool)> = None;

    let flush = |current: &mut Option<(usize, usize, bool)>, items: &mut Vec<BodyItem<'a>>| {
        if let Some((start, end, is_bullet)) = current.take() {
            items.push(if is_bullet {
                BodyItem::Bullet { text: &source[start..end], start }
            } else {
                BodyItem::Stray(Span::new(start, end))
            });
        }
    };

    for line in lines {
        match line.kind() {
            LineKind::Blank | LineKind::Comment => flush(&mut current, &mut items),
            LineKind::Bullet => {
                flush(&mut current, &mut items);
                let (text, offset) = line.trimmed();
                let content = text[1..].trim_start();
                let start = offset + (text.len() - content.len());
                current = Some((start, start + content.len(), true));
            }
            _ => {
                let span = line.content_span();
                match current.as_mut() {
                    Some((_, end, _)) => *end = span.end,
                    None => current = Some((span.start, span.end, false)),
                }
            }
        }
    }
    flush(&mut current, &mut items);
    items
}

fn text_line(text: &str, start: usize, diagnostics: &mut Vec<Diagnostic>) -> TextLine {
    let scanned = scan_text(text, start);
    diagnostics.extend(scanned.diagnostics);
    TextLine {
        text: text.to_string(),
        span: Span::new(start, start + text.len()),
        segments: scanned.segments,
        references: scanned.references,
    }
}

#[derive(Default)]
enum Mode {
    #[default]
    Undecided,
    Plain(Vec<TextLine>),
    Conditional { body: ConditionalBody, has_else: bool },
    Switch(SwitchBody),
}

#[derive(Default)]
struct BulletBodyBuilder {
    mode: Mode,
}

impl BulletBodyBuilder {
    fn push(&mut self, item: BodyItem, diagnostics: &mut Vec<Diagnostic>) {
        let (text, start) = match item {
            BodyItem::Stray(span) => {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnexpectedBodyLine,
                    span,
                    "body lines must start with '-'",
                ));
                return;
            }
            BodyItem::Bullet { text, start } => (text, start),
        };
        let span = Span::new(start, start + text.len());

        let Some((keyword, consumed)) = Keyword::detect(text) else {
            self.push_text(text_line(text, start, diagnostics), span, diagnostics);
            return;
        };
        let rest = &text[consumed..];
        let rest_start = start + consumed;

        if let Some(message) = self.misplaced(keyword) {
            diagnostics.push(Diagnostic::error(DiagnosticCode::MisplacedKeyword, span, message));
            if !self.records_misplaced(keyword) {
                return;
            }
        }
        let expression = branch_expression(keyword, rest, rest_start, span, diagnostics);

        match keyword {
            Keyword::If | Keyword::ElseIf | Keyword::Else => {
                if matches!(self.mode, Mode::Undecided) {
                    self.mode = Mode::Conditional { body: ConditionalBody::default(), has_else: false };
                }
                if let Mode::Conditional { body, has_else } = &mut self.mode {
                    let kind = match keyword {
                        Keyword::If => BranchKind::If,
                        Keyword::ElseIf => BranchKind::ElseIf,
                        _ => BranchKind::Else,
                    };
                    *has_else |= kind == BranchKind::Else;
                    body.branches.push(ConditionalBranch {
                        kind,
                        condition: expression,
                        body: Vec::new(),
                        span,
                    });
                }
            }
            Keyword::Switch | Keyword::Case | Keyword::Default => {
                if matches!(self.mode, Mode::Undecided) {
                    self.mode = Mode::Switch(SwitchBody::default());
                }
                if let Mode::Switch(body) = &mut self.mode {
                    match keyword {
                        Keyword::Switch => body.subject = expression,
                        Keyword::Case => {
                            body.cases.push(SwitchCase { value: expression, body: Vec::new(), span })
                        }
                        _ => body.default = Some(SwitchDefault { body: Vec::new(), span }),
                    }
                }
            }
        }
    }

    /// Why a keyword cannot appear at this point, if it cannot.
    fn misplaced(&self, keyword: Keyword) -> Option<String> {
        let label = keyword.label();
        match (&self.mode, keyword) {
            (Mode::Undecided, Keyword::If | Keyword::Switch) => None,
            (Mode::Undecided, Keyword::ElseIf | Keyword::Else) => {
                Some(format!("{} without a preceding IF", label))
            }
            (Mode::Undecided, Keyword::Case | Keyword::Default) => {
                Some(format!("{} without a preceding SWITCH", label))
            }
            (Mode::Plain(_), _) => {
                Some(format!("{} cannot follow plain text lines in the same template", label))
            }
            (Mode::Conditional { .. }, Keyword::If) => {
                Some("a template holds a single IF block".to_string())
            }
            (Mode::Conditional { has_else: true, .. }, Keyword::ElseIf | Keyword::Else) => {
                Some(format!("{} after ELSE", label))
            }
            (Mode::Conditional { .. }, Keyword::ElseIf | Keyword::Else) => None,
            (Mode::Conditional { .. }, _) => {
                Some(format!("{} cannot appear inside a conditional block", label))
            }
            (Mode::Switch(_), Keyword::Switch) => {
                Some("a template holds a single SWITCH block".to_string())
            }
            (Mode::Switch(body), Keyword::Case) if body.default.is_some() => {
                Some("CASE after DEFAULT".to_string())
            }
            (Mode::Switch(body), Keyword::Default) if body.default.is_some() => {
                Some("duplicate DEFAULT".to_string())
            }
            (Mode::Switch(body), Keyword::Default) if body.cases.is_empty() => {
                Some("DEFAULT without a preceding CASE".to_string())
            }
            (Mode::Switch(_), Keyword::Case | Keyword::Default) => None,
            (Mode::Switch(_), _) => Some(format!("{} cannot appear inside a switch block", label)),
        }
    }

    /// Misplaced keywords that still open a branch, so their bodies get analyzed.
    fn records_misplaced(&self, keyword: Keyword) -> bool {
        match (&self.mode, keyword) {
            (Mode::Undecided, _) => true,
            (Mode::Switch(body), Keyword::Default) => body.default.is_none(),
            _ => false,
        }
    }

    fn push_text(&mut self, line: TextLine, span: Span, diagnostics: &mut Vec<Diagnostic>) {
        match &mut self.mode {
            Mode::Undecided => self.mode = Mode::Plain(vec![line]),
            Mode::Plain(lines) => lines.push(line),
            Mode::Conditional { body, .. } => {
                if let Some(branch) = body.branches.last_mut() {
                    branch.span = branch.span.cover(span);
                    branch.body.push(line);
                }
            }
            Mode::Switch(body) => {
                if let Some(default) = body.default.as_mut() {
                    default.span = default.span.cover(span);
                    default.body.push(line);
                } else if let Some(case) = body.cases.last_mut() {
                    case.span = case.span.cover(span);
                    case.body.push(line);
                } else {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticCode::MisplacedKeyword,
                        span,
                        "text inside a switch block must follow a CASE or DEFAULT",
                    ));
                }
            }
        }
    }

    fn finish(self, diagnostics: &mut Vec<Diagnostic>) -> TemplateBody {
        let empty_branch = |span: Span, label: &str| {
            Diagnostic::warning(
                DiagnosticCode::EmptyBranch,
                span,
                format!("{} branch has no body lines", label),
            )
        };
        match self.mode {
            Mode::Undecided => TemplateBody::PlainText(Vec::new()),
            Mode::Plain(lines) => TemplateBody::PlainText(lines),
            Mode::Conditional { body, .. } => {
                for branch in body.branches.iter().filter(|b| b.body.is_empty()) {
                    let label = match branch.kind {
                        BranchKind::If => "IF",
                        BranchKind::ElseIf => "ELSEIF",
                        BranchKind::Else => "ELSE",
                    };
                    diagnostics.push(empty_branch(branch.span, label));
                }
                TemplateBody::Conditional(body)
            }
            Mode::Switch(body) => {
                for case in body.cases.iter().filter(|c| c.body.is_empty()) {
                    diagnostics.push(empty_branch(case.span, "CASE"));
                }
                if let Some(default) = body.default.as_ref().filter(|d| d.body.is_empty()) {
                    diagnostics.push(empty_branch(default.span, "DEFAULT"));
                }
                TemplateBody::Switch(body)
            }
        }
    }
}

/// The expression a keyword bullet carries, reporting a missing or superfluous one.
fn branch_expression(
    keyword: Keyword,
    rest: &str,
    rest_start: usize,
    span: Span,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ExpressionSegment> {
    let scanned = scan_text(rest, rest_start);
    let scan_failed = !scanned.diagnostics.is_empty();
    diagnostics.extend(scanned.diagnostics);

    if !keyword.takes_expression() {
        if !rest.trim().is_empty() {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidCondition,
                span,
                format!("{} does not take an expression", keyword.label()),
            ));
        }
        return None;
    }

    let segment = scanned.segments.into_iter().next();
    if segment.is_none() && !scan_failed {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::InvalidCondition,
            span,
            format!("{} requires an expression written as ${{...}}", keyword.label()),
        ));
    }
    segment
}

fn parse_structured(
    lines: &[RawLine],
    diagnostics: &mut Vec<Diagnostic>,
) -> (TemplateBody, Option<usize>) {
    let open = lines[0];
    let (open_text, open_offset) = open.trimmed();
    let mut end = open.content_span().end;

    let (type_name, type_span, mut closed) = match STRUCTURE_OPEN.captures(open_text) {
        Some(captures) => {
            let name = captures.get(1);
            (
                name.map(|m| m.as_str().to_string()).unwrap_or_default(),
                name.map(|m| Span::new(open_offset + m.start(), open_offset + m.end()))
                    .unwrap_or_else(|| open.content_span()),
                captures.get(2).is_some(),
            )
        }
        None => {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidStructuredProperty,
                open.content_span(),
                "expected '[TypeName' to open a structured body",
            ));
            (String::new(), open.content_span(), false)
        }
    };

    let mut properties: Vec<StructuredProperty> = Vec::new();
    let mut keys: HashMap<String, Span> = HashMap::new();

    for line in &lines[1..] {
        if matches!(line.kind(), LineKind::Blank | LineKind::Comment) {
            continue;
        }
        let (text, offset) = line.trimmed();
        if closed {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::UnexpectedBodyLine,
                line.content_span(),
                "text after the end of a structured body",
            ));
            continue;
        }
        end = line.content_span().end;
        if text == "]" {
            closed = true;
            continue;
        }
        let Some(captures) = PROPERTY.captures(text) else {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidStructuredProperty,
                line.content_span(),
                "expected 'key = value' inside a structured body",
            ));
            continue;
        };
        let (Some(key), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let key_span = Span::new(offset + key.start(), offset + key.end());
        if keys.contains_key(key.as_str()) {
            diagnostics.push(Diagnostic::warning(
                DiagnosticCode::DuplicateStructuredProperty,
                key_span,
                format!("property '{}' is already set in this structure", key.as_str()),
            ));
        } else {
            keys.insert(key.as_str().to_string(), key_span);
        }
        properties.push(StructuredProperty {
            key: key.as_str().to_string(),
            key_span,
            value: text_line(value.as_str(), offset + value.start(), diagnostics),
        });
    }

    if !closed {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::UnterminatedStructure,
            open.content_span(),
            "structured body is missing its closing ']'",
        ));
    }

    (TemplateBody::Structured(StructuredBody { type_name, type_span, properties }), Some(end))
}
