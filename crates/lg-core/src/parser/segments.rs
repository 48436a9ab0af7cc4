//! Scanning of text for `${...}` expression segments and `[Name]` references.

use super::line::TEMPLATE_NAME;
use crate::types::{Diagnostic, DiagnosticCode, ExplicitReference, ExpressionSegment, Span};

#[derive(Debug, Default)]
pub(super) struct ScannedText {
    pub segments: Vec<ExpressionSegment>,
    pub references: Vec<ExplicitReference>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans `text`, which starts at absolute offset `base` in the document.
///
/// A backslash escapes the character after it. Expressions may not span lines: an
/// expression still open at a line break is reported from its `${` to the end of that
/// line, and scanning resumes on the next line.
pub(super) fn scan_text(text: &str, base: usize) -> ScannedText {
    let bytes = text.as_bytes();
    let mut scanned = ScannedText::default();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => match expression_end(bytes, i + 2) {
                Ok(close) => {
                    scanned.segments.push(ExpressionSegment {
                        expression: text[i + 2..close].to_string(),
                        span: Span::new(base + i, base + close + 1),
                        content_span: Span::new(base + i + 2, base + close),
                    });
                    i = close + 1;
                }
                Err(stop) => {
                    let end = if stop > i && bytes[stop - 1] == b'\r' { stop - 1 } else { stop };
                    scanned.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::UnterminatedExpression,
                        Span::new(base + i, base + end),
                        "expression is missing its closing '}'",
                    ));
                    i = stop;
                }
            },
            b'[' => {
                let rest = &text[i + 1..];
                match rest.find([']', '\n']) {
                    Some(close) if rest.as_bytes()[close] == b']' => {
                        let name = &rest[..close];
                        // `[text](target)` is a markdown link
                        let is_link = rest.as_bytes().get(close + 1) == Some(&b'(');
                        if !is_link && TEMPLATE_NAME.is_match(name) {
                            scanned.references.push(ExplicitReference {
                                name: name.to_string(),
                                span: Span::new(base + i + 1, base + i + 1 + close),
                            });
                        }
                        i += close + 2;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }

    scanned
}

/// Finds the `}` that closes an expression whose content starts at `from`. Nested
/// braces are balanced and quoted strings skipped. On failure returns the offset
/// where scanning stopped (line break or end of text).
fn expression_end(bytes: &[u8], from: usize) -> Result<usize, usize> {
    let mut depth = 1usize;
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return Err(j),
            quote @ (b'\'' | b'"' | b'`') => {
                j += 1;
                while j < bytes.len() && bytes[j] != quote {
                    if bytes[j] == b'\n' {
                        return Err(j);
                    }
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    Err(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segment() {
        let scanned = scan_text("Hello ${user.name}!", 10);
        assert_eq!(scanned.segments.len(), 1);
        let segment = &scanned.segments[0];
        assert_eq!(segment.expression, "user.name");
        assert_eq!(segment.span, Span::new(16, 28));
        assert_eq!(segment.content_span, Span::new(18, 27));
        assert!(scanned.diagnostics.is_empty());
    }

    #[test]
    fn test_nested_braces_and_strings() {
        let scanned = scan_text("${join(items, '}')} and ${ {a: 1}.a }", 0);
        let expressions: Vec<_> = scanned.segments.iter().map(|s| s.expression.as_str()).collect();
        assert_eq!(expressions, vec!["join(items, '}')", " {a: 1}.a "]);
    }

    #[test]
    fn test_escaped_marker_is_literal() {
        let scanned = scan_text(r"costs \${price} and \[NotARef]", 0);
        assert!(scanned.segments.is_empty());
        assert!(scanned.references.is_empty());
    }

    #[test]
    fn test_unterminated_expression_stops_at_line_end() {
        let scanned = scan_text("oops ${name(\nnext ${ok}", 0);
        assert_eq!(scanned.diagnostics.len(), 1);
        assert_eq!(scanned.diagnostics[0].code, DiagnosticCode::UnterminatedExpression);
        assert_eq!(scanned.diagnostics[0].span, Span::new(5, 12));
        assert_eq!(scanned.segments.len(), 1);
        assert_eq!(scanned.segments[0].expression, "ok");
    }

    #[test]
    fn test_explicit_reference() {
        let scanned = scan_text("See [Farewell] or [not a ref]", 100);
        assert_eq!(scanned.references.len(), 1);
        assert_eq!(scanned.references[0].name, "Farewell");
        assert_eq!(scanned.references[0].span, Span::new(105, 113));
    }

    #[test]
    fn test_markdown_link_is_not_a_reference() {
        let scanned = scan_text("Read [here](https://x) or [Help]", 0);
        assert_eq!(scanned.references.len(), 1);
        assert_eq!(scanned.references[0].name, "Help");
        assert!(scanned.diagnostics.is_empty());
    }
}
