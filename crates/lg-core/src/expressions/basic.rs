use std::ops::Range;

use super::{CallSite, ExpressionEngine, ExpressionError, ExpressionHover, ParsedExpression};

/// A structural engine: finds `name(...)` calls, counts their arguments and checks that
/// strings and brackets are balanced. It knows nothing about operators or types.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicExpressionEngine;

impl ExpressionEngine for BasicExpressionEngine {
    fn parse(&self, expression: &str) -> ParsedExpression {
        let bytes = expression.as_bytes();
        let mut parsed = ParsedExpression::default();
        let mut open: Vec<(u8, usize)> = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'\'' | b'"' | b'`' => match string_end(bytes, i) {
                    Some(end) => i = end,
                    None => {
                        parsed.errors.push(ExpressionError {
                            message: "unterminated string literal".to_string(),
                            span: i..bytes.len(),
                        });
                        i = bytes.len();
                    }
                },
                b'(' | b'[' | b'{' => {
                    open.push((b, i));
                    i += 1;
                }
                b')' | b']' | b'}' => {
                    match open.pop() {
                        Some((opener, _)) if closer_for(opener) == b => {}
                        Some((opener, at)) => {
                            parsed.errors.push(ExpressionError {
                                message: format!(
                                    "'{}' does not match '{}'",
                                    b as char, opener as char
                                ),
                                span: at..i + 1,
                            });
                        }
                        None => parsed.errors.push(ExpressionError {
                            message: format!("unexpected '{}'", b as char),
                            span: i..i + 1,
                        }),
                    }
                    i += 1;
                }
                _ if is_ident_start(b) => {
                    let start = i;
                    while i < bytes.len() && is_ident_continue(bytes[i]) {
                        i += 1;
                    }
                    let member_access = previous_significant(bytes, start) == Some(b'.');
                    let mut next = i;
                    while next < bytes.len() && bytes[next].is_ascii_whitespace() {
                        next += 1;
                    }
                    if !member_access && bytes.get(next) == Some(&b'(') {
                        let name = expression[start..i].trim_end_matches('.').to_string();
                        parsed.calls.push(CallSite {
                            span: start..start + name.len(),
                            name,
                            argument_count: argument_count(bytes, next),
                        });
                    }
                }
                _ if b.is_ascii_digit() => {
                    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }

        for (opener, at) in open {
            parsed.errors.push(ExpressionError {
                message: format!("unclosed '{}'", opener as char),
                span: at..at + 1,
            });
        }
        parsed
    }

    fn hover(&self, expression: &str, offset: usize) -> Option<ExpressionHover> {
        let span = identifier_at(expression, offset)?;
        Some(ExpressionHover {
            contents: format!("`{}`", &expression[span.clone()]),
            span: Some(span),
        })
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'@' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn closer_for(opener: u8) -> u8 {
    match opener {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

fn previous_significant(bytes: &[u8], before: usize) -> Option<u8> {
    bytes[..before].iter().rev().find(|b| !b.is_ascii_whitespace()).copied()
}

/// Index just past the closing quote of the string starting at `start`.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

/// Counts top-level arguments of the call whose `(` sits at `open`. Returns `None` when
/// the list is unclosed or uses a spread argument.
fn argument_count(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut has_content = false;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\'' | b'"' | b'`' => {
                has_content = true;
                j = string_end(bytes, j)?;
                continue;
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                if depth > 1 {
                    has_content = true;
                }
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(if has_content { commas + 1 } else { 0 });
                }
            }
            b',' if depth == 1 => commas += 1,
            b'.' if depth == 1 && bytes[j..].starts_with(b"...") => return None,
            b if !b.is_ascii_whitespace() => has_content = true,
            _ => {}
        }
        j += 1;
    }
    None
}

/// Byte range of the identifier touching `offset`.
fn identifier_at(expression: &str, offset: usize) -> Option<Range<usize>> {
    let bytes = expression.as_bytes();
    let offset = offset.min(bytes.len());
    let mut start = offset;
    while start > 0 && is_ident_continue(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_ident_continue(bytes[end]) {
        end += 1;
    }
    while start < end && !is_ident_start(bytes[start]) {
        start += 1;
    }
    if start == end {
        None
    } else {
        Some(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_property_access_is_not_a_call() {
        let parsed = BasicExpressionEngine.parse("user.name");
        assert!(parsed.calls.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test_case("Greet()", "Greet", Some(0) ; "no arguments")]
    #[test_case("Greet(user.name)", "Greet", Some(1) ; "one argument")]
    #[test_case("join(list, ', ')", "join", Some(2) ; "comma inside string")]
    #[test_case("add(max(a, b), [1, 2], {x: 1, y: 2})", "add", Some(3) ; "nested groups")]
    #[test_case("common.Greet (x)", "common.Greet", Some(1) ; "qualified name")]
    #[test_case("concat(...parts)", "concat", None ; "spread")]
    fn test_call_arguments(expression: &str, name: &str, count: Option<usize>) {
        let parsed = BasicExpressionEngine.parse(expression);
        assert_eq!(parsed.calls[0].name, name);
        assert_eq!(parsed.calls[0].argument_count, count);
        assert_eq!(parsed.calls[0].span, 0..name.len());
    }

    #[test]
    fn test_method_style_call_is_ignored() {
        let parsed = BasicExpressionEngine.parse("items().first()");
        let names: Vec<_> = parsed.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["items"]);
    }

    #[test_case("foo(a" ; "unclosed paren")]
    #[test_case("foo(a])" ; "mismatched bracket")]
    #[test_case("'abc" ; "unterminated string")]
    #[test_case("a)" ; "stray closer")]
    fn test_syntax_errors(expression: &str) {
        assert!(!BasicExpressionEngine.parse(expression).errors.is_empty());
    }

    #[test]
    fn test_hover_returns_identifier() {
        let hover = BasicExpressionEngine.hover("user.name", 3).unwrap();
        assert_eq!(hover.contents, "`user.name`");
        assert_eq!(hover.span, Some(0..9));
        assert!(BasicExpressionEngine.hover("1 + 2", 2).is_none());
    }
}
