//! Common utilities shared across LSP handlers
//!
//! Completion and signature help run while the user is typing, when the
//! expression under the cursor is usually not closed yet and so not in the
//! syntax tree. They work from the raw text of the line instead.

use crate::cli::lsp::utils::span_to_range;
use lg_core::analysis::TemplateSymbol;
use lg_core::types::{LineCol, Span};
use lg_core::DocumentAnalysis;
use lsp_types::{Location, Url};

/// What the text before the cursor says about where the cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorContext<'a> {
    /// Inside an unclosed `${`. Holds the expression text up to the cursor.
    Expression(&'a str),
    /// Inside an unclosed `[` on a body line. Holds the name typed so far.
    Reference(&'a str),
    Outside,
}

pub fn cursor_context(line_prefix: &str) -> CursorContext<'_> {
    let bytes = line_prefix.as_bytes();
    let mut expression_start = None;
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut bracket = None;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if expression_start.is_none() {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == b'$' && bytes.get(i + 1) == Some(&b'{') {
                expression_start = Some(i + 2);
                depth = 1;
                bracket = None;
                i += 2;
                continue;
            }
            match b {
                b'[' => bracket = Some(i + 1),
                b']' => bracket = None,
                _ => {}
            }
        } else if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        expression_start = None;
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    if let Some(start) = expression_start {
        return CursorContext::Expression(&line_prefix[start.min(line_prefix.len())..]);
    }
    if let Some(start) = bracket {
        let name = &line_prefix[start..];
        let trimmed = line_prefix.trim_start();
        let body_line = !(trimmed.starts_with('#') || trimmed.starts_with('[') || trimmed.starts_with('>'));
        if body_line && name.chars().all(is_name_char) {
            return CursorContext::Reference(name);
        }
    }
    CursorContext::Outside
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.')
}

/// The dotted identifier that ends `text`, possibly empty.
pub fn trailing_identifier(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    &text[start..]
}

/// The innermost call whose `(` is still open at the end of `expression`, with the
/// number of top-level commas typed inside it so far.
pub fn open_call(expression: &str) -> Option<(&str, u32)> {
    struct Frame<'a> {
        callee: Option<&'a str>,
        commas: u32,
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in expression.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => {
                let callee = trailing_identifier(expression[..idx].trim_end());
                let callee = (!callee.is_empty() && !callee.ends_with('.')).then_some(callee);
                stack.push(Frame { callee, commas: 0 });
            }
            '[' | '{' => stack.push(Frame { callee: None, commas: 0 }),
            ')' | ']' | '}' => {
                stack.pop();
            }
            ',' => {
                if let Some(top) = stack.last_mut() {
                    top.commas += 1;
                }
            }
            _ => {}
        }
    }

    stack.iter().rev().find_map(|frame| frame.callee.map(|callee| (callee, frame.commas)))
}

/// Text of the cursor's line up to the cursor.
pub fn line_prefix(analysis: &DocumentAnalysis, offset: usize) -> Option<&str> {
    let index = analysis.line_index();
    let line = index.position(offset).line;
    let start = index.offset(LineCol::new(line, 0))?;
    analysis.text().get(start..offset)
}

/// A span in any file of the analysis scope, as an editor location.
pub fn location(analysis: &DocumentAnalysis, uri: &Url, span: Span) -> Option<Location> {
    let file = analysis.scope.file(uri)?;
    Some(Location::new(uri.clone(), span_to_range(&file.line_index, span)))
}

/// The header line a template would be declared with.
pub fn template_header(symbol: &TemplateSymbol) -> String {
    if symbol.parameters.is_empty() {
        format!("# {}", symbol.name)
    } else {
        format!("# {}", symbol.signature())
    }
}

pub fn file_name(uri: &Url) -> &str {
    uri.path_segments().and_then(|mut segments| segments.next_back()).unwrap_or(uri.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("- Hi ${", CursorContext::Expression("") ; "just opened")]
    #[test_case("- Hi ${Gre", CursorContext::Expression("Gre") ; "partial name")]
    #[test_case("- ${a} and ${common.", CursorContext::Expression("common.") ; "second segment")]
    #[test_case("- ${a} done", CursorContext::Outside ; "closed segment")]
    #[test_case("- ${ {x: '}'} + ", CursorContext::Expression(" {x: '}'} + ") ; "nested braces and quotes")]
    #[test_case("- \\${Gre", CursorContext::Outside ; "escaped marker")]
    #[test_case("- see [Gre", CursorContext::Reference("Gre") ; "explicit reference")]
    #[test_case("- see [Greet] and", CursorContext::Outside ; "closed reference")]
    #[test_case("[common", CursorContext::Outside ; "import line")]
    #[test_case("# Greet", CursorContext::Outside ; "header line")]
    fn test_cursor_context(prefix: &str, expected: CursorContext) {
        assert_eq!(cursor_context(prefix), expected);
    }

    #[test_case("foo(", Some(("foo", 0)))]
    #[test_case("join(items, ", Some(("join", 1)))]
    #[test_case("join(concat(a, b), ", Some(("join", 1)) ; "closed inner call")]
    #[test_case("join(concat(a, ", Some(("concat", 1)) ; "open inner call")]
    #[test_case("join([a, b, c", Some(("join", 0)) ; "commas inside a list")]
    #[test_case("join('a, b', ", Some(("join", 1)) ; "commas inside a string")]
    #[test_case("common.Greet(x, y, ", Some(("common.Greet", 2)) ; "qualified")]
    #[test_case("(a + b", None ; "grouping only")]
    #[test_case("foo(a)", None ; "closed call")]
    fn test_open_call(expression: &str, expected: Option<(&str, u32)>) {
        assert_eq!(open_call(expression), expected);
    }

    #[test]
    fn test_trailing_identifier() {
        assert_eq!(trailing_identifier("a + user.na"), "user.na");
        assert_eq!(trailing_identifier("foo("), "");
        assert_eq!(trailing_identifier(""), "");
    }
}
