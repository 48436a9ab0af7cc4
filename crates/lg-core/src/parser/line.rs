use regex::Regex;

use crate::types::Span;

lazy_static! {
    static ref IMPORT_LIKE: Regex = Regex::new(r"^\[[^\]]*\]\([^)]*\)").unwrap();
    pub(super) static ref IMPORT: Regex = Regex::new(
        r"^\[([^\]]*)\]\(([^)]*)\)(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?\s*$"
    )
    .unwrap();
    pub(super) static ref HEADER: Regex =
        Regex::new(r"^#\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*(?:\(([^()]*)\))?\s*$").unwrap();
    pub(super) static ref PARAMETER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    pub(super) static ref KEYWORD: Regex =
        Regex::new(r"(?i)^(ELSEIF|ELSE|IF|SWITCH|CASE|DEFAULT)\s*:").unwrap();
    pub(super) static ref STRUCTURE_OPEN: Regex =
        Regex::new(r"^\[\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*(\])?\s*$").unwrap();
    pub(super) static ref PROPERTY: Regex =
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_.\-]*)\s*=\s*(.*?)\s*$").unwrap();
    pub(super) static ref TEMPLATE_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap();
}

/// One physical line of the source, without its terminator.
#[derive(Debug, Clone, Copy)]
pub(super) struct RawLine<'a> {
    pub text: &'a str,
    pub start: usize,
}

impl<'a> RawLine<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// The line with surrounding whitespace removed, and the absolute offset it starts at.
    pub fn trimmed(&self) -> (&'a str, usize) {
        let leading = self.text.len() - self.text.trim_start().len();
        (self.text.trim(), self.start + leading)
    }

    /// Span of the visible content, ignoring indentation and trailing whitespace.
    pub fn content_span(&self) -> Span {
        let (text, start) = self.trimmed();
        Span::new(start, start + text.len())
    }

    pub fn kind(&self) -> LineKind {
        let (text, _) = self.trimmed();
        if text.is_empty() {
            LineKind::Blank
        } else if text.starts_with('>') {
            LineKind::Comment
        } else if text.starts_with('#') {
            LineKind::Header
        } else if IMPORT_LIKE.is_match(text) {
            LineKind::Import
        } else if text.starts_with('-') {
            LineKind::Bullet
        } else {
            LineKind::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineKind {
    Blank,
    Comment,
    Import,
    Header,
    Bullet,
    Other,
}

impl LineKind {
    /// Lines the parser resynchronizes on after a local error.
    pub fn is_boundary(&self) -> bool {
        matches!(self, LineKind::Header | LineKind::Import)
    }
}

pub(super) fn split_lines(text: &str) -> Vec<RawLine<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for line in text.split('\n') {
        let visible = line.strip_suffix('\r').unwrap_or(line);
        lines.push(RawLine { text: visible, start });
        start += line.len() + 1;
    }
    lines
}

/// Text of a comment line as it should appear in a doc comment, or `None` for
/// `> !#` option lines.
pub(super) fn comment_text(line: &RawLine) -> Option<String> {
    let (text, _) = line.trimmed();
    let body = text.strip_prefix('>').unwrap_or(text);
    if body.trim_start().starts_with("!#") {
        return None;
    }
    Some(body.strip_prefix(' ').unwrap_or(body).trim_end().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Keyword {
    If,
    ElseIf,
    Else,
    Switch,
    Case,
    Default,
}

impl Keyword {
    /// Recognizes a leading `KEYWORD:` in bullet content and returns the byte length
    /// consumed, colon included.
    pub fn detect(content: &str) -> Option<(Keyword, usize)> {
        let captures = KEYWORD.captures(content)?;
        let keyword = match captures.get(1)?.as_str().to_ascii_uppercase().as_str() {
            "IF" => Keyword::If,
            "ELSEIF" => Keyword::ElseIf,
            "ELSE" => Keyword::Else,
            "SWITCH" => Keyword::Switch,
            "CASE" => Keyword::Case,
            _ => Keyword::Default,
        };
        Some((keyword, captures.get(0)?.end()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Keyword::If => "IF",
            Keyword::ElseIf => "ELSEIF",
            Keyword::Else => "ELSE",
            Keyword::Switch => "SWITCH",
            Keyword::Case => "CASE",
            Keyword::Default => "DEFAULT",
        }
    }

    pub fn takes_expression(&self) -> bool {
        matches!(self, Keyword::If | Keyword::ElseIf | Keyword::Switch | Keyword::Case)
    }
}
