//! Line-oriented parser for `.lg` files.
//!
//! The parser never fails. Malformed lines produce diagnostics and parsing resumes at the
//! next template header or import line, so one broken template leaves the rest of the file
//! intact.

mod body;
mod line;
mod segments;
#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::types::{
    Diagnostic, DiagnosticCode, ImportStatement, LgFile, Parameter, Span, TemplateDefinition,
};
use line::{comment_text, split_lines, LineKind, RawLine, HEADER, IMPORT, PARAMETER};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub file: LgFile,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse(text: &str) -> ParseResult {
    Parser::new(text).run()
}

struct Parser<'a> {
    source: &'a str,
    lines: Vec<RawLine<'a>>,
    pos: usize,
    file: LgFile,
    diagnostics: Vec<Diagnostic>,
    doc: Vec<String>,
}

struct Header {
    name: String,
    name_span: Span,
    parameters: Vec<Parameter>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lines: split_lines(source),
            pos: 0,
            file: LgFile::default(),
            diagnostics: Vec::new(),
            doc: Vec::new(),
        }
    }

    fn run(mut self) -> ParseResult {
        while let Some(line) = self.lines.get(self.pos).copied() {
            self.pos += 1;
            match line.kind() {
                LineKind::Blank => self.doc.clear(),
                LineKind::Comment => self.doc.extend(comment_text(&line)),
                LineKind::Import => {
                    self.doc.clear();
                    self.parse_import(&line);
                }
                LineKind::Header => self.parse_template(&line),
                LineKind::Bullet | LineKind::Other => {
                    self.doc.clear();
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::UnexpectedBodyLine,
                        line.content_span(),
                        "text outside of a template; expected a '# Name' header first",
                    ));
                    self.skip_to_boundary();
                }
            }
        }
        ParseResult { file: self.file, diagnostics: self.diagnostics }
    }

    fn skip_to_boundary(&mut self) {
        while let Some(line) = self.lines.get(self.pos) {
            if line.kind().is_boundary() {
                break;
            }
            self.pos += 1;
        }
    }

    fn parse_import(&mut self, line: &RawLine) {
        let (text, offset) = line.trimmed();
        let in_header = self.file.templates.is_empty();
        let Some(captures) = IMPORT.captures(text) else {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidImport,
                line.content_span(),
                "malformed import; expected '[label](path)' optionally followed by 'as alias'",
            ));
            return;
        };
        let Some(target) = captures.get(2) else {
            return;
        };
        let raw_target = target.as_str();
        let target_text = raw_target.trim();
        if target_text.is_empty() {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidImport,
                line.content_span(),
                "import has an empty target path",
            ));
            return;
        }
        let lead = raw_target.len() - raw_target.trim_start().len();
        let target_start = offset + target.start() + lead;
        let import = ImportStatement {
            target: target_text.to_string(),
            alias: captures.get(3).map(|m| m.as_str().to_string()),
            span: line.content_span(),
            target_span: Span::new(target_start, target_start + target_text.len()),
            in_header,
        };
        if !in_header {
            self.diagnostics.push(Diagnostic::warning(
                DiagnosticCode::ImportNotInHeader,
                import.span,
                "imports should precede the first template",
            ));
        }
        self.file.imports.push(import);
    }

    fn parse_template(&mut self, header_line: &RawLine) {
        let doc = std::mem::take(&mut self.doc);
        let header = match parse_header(header_line) {
            Ok(header) => header,
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                self.skip_to_boundary();
                return;
            }
        };

        let mut body_lines = Vec::new();
        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.kind().is_boundary() {
                break;
            }
            body_lines.push(line);
            self.pos += 1;
        }

        // Comments directly above the next header document that template, not this one.
        let mut trailing = Vec::new();
        while body_lines.last().map(|l| l.kind() == LineKind::Comment).unwrap_or(false) {
            if let Some(line) = body_lines.pop() {
                trailing.push(line);
            }
        }
        self.doc = trailing.iter().rev().filter_map(comment_text).collect();

        let (body, body_end) = body::parse_body(self.source, &body_lines, &mut self.diagnostics);
        let end = body_end.unwrap_or(header_line.end());
        let doc = if doc.is_empty() { None } else { Some(doc.join("\n")) };

        self.file.templates.push(TemplateDefinition {
            name: header.name,
            name_span: header.name_span,
            parameters: header.parameters,
            body,
            span: Span::new(header_line.content_span().start, end),
            doc,
        });
    }
}

fn parse_header(line: &RawLine) -> Result<Header, Diagnostic> {
    let (text, offset) = line.trimmed();
    let invalid = |message: &str| {
        Diagnostic::error(DiagnosticCode::InvalidTemplateHeader, line.content_span(), message)
    };

    let captures = HEADER.captures(text).ok_or_else(|| {
        invalid("malformed template header; expected '# Name' or '# Name(param1, param2)'")
    })?;
    let name = captures.get(1).ok_or_else(|| invalid("template header is missing a name"))?;

    let mut parameters = Vec::new();
    if let Some(group) = captures.get(2).filter(|g| !g.as_str().trim().is_empty()) {
        let mut cursor = group.start();
        for piece in group.as_str().split(',') {
            let param = piece.trim();
            if !PARAMETER.is_match(param) {
                let message = if param.is_empty() {
                    "empty parameter in template header".to_string()
                } else {
                    format!("invalid parameter name '{}'", param)
                };
                return Err(invalid(&message));
            }
            let start = offset + cursor + (piece.len() - piece.trim_start().len());
            parameters
                .push(Parameter { name: param.to_string(), span: Span::new(start, start + param.len()) });
            cursor += piece.len() + 1;
        }
    }

    Ok(Header {
        name: name.as_str().to_string(),
        name_span: Span::new(offset + name.start(), offset + name.end()),
        parameters,
    })
}
