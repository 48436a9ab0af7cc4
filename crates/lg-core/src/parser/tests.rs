use super::*;
use crate::types::{BranchKind, DiagnosticCode, DiagnosticLevel, TemplateBody};
use test_case::test_case;

fn codes(result: &ParseResult) -> Vec<DiagnosticCode> {
    result.diagnostics.iter().map(|d| d.code).collect()
}

fn plain_lines(result: &ParseResult, index: usize) -> Vec<String> {
    match &result.file.templates[index].body {
        TemplateBody::PlainText(lines) => lines.iter().map(|l| l.text.clone()).collect(),
        other => panic!("expected plain text body, got {:?}", other.kind()),
    }
}

#[test]
fn test_greeting_template() {
    let result = parse("# Greeting\n- Hello ${user.name}!");

    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.file.templates.len(), 1);
    let template = &result.file.templates[0];
    assert_eq!(template.name, "Greeting");
    assert_eq!(template.name_span, Span::new(2, 10));
    let TemplateBody::PlainText(lines) = &template.body else {
        panic!("expected plain text body");
    };
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "Hello ${user.name}!");
    assert_eq!(lines[0].segments.len(), 1);
    assert_eq!(lines[0].segments[0].expression, "user.name");
}

#[test]
fn test_parse_is_idempotent() {
    let text = "[common](common.lg)\n\n> doc\n# A(x)\n- ${x} and [B]\n- IF: oops\n\n# B\n[Card\n  k = ${v\n";
    assert_eq!(parse(text), parse(text));
}

#[test]
fn test_parameters_and_spans() {
    let result = parse("# Greet(name, title)\n- Hi ${name}");
    let template = &result.file.templates[0];
    assert_eq!(template.parameter_names(), vec!["name", "title"]);
    assert_eq!(template.parameters[0].span, Span::new(8, 12));
    assert_eq!(template.parameters[1].span, Span::new(14, 19));
    assert_eq!(template.signature(), "Greet(name, title)");
}

#[test_case("# Bad Name!\n- x\n# Good\n- y" ; "space in name")]
#[test_case("# (a)\n- x\n# Good\n- y" ; "missing name")]
#[test_case("# T(a,)\n- x\n# Good\n- y" ; "empty parameter")]
#[test_case("# T(1a)\n- x\n# Good\n- y" ; "invalid parameter")]
fn test_invalid_header_resyncs_at_next_header(text: &str) {
    let result = parse(text);
    assert_eq!(codes(&result), vec![DiagnosticCode::InvalidTemplateHeader]);
    assert_eq!(result.file.templates.len(), 1);
    assert_eq!(result.file.templates[0].name, "Good");
}

#[test]
fn test_unterminated_expression_is_local() {
    let result = parse("# A\n- Hi ${name\n\n# B\n- fine ${x}");
    assert_eq!(codes(&result), vec![DiagnosticCode::UnterminatedExpression]);
    assert_eq!(result.diagnostics[0].span, Span::new(9, 15));
    let b = &result.file.templates[1];
    assert_eq!(b.segments().len(), 1);
    assert_eq!(b.segments()[0].expression, "x");
}

#[test]
fn test_doc_comments_attach_to_following_header() {
    let result =
        parse("> Says hello\n> to people\n# Hello\n- hi\n\n> Farewell doc\n# Bye\n- bye\n> stray\n\n# Last\n- x");
    let docs: Vec<_> = result.file.templates.iter().map(|t| t.doc.clone()).collect();
    assert_eq!(
        docs,
        vec![Some("Says hello\nto people".to_string()), Some("Farewell doc".to_string()), None]
    );
    assert_eq!(plain_lines(&result, 1), vec!["bye"]);
}

#[test]
fn test_multiline_text_and_stray_lines() {
    let result = parse("# M\n- first\n  second\n- third\n\n  stray");
    assert_eq!(plain_lines(&result, 0), vec!["first\n  second", "third"]);
    assert_eq!(codes(&result), vec![DiagnosticCode::UnexpectedBodyLine]);
}

#[test]
fn test_non_bullet_first_body_line() {
    let result = parse("# T\nhello\n- ok");
    assert_eq!(codes(&result), vec![DiagnosticCode::UnexpectedBodyLine]);
    assert_eq!(plain_lines(&result, 0), vec!["ok"]);
}

#[test]
fn test_text_before_first_template() {
    let result = parse("- orphan\nmore\n# T\n- ok");
    assert_eq!(codes(&result), vec![DiagnosticCode::UnexpectedBodyLine]);
    assert_eq!(result.file.templates.len(), 1);
}

#[test]
fn test_empty_template() {
    let result = parse("# Empty\n\n# Other\n- x");
    assert!(result.diagnostics.is_empty());
    assert!(result.file.templates[0].is_empty());
    assert!(!result.file.templates[1].is_empty());
}

#[test]
fn test_conditional_body() {
    let text = "# Weather(temp)\n- IF: ${temp > 30}\n  - It's hot\n- ELSEIF: ${temp > 15}\n- Mild\n- else:\n- Cold";
    let result = parse(text);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let TemplateBody::Conditional(body) = &result.file.templates[0].body else {
        panic!("expected conditional body");
    };
    let kinds: Vec<_> = body.branches.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BranchKind::If, BranchKind::ElseIf, BranchKind::Else]);
    assert_eq!(body.branches[0].condition.as_ref().map(|c| c.expression.as_str()), Some("temp > 30"));
    assert!(body.branches[2].condition.is_none());
    assert!(body.branches.iter().all(|b| b.body.len() == 1));
    assert_eq!(body.branches[0].body[0].text, "It's hot");
}

#[test]
fn test_conditional_keyword_pairing() {
    let result = parse("# T\n- ELSE:\n- a\n- ELSE:\n- b");
    assert_eq!(codes(&result), vec![DiagnosticCode::MisplacedKeyword; 2]);
    let TemplateBody::Conditional(body) = &result.file.templates[0].body else {
        panic!("expected conditional body");
    };
    assert_eq!(body.branches.len(), 1);
    assert_eq!(body.branches[0].body.len(), 2);
}

#[test]
fn test_keyword_after_plain_text() {
    let result = parse("# T\n- hi\n- IF: ${x}\n- yo");
    assert_eq!(codes(&result), vec![DiagnosticCode::MisplacedKeyword]);
    assert_eq!(plain_lines(&result, 0), vec!["hi", "yo"]);
}

#[test]
fn test_missing_condition_and_empty_branch() {
    let result = parse("# T\n- IF:\n- a\n\n# U\n- IF: ${a}\n- ELSE:\n- b");
    assert_eq!(codes(&result), vec![DiagnosticCode::InvalidCondition, DiagnosticCode::EmptyBranch]);
    assert_eq!(result.diagnostics[1].level, DiagnosticLevel::Warning);
}

#[test]
fn test_switch_body() {
    let text = "# Mood(m)\n- SWITCH: ${m}\n- CASE: ${'happy'}\n- Yay\n- CASE: ${'sad'}\n- Oh no\n- DEFAULT:\n- Hmm";
    let result = parse(text);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let TemplateBody::Switch(body) = &result.file.templates[0].body else {
        panic!("expected switch body");
    };
    assert_eq!(body.subject.as_ref().map(|s| s.expression.as_str()), Some("m"));
    assert_eq!(body.cases.len(), 2);
    assert_eq!(body.cases[1].value.as_ref().map(|s| s.expression.as_str()), Some("'sad'"));
    assert_eq!(body.default.as_ref().map(|d| d.body.len()), Some(1));
}

#[test]
fn test_switch_keyword_pairing() {
    let result = parse("# S\n- SWITCH: ${m}\n- stray\n- DEFAULT:\n- x\n- CASE: ${1}\n- y");
    assert_eq!(codes(&result), vec![DiagnosticCode::MisplacedKeyword; 3]);
    let TemplateBody::Switch(body) = &result.file.templates[0].body else {
        panic!("expected switch body");
    };
    assert!(body.cases.is_empty());
    assert_eq!(body.default.as_ref().map(|d| d.body.len()), Some(2));
}

#[test]
fn test_structured_body() {
    let text = "# Card\n[Activity\n    title = Hello ${name}\n    text = Body\n    title = Again\n]";
    let result = parse(text);
    assert_eq!(codes(&result), vec![DiagnosticCode::DuplicateStructuredProperty]);
    let TemplateBody::Structured(body) = &result.file.templates[0].body else {
        panic!("expected structured body");
    };
    assert_eq!(body.type_name, "Activity");
    assert_eq!(body.properties.len(), 3);
    assert_eq!(body.property("title").map(|p| p.value.segments[0].expression.as_str()), Some("name"));
}

#[test_case("# Card\n[Activity\n  a = b\n\n# Next\n- x", DiagnosticCode::UnterminatedStructure ; "missing close")]
#[test_case("# Card\n[Activity\n  just text\n]\n# Next\n- x", DiagnosticCode::InvalidStructuredProperty ; "missing equals")]
#[test_case("# Card\n[Activity]\n  a = b\n# Next\n- x", DiagnosticCode::UnexpectedBodyLine ; "text after close")]
fn test_structured_errors(text: &str, expected: DiagnosticCode) {
    let result = parse(text);
    assert_eq!(codes(&result), vec![expected]);
    assert_eq!(result.file.templates.len(), 2);
}

#[test]
fn test_imports() {
    let text = "[common](./common.lg)\n[Shared](../shared/util.lg) as util\n\n# A\n- x\n[late](late.lg)\n# B\n- y";
    let result = parse(text);
    let imports = &result.file.imports;
    assert_eq!(imports.len(), 3);
    assert_eq!(imports[0].target, "./common.lg");
    assert_eq!(imports[0].target_span, Span::new(9, 20));
    assert_eq!(imports[1].alias.as_deref(), Some("util"));
    assert!(imports[0].in_header && imports[1].in_header);
    assert!(!imports[2].in_header);
    assert_eq!(codes(&result), vec![DiagnosticCode::ImportNotInHeader]);
    assert_eq!(result.file.templates.len(), 2);
}

#[test_case("[x](a.lg) as 9bad" ; "bad alias")]
#[test_case("[x](  )" ; "empty target")]
fn test_invalid_import(text: &str) {
    let result = parse(text);
    assert!(result.file.imports.is_empty());
    assert_eq!(codes(&result), vec![DiagnosticCode::InvalidImport]);
}

#[test]
fn test_explicit_references_in_bullets() {
    let result = parse("# A\n- go to [B] then [C.d]\n# B\n- b");
    let refs: Vec<_> =
        result.file.templates[0].explicit_references().iter().map(|r| r.name.clone()).collect();
    assert_eq!(refs, vec!["B", "C.d"]);
}
