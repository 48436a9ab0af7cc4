//! Rendering of check reports.

use super::FileReport;
use colored::Colorize;
use lg_core::types::DiagnosticLevel;
use std::fmt::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    Stylish,
    Compact,
    Json,
}

pub trait OutputFormatter {
    fn format(&self, reports: &[FileReport]) -> String;
}

pub fn get_formatter(format: Format) -> Box<dyn OutputFormatter> {
    match format {
        Format::Stylish => Box::new(StylishFormatter),
        Format::Compact => Box::new(CompactFormatter),
        Format::Json => Box::new(JsonFormatter),
    }
}

struct StylishFormatter;

impl OutputFormatter for StylishFormatter {
    fn format(&self, reports: &[FileReport]) -> String {
        let mut out = String::new();
        let errors: usize = reports.iter().map(|r| r.count(DiagnosticLevel::Error)).sum();
        let warnings: usize = reports.iter().map(|r| r.count(DiagnosticLevel::Warning)).sum();
        let infos: usize = reports.iter().map(|r| r.count(DiagnosticLevel::Information)).sum();

        for report in reports.iter().filter(|r| !r.diagnostics.is_empty()) {
            let _ = writeln!(out, "{}", report.path.underline());
            for entry in &report.diagnostics {
                let _ = writeln!(
                    out,
                    "  {} {} {} {}",
                    format!("{}:{}", entry.line, entry.column).dimmed(),
                    paint(entry.level),
                    entry.message,
                    entry.code.to_string().dimmed()
                );
                for related in &entry.related {
                    let _ = writeln!(
                        out,
                        "    {} {} {}",
                        "→".dimmed(),
                        related.message.dimmed(),
                        format!("at {}:{}:{}", related.path, related.line, related.column).dimmed()
                    );
                }
            }
            out.push('\n');
        }

        let total = errors + warnings + infos;
        if total == 0 {
            let _ = writeln!(out, "{}", "✓ No problems found".green());
        } else {
            let summary = format!(
                "✖ {} problem(s) ({} error(s), {} warning(s), {} info)",
                total, errors, warnings, infos
            );
            let summary = if errors > 0 { summary.red().bold() } else { summary.yellow().bold() };
            let _ = writeln!(out, "{}", summary);
        }
        out
    }
}

fn paint(level: DiagnosticLevel) -> colored::ColoredString {
    let label = level.to_string();
    match level {
        DiagnosticLevel::Error => label.red().bold(),
        DiagnosticLevel::Warning => label.yellow().bold(),
        DiagnosticLevel::Information => label.blue(),
    }
}

struct CompactFormatter;

impl OutputFormatter for CompactFormatter {
    fn format(&self, reports: &[FileReport]) -> String {
        let mut out = String::new();
        for report in reports {
            for entry in &report.diagnostics {
                let _ = writeln!(
                    out,
                    "{}:{}:{}: {}: {} [{}]",
                    report.path, entry.line, entry.column, entry.level, entry.message, entry.code
                );
            }
        }
        out
    }
}

struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, reports: &[FileReport]) -> String {
        let mut json = serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string());
        json.push('\n');
        json
    }
}
