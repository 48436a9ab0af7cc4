//! `lg check`: analyze files from disk and print what the language server would report.

mod formatter;

pub use formatter::{get_formatter, Format, OutputFormatter};

use crate::cli::config::{ConfigError, ConfigFile, ServerConfig};
use lg_core::expressions::BasicExpressionEngine;
use lg_core::functions::BuiltinFunctions;
use lg_core::imports::{FileSystemSources, SourceProvider};
use lg_core::types::{DiagnosticCode, DiagnosticLevel, LineIndex};
use lg_core::{analyze_document, AnalysisContext, Cancelled, DocumentAnalysis, SourceError};
use lsp_types::Url;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("cannot resolve {path}: {source}")]
    Path { path: PathBuf, source: std::io::Error },

    #[error("{0} is not a valid file path")]
    NotAFile(PathBuf),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// A diagnostic positioned for people: 1-based lines and columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub message: String,
    pub related: Vec<RelatedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedEntry {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub diagnostics: Vec<ReportEntry>,
}

impl FileReport {
    pub fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }
}

pub fn has_errors(reports: &[FileReport]) -> bool {
    reports.iter().any(|report| report.count(DiagnosticLevel::Error) > 0)
}

/// Settings for a check run: defaults, then `--config` if given.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, CheckError> {
    let mut config = ServerConfig::default();
    if let Some(path) = path {
        config.apply(ConfigFile::from_file(path)?);
    }
    Ok(config)
}

pub fn check_files(paths: &[PathBuf], config: &ServerConfig) -> Result<Vec<FileReport>, CheckError> {
    paths.iter().map(|path| check_file(path, config)).collect()
}

pub fn check_file(path: &Path, config: &ServerConfig) -> Result<FileReport, CheckError> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|source| CheckError::Path { path: path.to_path_buf(), source })?;
    let uri = Url::from_file_path(&absolute).map_err(|_| CheckError::NotAFile(absolute.clone()))?;
    let text = FileSystemSources.read_source(&uri)?;

    let ctx = AnalysisContext {
        sources: &FileSystemSources,
        expressions: &BasicExpressionEngine,
        functions: &BuiltinFunctions,
    };
    let analysis = analyze_document(&uri, text, &ctx, &|| false)?;
    tracing::debug!(path = %path.display(), files = analysis.scope.files.len(), "checked");

    Ok(report(path.display().to_string(), &analysis, config))
}

pub fn report(path: String, analysis: &DocumentAnalysis, config: &ServerConfig) -> FileReport {
    let index = analysis.line_index();
    let diagnostics = config
        .adjust_all(&analysis.diagnostics)
        .into_iter()
        .map(|diagnostic| {
            let (line, column) = human_position(index, diagnostic.span.start);
            let (end_line, end_column) = human_position(index, diagnostic.span.end);
            let related = diagnostic
                .related_locations
                .iter()
                .map(|related| {
                    let (line, column) = analysis
                        .scope
                        .file(&related.uri)
                        .map(|file| human_position(&file.line_index, related.span.start))
                        .unwrap_or((1, 1));
                    RelatedEntry { path: display_path(&related.uri), line, column, message: related.message.clone() }
                })
                .collect();
            ReportEntry {
                line,
                column,
                end_line,
                end_column,
                level: diagnostic.level,
                code: diagnostic.code,
                message: diagnostic.message,
                related,
            }
        })
        .collect();
    FileReport { path, diagnostics }
}

fn human_position(index: &LineIndex, offset: usize) -> (u32, u32) {
    let position = index.position(offset);
    (position.line + 1, position.character + 1)
}

fn display_path(uri: &Url) -> String {
    uri.to_file_path().map(|path| path.display().to_string()).unwrap_or_else(|_| uri.to_string())
}
