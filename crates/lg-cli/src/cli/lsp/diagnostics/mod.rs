//! Diagnostic conversion and publication

mod converter;
mod publisher;

pub use converter::{convert_diagnostics, severity, to_lsp_diagnostic, DIAGNOSTIC_SOURCE};
pub use publisher::DiagnosticsPublisher;
