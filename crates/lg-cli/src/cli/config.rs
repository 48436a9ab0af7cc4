//! Settings shared by the language server and `lg check`.
//!
//! Settings come from an optional `lgtools.yml` at the project root and, for the
//! language server, from the client's `initializationOptions`. Later sources win
//! field by field.

use lg_core::types::{Diagnostic, DiagnosticCode, DiagnosticLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;

pub const CONFIG_FILE_NAMES: [&str; 2] = ["lgtools.yml", "lgtools.yaml"];

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for this shape
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// `initializationOptions` did not match this shape
    #[error("invalid initialization options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

/// What a rule override does to diagnostics with that code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Deserialize, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Off,
    Error,
    #[serde(alias = "warn")]
    #[strum(to_string = "warning", serialize = "warn")]
    Warning,
    #[serde(alias = "info")]
    #[strum(to_string = "information", serialize = "info")]
    Information,
}

impl RuleLevel {
    /// `None` for `off`.
    pub fn level(&self) -> Option<DiagnosticLevel> {
        match self {
            RuleLevel::Off => None,
            RuleLevel::Error => Some(DiagnosticLevel::Error),
            RuleLevel::Warning => Some(DiagnosticLevel::Warning),
            RuleLevel::Information => Some(DiagnosticLevel::Information),
        }
    }
}

/// One settings source. Every field is optional so sources can be layered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    /// Diagnostic code (kebab-case) to override
    #[serde(default)]
    pub rules: HashMap<String, RuleLevel>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&content)
            .map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_options(options: serde_json::Value) -> Result<Self, ConfigError> {
        if options.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(options)?)
    }

    /// The first config file found in `dir`, if any.
    pub fn find_in(dir: &Path) -> Result<Option<Self>, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.is_file() {
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }
}

/// Effective settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub debounce_ms: u64,
    pub rules: HashMap<DiagnosticCode, RuleLevel>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { debounce_ms: DEFAULT_DEBOUNCE_MS, rules: HashMap::new() }
    }
}

impl ServerConfig {
    /// Layers `file` over the current settings. Unknown rule codes are logged and
    /// ignored.
    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(debounce_ms) = file.debounce_ms {
            self.debounce_ms = debounce_ms;
        }
        for (code, level) in file.rules {
            match DiagnosticCode::from_str(&code) {
                Ok(code) => {
                    self.rules.insert(code, level);
                }
                Err(_) => tracing::warn!(rule = %code, "ignoring override for unknown rule"),
            }
        }
    }

    pub fn with(mut self, file: ConfigFile) -> Self {
        self.apply(file);
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Applies the rule override for the diagnostic's code. `None` when the rule is off.
    pub fn adjust(&self, mut diagnostic: Diagnostic) -> Option<Diagnostic> {
        match self.rules.get(&diagnostic.code) {
            None => Some(diagnostic),
            Some(rule) => {
                diagnostic.level = rule.level()?;
                Some(diagnostic)
            }
        }
    }

    pub fn adjust_all(&self, diagnostics: &[Diagnostic]) -> Vec<Diagnostic> {
        diagnostics.iter().cloned().filter_map(|d| self.adjust(d)).collect()
    }
}
