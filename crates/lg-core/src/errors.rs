use thiserror::Error;
use url::Url;

/// Failure to fetch the text of an imported file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The target does not exist
    #[error("'{0}' was not found")]
    NotFound(Url),

    /// The target exists but could not be read
    #[error("failed to read '{uri}': {message}")]
    Unreadable { uri: Url, message: String },

    /// The uri does not point at a local file
    #[error("'{0}' is not a file uri")]
    NotAFile(Url),
}

/// Returned by an analysis pass that observed its cancellation signal.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("analysis was cancelled")]
pub struct Cancelled;
