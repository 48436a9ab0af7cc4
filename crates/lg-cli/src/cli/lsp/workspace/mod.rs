//! Workspace state management for the language server.
//!
//! # Components
//!
//! - [`DocumentStore`]: open documents with ordered, versioned edits
//! - [`DependencyGraph`]: which documents pull in which files
//! - [`WorkspaceIndex`]: latest committed analysis snapshot per document
//! - [`FileCache`]: text of imported files that are not open
//! - [`SharedWorkspaceState`]: the thread-safe handle tying these together
//! - [`Session`]: protocol lifecycle state machine

mod dependency_graph;
mod documents;
mod file_cache;
mod index;
mod sources;
mod state;
pub mod state_machine;

pub use dependency_graph::DependencyGraph;
pub use documents::{Document, DocumentError, DocumentStore};
pub use file_cache::FileCache;
pub use index::{AnalysisSnapshot, WorkspaceIndex};
pub use sources::WorkspaceSources;
pub use state::{Services, SharedWorkspaceState, WorkspaceState};
pub use state_machine::{Session, SessionEvent, SessionState};
