//! Workspace state shared by the message loop, the handlers and analysis jobs.

use super::{DependencyGraph, DocumentStore, FileCache, WorkspaceIndex, WorkspaceSources};
use crate::cli::config::ServerConfig;
use lg_core::expressions::{BasicExpressionEngine, ExpressionEngine};
use lg_core::functions::{BuiltinFunctions, FunctionRegistry};
use lg_core::{analyze_document, AnalysisContext, Cancelled, DocumentAnalysis};
use lsp_types::Url;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Capabilities injected at server construction.
#[derive(Clone)]
pub struct Services {
    pub expressions: Arc<dyn ExpressionEngine>,
    pub functions: Arc<dyn FunctionRegistry>,
}

impl Default for Services {
    fn default() -> Self {
        Self { expressions: Arc::new(BasicExpressionEngine), functions: Arc::new(BuiltinFunctions) }
    }
}

/// Mutable workspace data, guarded by one lock.
#[derive(Debug, Default)]
pub struct WorkspaceState {
    pub documents: DocumentStore,
    pub dependencies: DependencyGraph,
    pub config: ServerConfig,
}

impl WorkspaceState {
    pub fn new(config: ServerConfig) -> Self {
        Self { config, ..Default::default() }
    }

    /// Open documents whose scope contains `uri`, directly or transitively.
    pub fn open_dependents(&self, uri: &Url) -> Vec<Url> {
        let mut dependents: Vec<Url> = self
            .dependencies
            .get_affected_documents(uri)
            .into_iter()
            .filter(|dependent| self.documents.contains(dependent))
            .collect();
        dependents.sort();
        dependents
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.dependencies.clear();
    }
}

/// Cheap handle to everything the server shares across threads.
#[derive(Clone)]
pub struct SharedWorkspaceState {
    inner: Arc<RwLock<WorkspaceState>>,
    index: WorkspaceIndex,
    files: FileCache,
    services: Services,
}

impl SharedWorkspaceState {
    pub fn new(services: Services, config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(WorkspaceState::new(config))),
            index: WorkspaceIndex::new(),
            files: FileCache::new(),
            services,
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, WorkspaceState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, WorkspaceState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    pub fn files(&self) -> &FileCache {
        &self.files
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn config(&self) -> ServerConfig {
        self.read().config.clone()
    }

    pub fn sources(&self) -> WorkspaceSources<'_> {
        WorkspaceSources::new(self)
    }

    /// Runs a full analysis pass against open documents and the file cache.
    pub fn analyze(
        &self,
        uri: &Url,
        text: Arc<str>,
        cancel: &dyn Fn() -> bool,
    ) -> Result<DocumentAnalysis, Cancelled> {
        let sources = self.sources();
        let ctx = AnalysisContext {
            sources: &sources,
            expressions: self.services.expressions.as_ref(),
            functions: self.services.functions.as_ref(),
        };
        analyze_document(uri, text, &ctx, cancel)
    }

    /// Analysis of the open document's current version: the committed snapshot when it
    /// is current, otherwise a fresh pass that is not committed.
    pub fn current_analysis(&self, uri: &Url) -> Option<Arc<DocumentAnalysis>> {
        let (version, text) = {
            let workspace = self.read();
            let document = workspace.documents.get(uri)?;
            (document.version(), Arc::<str>::from(document.content()))
        };
        if let Some(snapshot) = self.index.get(uri) {
            if snapshot.is_current(version) {
                return Some(snapshot.analysis.clone());
            }
        }
        tracing::debug!(%uri, version, "no current snapshot, analyzing on demand");
        self.analyze(uri, text, &|| false).ok().map(Arc::new)
    }

    /// Drops every document, snapshot and cached file.
    pub fn clear(&self) {
        self.write().clear();
        self.index.clear();
        self.files.clear();
    }
}

impl Default for SharedWorkspaceState {
    fn default() -> Self {
        Self::new(Services::default(), ServerConfig::default())
    }
}
