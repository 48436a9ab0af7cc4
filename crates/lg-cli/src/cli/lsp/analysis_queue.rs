//! Background analysis keyed by document.
//!
//! Every schedule gets a sequence number from a single counter and a fresh
//! cancellation token, and cancels the token of the job it replaces. A job waits
//! out the debounce window, analyzes on the blocking pool, and commits only if it
//! was not cancelled and the document still has the version it was scheduled for.

use crate::cli::lsp::diagnostics::{convert_diagnostics, DiagnosticsPublisher};
use crate::cli::lsp::workspace::{AnalysisSnapshot, SharedWorkspaceState};
use dashmap::DashMap;
use lg_core::DocumentAnalysis;
use lsp_types::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct PendingJob {
    sequence: u64,
    token: CancellationToken,
}

#[derive(Clone)]
pub struct AnalysisQueue {
    runtime: Handle,
    workspace: SharedWorkspaceState,
    publisher: DiagnosticsPublisher,
    pending: Arc<DashMap<Url, PendingJob>>,
    sequence: Arc<AtomicU64>,
}

impl AnalysisQueue {
    pub fn new(runtime: Handle, workspace: SharedWorkspaceState, publisher: DiagnosticsPublisher) -> Self {
        Self {
            runtime,
            workspace,
            publisher,
            pending: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues analysis of the open document's current version, replacing any job
    /// already queued for it. Returns the job's sequence, or `None` if the document is
    /// not open.
    pub fn schedule(&self, uri: &Url, delay: Duration) -> Option<u64> {
        let version = self.workspace.read().documents.get(uri)?.version();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        let previous =
            self.pending.insert(uri.clone(), PendingJob { sequence, token: token.clone() });
        if let Some(previous) = previous {
            tracing::trace!(%uri, superseded = previous.sequence, "cancelling queued analysis");
            previous.token.cancel();
        }

        let job = Job {
            uri: uri.clone(),
            version,
            sequence,
            token,
            workspace: self.workspace.clone(),
            publisher: self.publisher.clone(),
            pending: self.pending.clone(),
        };
        self.runtime.spawn(job.run(delay));
        Some(sequence)
    }

    /// Schedules `uri` and every open document that imports it.
    pub fn schedule_with_dependents(&self, uri: &Url, delay: Duration) {
        self.schedule(uri, delay);
        let dependents = self.workspace.read().open_dependents(uri);
        for dependent in dependents {
            self.schedule(&dependent, delay);
        }
    }

    pub fn cancel(&self, uri: &Url) {
        if let Some((_, job)) = self.pending.remove(uri) {
            job.token.cancel();
        }
    }

    pub fn cancel_all(&self) {
        for job in self.pending.iter() {
            job.token.cancel();
        }
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

struct Job {
    uri: Url,
    version: i32,
    sequence: u64,
    token: CancellationToken,
    workspace: SharedWorkspaceState,
    publisher: DiagnosticsPublisher,
    pending: Arc<DashMap<Url, PendingJob>>,
}

impl Job {
    async fn run(self, delay: Duration) {
        tokio::select! {
            _ = self.token.cancelled() => {
                self.finish();
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let text = self
            .workspace
            .read()
            .documents
            .get(&self.uri)
            .filter(|document| document.version() == self.version)
            .map(|document| Arc::<str>::from(document.content()));
        let Some(text) = text else {
            self.finish();
            return;
        };

        let workspace = self.workspace.clone();
        let token = self.token.clone();
        let uri = self.uri.clone();
        let result = tokio::task::spawn_blocking(move || {
            workspace.analyze(&uri, text, &|| token.is_cancelled())
        })
        .await;

        match result {
            Ok(Ok(analysis)) => self.commit(analysis),
            Ok(Err(_cancelled)) => {
                tracing::debug!(uri = %self.uri, sequence = self.sequence, "analysis cancelled")
            }
            Err(err) => tracing::error!(uri = %self.uri, "analysis task failed: {}", err),
        }
        self.finish();
    }

    /// Commits and publishes under the workspace lock, so a concurrent close either
    /// happens before (and the job sees the document gone) or after (and clears what
    /// the job committed).
    fn commit(&self, analysis: DocumentAnalysis) {
        if self.token.is_cancelled() {
            return;
        }
        let mut workspace = self.workspace.write();
        match workspace.documents.get(&self.uri) {
            Some(document) if document.version() == self.version => {}
            _ => return,
        }

        let diagnostics = convert_diagnostics(&analysis, &workspace.config);
        let dependencies = analysis.scope.dependencies();
        let snapshot =
            AnalysisSnapshot::new(analysis, diagnostics.clone(), self.version, self.sequence);
        if !self.workspace.index().commit(&self.uri, snapshot) {
            tracing::debug!(uri = %self.uri, sequence = self.sequence, "snapshot superseded");
            return;
        }
        workspace.dependencies.set_dependencies(&self.uri, dependencies);
        self.publisher.publish(&self.uri, self.version, self.sequence, diagnostics);
    }

    fn finish(&self) {
        self.pending.remove_if(&self.uri, |_, job| job.sequence == self.sequence);
    }
}
