//! Debounce, supersession and cancellation of background analysis.

use super::test_utils::{open, url};
use crate::cli::lsp::analysis_queue::AnalysisQueue;
use crate::cli::lsp::diagnostics::DiagnosticsPublisher;
use crate::cli::lsp::workspace::SharedWorkspaceState;
use crossbeam_channel::Receiver;
use lsp_server::Message;
use lsp_types::{PublishDiagnosticsParams, TextDocumentContentChangeEvent};
use std::time::Duration;
use tokio::runtime::Runtime;

const DEBOUNCE: Duration = Duration::from_millis(100);

struct Fixture {
    runtime: Runtime,
    workspace: SharedWorkspaceState,
    queue: AnalysisQueue,
    published: Receiver<Message>,
}

impl Fixture {
    fn new() -> Self {
        let runtime = Runtime::new().unwrap();
        let workspace = SharedWorkspaceState::default();
        let (sender, published) = crossbeam_channel::unbounded();
        let queue = AnalysisQueue::new(
            runtime.handle().clone(),
            workspace.clone(),
            DiagnosticsPublisher::new(sender),
        );
        Self { runtime, workspace, queue, published }
    }

    fn edit(&self, name: &str, version: i32, text: &str) {
        let change = TextDocumentContentChangeEvent { range: None, range_length: None, text: text.into() };
        self.workspace.write().documents.change(&url(name), version, vec![change]).unwrap();
    }

    fn next(&self, wait: Duration) -> Option<PublishDiagnosticsParams> {
        match self.published.recv_timeout(wait).ok()? {
            Message::Notification(not) => Some(serde_json::from_value(not.params).unwrap()),
            other => panic!("unexpected message {:?}", other),
        }
    }
}

#[test]
fn test_burst_of_edits_publishes_once() {
    let fixture = Fixture::new();
    let uri = open(&fixture.workspace, "main.lg", 1, "# A\n- ${x(}");

    fixture.queue.schedule(&uri, DEBOUNCE);
    fixture.edit("main.lg", 2, "# A\n- ${x(1}");
    fixture.queue.schedule(&uri, DEBOUNCE);
    fixture.edit("main.lg", 3, "# A\n- a");
    fixture.queue.schedule(&uri, DEBOUNCE);
    assert_eq!(fixture.queue.pending_count(), 1);

    let published = fixture.next(Duration::from_secs(5)).expect("no diagnostics published");
    assert_eq!(published.version, Some(3));
    assert!(published.diagnostics.is_empty());
    assert!(fixture.next(DEBOUNCE * 3).is_none(), "superseded job published");

    let snapshot = fixture.workspace.index().get(&uri).unwrap();
    assert_eq!(snapshot.version, 3);
    assert_eq!(fixture.queue.pending_count(), 0);
    drop(fixture.runtime);
}

#[test]
fn test_sequences_increase_across_documents() {
    let fixture = Fixture::new();
    let a = open(&fixture.workspace, "a.lg", 1, "# A\n- a");
    let b = open(&fixture.workspace, "b.lg", 1, "# B\n- b");

    let first = fixture.queue.schedule(&a, DEBOUNCE).unwrap();
    let second = fixture.queue.schedule(&b, DEBOUNCE).unwrap();
    assert!(second > first);
    assert_eq!(fixture.queue.schedule(&url("closed.lg"), DEBOUNCE), None);
}

#[test]
fn test_cancelled_job_publishes_nothing() {
    let fixture = Fixture::new();
    let uri = open(&fixture.workspace, "main.lg", 1, "# A\n- ${Missing()}");

    fixture.queue.schedule(&uri, DEBOUNCE);
    fixture.queue.cancel(&uri);
    assert_eq!(fixture.queue.pending_count(), 0);

    assert!(fixture.next(DEBOUNCE * 3).is_none());
    assert!(fixture.workspace.index().get(&uri).is_none());
}

#[test]
fn test_job_for_outdated_version_is_dropped() {
    let fixture = Fixture::new();
    let uri = open(&fixture.workspace, "main.lg", 1, "# A\n- ${Missing()}");

    fixture.queue.schedule(&uri, DEBOUNCE);
    // edited without rescheduling: the queued job no longer matches the buffer
    fixture.edit("main.lg", 2, "# A\n- a");

    assert!(fixture.next(DEBOUNCE * 3).is_none());
    assert!(fixture.workspace.index().get(&uri).is_none());
}

#[test]
fn test_dependents_are_rescheduled() {
    let fixture = Fixture::new();
    let common = open(&fixture.workspace, "common.lg", 1, "# Greet\n- hi");
    let main = open(&fixture.workspace, "main.lg", 1, "[c](common.lg)\n# M\n- ${Greet()}");
    fixture.workspace.write().dependencies.set_dependencies(&main, vec![common.clone()]);

    fixture.queue.schedule_with_dependents(&common, Duration::ZERO);

    let mut uris = vec![
        fixture.next(Duration::from_secs(5)).unwrap().uri,
        fixture.next(Duration::from_secs(5)).unwrap().uri,
    ];
    uris.sort();
    assert_eq!(uris, vec![common, main]);
}
