//! Last-write-wins publication of diagnostics.

use crossbeam_channel::Sender;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lsp_server::{Message, Notification};
use lsp_types::notification::{Notification as _, PublishDiagnostics};
use lsp_types::{Diagnostic, PublishDiagnosticsParams, Url};
use std::sync::Arc;

/// Sends `textDocument/publishDiagnostics` and remembers, per document, the
/// `(version, sequence)` of the last set sent. Anything not newer is dropped, so a
/// slow job can never overwrite the result of a faster, later one.
#[derive(Clone)]
pub struct DiagnosticsPublisher {
    sender: Sender<Message>,
    published: Arc<DashMap<Url, (i32, u64)>>,
}

impl DiagnosticsPublisher {
    pub fn new(sender: Sender<Message>) -> Self {
        Self { sender, published: Arc::new(DashMap::new()) }
    }

    /// Returns whether the set was sent.
    pub fn publish(&self, uri: &Url, version: i32, sequence: u64, diagnostics: Vec<Diagnostic>) -> bool {
        match self.published.entry(uri.clone()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() >= (version, sequence) {
                    tracing::debug!(%uri, version, sequence, "dropping superseded diagnostics");
                    return false;
                }
                entry.insert((version, sequence));
            }
            Entry::Vacant(entry) => {
                entry.insert((version, sequence));
            }
        }
        tracing::debug!(%uri, version, count = diagnostics.len(), "publishing diagnostics");
        self.send(uri.clone(), diagnostics, Some(version))
    }

    /// Publishes an empty set and forgets the document.
    pub fn clear(&self, uri: &Url) {
        self.published.remove(uri);
        self.send(uri.clone(), Vec::new(), None);
    }

    pub fn last_published(&self, uri: &Url) -> Option<(i32, u64)> {
        self.published.get(uri).map(|entry| *entry)
    }

    fn send(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) -> bool {
        let params = PublishDiagnosticsParams { uri, diagnostics, version };
        let notification = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
        if self.sender.send(Message::Notification(notification)).is_err() {
            tracing::warn!("connection closed, diagnostics not delivered");
            return false;
        }
        true
    }
}
