//! Language Server Protocol implementation
//!
//! One thread runs the message loop: it owns the [`Session`] state machine and applies
//! document edits in arrival order. It never analyzes. Diagnostics are computed on a
//! tokio runtime through the [`AnalysisQueue`], and feature requests are answered on
//! the blocking pool, where a stale snapshot may be re-analyzed and `$/cancelRequest`
//! can cut them short.

mod analysis_queue;
mod diagnostics;
mod handlers;
mod utils;
mod workspace;

#[cfg(test)]
mod tests;

use crate::cli::config::{ConfigFile, ServerConfig};
use dashmap::DashMap;
use lsp_server::{Connection, ErrorCode, Message, Notification, Request, RequestId, Response};
use lsp_types::notification::{
    Cancel, DidChangeTextDocument, DidChangeWatchedFiles, DidCloseTextDocument,
    DidOpenTextDocument, DidSaveTextDocument, Exit, Initialized, Notification as _,
};
use lsp_types::request::{
    Completion, GotoDefinition, HoverRequest, Initialize, References, Request as _,
    Shutdown, SignatureHelpRequest,
};
use lsp_types::{
    CompletionOptions, HoverProviderCapability, InitializeParams, InitializeResult,
    NumberOrString, OneOf, SaveOptions, ServerCapabilities, ServerInfo, SignatureHelpOptions,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, WorkDoneProgressOptions,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use self::analysis_queue::AnalysisQueue;
use self::diagnostics::DiagnosticsPublisher;
use self::handlers::Handlers;
use self::utils::{cast_notification, cast_request, error_response};
use self::workspace::{Services, Session, SessionEvent, SessionState, SharedWorkspaceState};

pub const SERVER_NAME: &str = "lg-language-server";

const COMPLETION_TRIGGERS: [&str; 4] = ["$", "{", "[", "."];
const SIGNATURE_TRIGGERS: [&str; 2] = ["(", ","];

/// Run the Language Server Protocol server over stdin/stdout. Returns the process
/// exit code the protocol asks for.
pub fn run_lsp(config: ServerConfig) -> Result<i32, Box<dyn Error + Send + Sync>> {
    // stdout carries the protocol; logging goes to stderr
    tracing::info!("starting LG language server");

    let (connection, io_threads) = Connection::stdio();
    let server = Server::new(connection, Services::default(), config)?;
    let exit_code = server.run()?;
    io_threads.join()?;

    tracing::info!(exit_code, "LG language server stopped");
    Ok(exit_code)
}

pub fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(TextDocumentSyncKind::INCREMENTAL),
            save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                include_text: Some(false),
            })),
            ..Default::default()
        })),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(COMPLETION_TRIGGERS.iter().map(|c| c.to_string()).collect()),
            ..Default::default()
        }),
        signature_help_provider: Some(SignatureHelpOptions {
            trigger_characters: Some(SIGNATURE_TRIGGERS.iter().map(|c| c.to_string()).collect()),
            retrigger_characters: None,
            work_done_progress_options: WorkDoneProgressOptions::default(),
        }),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

pub struct Server {
    connection: Connection,
    session: Session,
    workspace: SharedWorkspaceState,
    handlers: Handlers,
    queue: AnalysisQueue,
    publisher: DiagnosticsPublisher,
    runtime: Runtime,
    in_flight: Arc<DashMap<RequestId, CancellationToken>>,
    /// Settings from the command line, before workspace files and client options.
    base_config: ServerConfig,
}

impl Server {
    pub fn new(
        connection: Connection,
        services: Services,
        config: ServerConfig,
    ) -> Result<Self, std::io::Error> {
        let runtime = Runtime::new()?;
        let workspace = SharedWorkspaceState::new(services, config.clone());
        let publisher = DiagnosticsPublisher::new(connection.sender.clone());
        let queue =
            AnalysisQueue::new(runtime.handle().clone(), workspace.clone(), publisher.clone());
        Ok(Self {
            connection,
            session: Session::default(),
            handlers: Handlers::new(workspace.clone()),
            workspace,
            queue,
            publisher,
            runtime,
            in_flight: Arc::new(DashMap::new()),
            base_config: config,
        })
    }

    /// Processes messages until `exit` arrives or the client goes away.
    pub fn run(mut self) -> Result<i32, Box<dyn Error + Send + Sync>> {
        while let Ok(message) = self.connection.receiver.recv() {
            match message {
                Message::Request(req) => self.on_request(req)?,
                Message::Notification(not) => {
                    let method = not.method.clone();
                    if let Err(err) = self.on_notification(not) {
                        tracing::warn!(%method, "failed to handle notification: {}", err);
                    }
                }
                Message::Response(resp) => {
                    tracing::warn!(id = ?resp.id, "unexpected response from client");
                }
            }
            if self.session.state() == SessionState::Exited {
                break;
            }
        }

        let exit_code = self.session.exit_code();
        tracing::debug!("session transitions:\n{}", self.session.history().format());
        self.queue.cancel_all();
        let Server { runtime, .. } = self;
        runtime.shutdown_timeout(Duration::from_secs(1));
        Ok(exit_code)
    }

    fn on_request(&mut self, req: Request) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(id = ?req.id, method = %req.method, "request");
        match req.method.as_str() {
            Initialize::METHOD => self.on_initialize(req),
            Shutdown::METHOD => self.on_shutdown(req),
            _ => {
                if let Err(err) = self.session.check_request(&req.method) {
                    return self.send(error_response(req.id, err.code(), err.to_string()));
                }
                self.dispatch(req)
            }
        }
    }

    fn on_initialize(&mut self, req: Request) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (id, params) = match cast_request::<Initialize>(req) {
            Ok(request) => request,
            Err((id, err)) => {
                return self.send(error_response(id, ErrorCode::InvalidParams, err.to_string()))
            }
        };
        if let Err(err) = self.session.apply(SessionEvent::Initialize) {
            return self.send(error_response(id, err.code(), err.to_string()));
        }

        self.configure(&params);

        let result = InitializeResult {
            capabilities: server_capabilities(),
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        };
        self.send(Response::new_ok(id, result))
    }

    /// Layers `lgtools.yml` from the workspace root, then the client's initialization
    /// options, over the command line settings.
    fn configure(&self, params: &InitializeParams) {
        let mut config = self.base_config.clone();

        if let Some(root) = workspace_root(params) {
            match ConfigFile::find_in(&root) {
                Ok(Some(file)) => {
                    tracing::info!(root = %root.display(), "loaded workspace configuration");
                    config.apply(file);
                }
                Ok(None) => {}
                Err(err) => tracing::warn!("ignoring workspace configuration: {}", err),
            }
        }

        if let Some(options) = params.initialization_options.clone() {
            match ConfigFile::from_options(options) {
                Ok(file) => config.apply(file),
                Err(err) => tracing::warn!("ignoring initialization options: {}", err),
            }
        }

        tracing::debug!(debounce_ms = config.debounce_ms, rules = config.rules.len(), "configured");
        self.workspace.write().config = config;
    }

    fn on_shutdown(&mut self, req: Request) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Err(err) = self.session.apply(SessionEvent::Shutdown) {
            return self.send(error_response(req.id, err.code(), err.to_string()));
        }
        self.queue.cancel_all();
        for token in self.in_flight.iter() {
            token.cancel();
        }
        self.workspace.clear();
        self.send(Response::new_ok(req.id, ()))
    }

    fn dispatch(&self, req: Request) -> Result<(), Box<dyn Error + Send + Sync>> {
        match req.method.as_str() {
            Completion::METHOD => {
                self.spawn_request::<Completion, _>(req, |h, p| h.completion.completion(p))
            }
            References::METHOD => {
                self.spawn_request::<References, _>(req, |h, p| h.references.find_references(p))
            }
            HoverRequest::METHOD => {
                self.spawn_request::<HoverRequest, _>(req, |h, p| h.hover.hover(p))
            }
            SignatureHelpRequest::METHOD => self
                .spawn_request::<SignatureHelpRequest, _>(req, |h, p| {
                    h.signature_help.signature_help(p)
                }),
            GotoDefinition::METHOD => {
                self.spawn_request::<GotoDefinition, _>(req, |h, p| h.definition.goto_definition(p))
            }
            _ => {
                tracing::debug!(method = %req.method, "unhandled request");
                let message = format!("method not found: {}", req.method);
                self.send(error_response(req.id, ErrorCode::MethodNotFound, message))
            }
        }
    }

    /// Answers a request from the blocking pool. `$/cancelRequest` for its id answers
    /// it with `RequestCanceled` instead, whether or not the work has finished.
    fn spawn_request<R, F>(&self, req: Request, handle: F) -> Result<(), Box<dyn Error + Send + Sync>>
    where
        R: lsp_types::request::Request,
        R::Params: Send + 'static,
        R::Result: Send + 'static,
        F: FnOnce(&Handlers, R::Params) -> R::Result + Send + 'static,
    {
        let (id, params) = match cast_request::<R>(req) {
            Ok(request) => request,
            Err((id, err)) => return self.send(invalid_params::<R>(id, err)),
        };

        let token = CancellationToken::new();
        self.in_flight.insert(id.clone(), token.clone());
        let handlers = self.handlers.clone();
        let sender = self.connection.sender.clone();
        let in_flight = self.in_flight.clone();

        self.runtime.spawn(async move {
            let work = tokio::task::spawn_blocking(move || handle(&handlers, params));
            let response = tokio::select! {
                biased;
                _ = token.cancelled() => cancelled(id.clone()),
                result = work => match result {
                    Ok(_) if token.is_cancelled() => cancelled(id.clone()),
                    Ok(result) => Response::new_ok(id.clone(), result),
                    Err(err) => error_response(id.clone(), ErrorCode::InternalError, err.to_string()),
                },
            };
            in_flight.remove(&id);
            if sender.send(Message::Response(response)).is_err() {
                tracing::debug!(?id, "connection closed before response");
            }
        });
        Ok(())
    }

    fn on_notification(&mut self, not: Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(method = %not.method, "notification");
        match not.method.as_str() {
            Exit::METHOD => {
                self.session.apply(SessionEvent::Exit)?;
                return Ok(());
            }
            Initialized::METHOD => {
                self.session.apply(SessionEvent::Initialized)?;
                tracing::info!("session ready");
                return Ok(());
            }
            _ => {}
        }

        if !self.session.state().can_accept_requests() {
            tracing::debug!(
                method = %not.method,
                state = self.session.state().description(),
                "ignoring notification"
            );
            return Ok(());
        }

        match not.method.as_str() {
            DidOpenTextDocument::METHOD => {
                let params = cast_notification::<DidOpenTextDocument>(not)?;
                let uri = self.handlers.document_sync.did_open(params);
                self.queue.schedule(&uri, Duration::ZERO);
                self.schedule_dependents(&uri);
            }
            DidChangeTextDocument::METHOD => {
                let params = cast_notification::<DidChangeTextDocument>(not)?;
                match self.handlers.document_sync.did_change(params) {
                    Ok(uri) => self.queue.schedule_with_dependents(&uri, self.debounce()),
                    Err(err) => tracing::warn!("rejected edit: {}", err),
                }
            }
            DidSaveTextDocument::METHOD => {
                let params = cast_notification::<DidSaveTextDocument>(not)?;
                self.handlers.document_sync.did_save(params);
            }
            DidCloseTextDocument::METHOD => {
                let params = cast_notification::<DidCloseTextDocument>(not)?;
                let uri = params.text_document.uri.clone();
                self.queue.cancel(&uri);
                self.handlers.document_sync.did_close(params);
                self.publisher.clear(&uri);
                self.schedule_dependents(&uri);
            }
            DidChangeWatchedFiles::METHOD => {
                let params = cast_notification::<DidChangeWatchedFiles>(not)?;
                let delay = self.debounce();
                for uri in self.handlers.workspace.did_change_watched_files(params) {
                    self.queue.schedule(&uri, delay);
                }
            }
            Cancel::METHOD => {
                let params = cast_notification::<Cancel>(not)?;
                let id = match params.id {
                    NumberOrString::Number(id) => RequestId::from(id),
                    NumberOrString::String(id) => RequestId::from(id),
                };
                if let Some(token) = self.in_flight.get(&id) {
                    tracing::debug!(?id, "cancelling request");
                    token.cancel();
                }
            }
            _ => tracing::debug!(method = %not.method, "unhandled notification"),
        }
        Ok(())
    }

    fn schedule_dependents(&self, uri: &lsp_types::Url) {
        let delay = self.debounce();
        let dependents = self.workspace.read().open_dependents(uri);
        for dependent in dependents {
            self.queue.schedule(&dependent, delay);
        }
    }

    fn debounce(&self) -> Duration {
        self.workspace.config().debounce()
    }

    fn send(&self, response: Response) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.connection.sender.send(Message::Response(response))?;
        Ok(())
    }
}

fn invalid_params<R: lsp_types::request::Request>(id: RequestId, err: serde_json::Error) -> Response {
    tracing::warn!(method = R::METHOD, "invalid parameters: {}", err);
    error_response(id, ErrorCode::InvalidParams, format!("invalid parameters for {}: {}", R::METHOD, err))
}

fn cancelled(id: RequestId) -> Response {
    error_response(id, ErrorCode::RequestCanceled, "request cancelled")
}

#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())
        .and_then(|uri| uri.to_file_path().ok())
}
