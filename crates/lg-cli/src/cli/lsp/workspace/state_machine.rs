//! Session lifecycle state machine.
//!
//! The server drives the protocol lifecycle by hand instead of relying on the
//! transport's helpers, so every lifecycle message goes through [`Session`]. It
//! defines:
//! - [`SessionState`]: where the session is in the protocol lifecycle
//! - [`SessionEvent`]: lifecycle messages that move the session forward
//! - [`SessionError`]: why a message was refused, with the protocol error code
//!   the client receives
//! - [`StateHistory`]: a bounded record of transitions for debugging

use lsp_server::ErrorCode;
use std::time::SystemTime;
use thiserror::Error;

/// Protocol lifecycle states.
///
/// # State Diagram
///
/// ```text
/// Uninitialized -> Initializing -> Ready -> ShuttingDown -> Exited
///       |               |           |                        ^
///       +---------------+-----------+---------- exit --------+
/// ```
///
/// Only [`Ready`](Self::Ready) accepts document notifications and feature
/// requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No `initialize` request seen yet.
    #[default]
    Uninitialized,

    /// `initialize` answered, waiting for the `initialized` notification.
    Initializing,

    /// Serving requests.
    Ready,

    /// `shutdown` answered, only `exit` is expected.
    ShuttingDown,

    /// `exit` received. The message loop stops.
    Exited,
}

impl SessionState {
    /// Returns `true` if feature requests and document notifications are served.
    pub fn can_accept_requests(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::Initializing => "Initializing",
            SessionState::Ready => "Ready",
            SessionState::ShuttingDown => "Shutting down",
            SessionState::Exited => "Exited",
        }
    }
}

/// Lifecycle messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// `initialize` request.
    Initialize,
    /// `initialized` notification.
    Initialized,
    /// `shutdown` request.
    Shutdown,
    /// `exit` notification.
    Exit,
}

impl SessionEvent {
    pub fn method(&self) -> &'static str {
        match self {
            SessionEvent::Initialize => "initialize",
            SessionEvent::Initialized => "initialized",
            SessionEvent::Shutdown => "shutdown",
            SessionEvent::Exit => "exit",
        }
    }
}

/// Why the session refused a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A request arrived before the `initialized` notification
    #[error("server is not initialized, cannot handle '{method}'")]
    NotInitialized { method: String },

    /// A request arrived after `shutdown`
    #[error("server is shutting down, cannot handle '{method}'")]
    ShuttingDown { method: String },

    /// `initialize` was sent twice
    #[error("server is already initialized")]
    AlreadyInitialized,

    /// A lifecycle message that makes no sense in the current state
    #[error("unexpected '{event}' while {state}")]
    UnexpectedEvent { event: &'static str, state: &'static str },
}

impl SessionError {
    /// The protocol error code sent back to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotInitialized { .. } => ErrorCode::ServerNotInitialized,
            SessionError::ShuttingDown { .. }
            | SessionError::AlreadyInitialized
            | SessionError::UnexpectedEvent { .. } => ErrorCode::InvalidRequest,
        }
    }
}

/// One recorded transition.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub event: SessionEvent,
    pub timestamp: SystemTime,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState, event: SessionEvent) -> Self {
        Self { from, to, event, timestamp: SystemTime::now() }
    }

    /// Format: `"Ready -> Shutting down (shutdown)"`
    pub fn format(&self) -> String {
        format!("{} -> {} ({})", self.from.description(), self.to.description(), self.event.method())
    }
}

/// Bounded history of transitions, oldest first.
#[derive(Debug, Clone)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
    max_size: usize,
}

impl StateHistory {
    pub fn new(max_size: usize) -> Self {
        Self { transitions: Vec::with_capacity(max_size), max_size }
    }

    /// Records a transition, dropping the oldest one at capacity.
    pub fn record(&mut self, transition: StateTransition) {
        if self.transitions.len() >= self.max_size {
            self.transitions.remove(0);
        }
        self.transitions.push(transition);
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// One transition per line.
    pub fn format(&self) -> String {
        self.transitions.iter().map(|t| t.format()).collect::<Vec<_>>().join("\n")
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new(50)
    }
}

/// The lifecycle of one client connection.
///
/// # Examples
///
/// ```ignore
/// let mut session = Session::default();
/// session.apply(SessionEvent::Initialize)?;
/// session.apply(SessionEvent::Initialized)?;
/// assert!(session.check_request("textDocument/hover").is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
    history: StateHistory,
    shutdown_requested: bool,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Moves the session forward on a lifecycle message. A refused message
    /// leaves the state unchanged.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionState, SessionError> {
        use SessionState::*;

        let next = match (self.state, event) {
            (_, SessionEvent::Exit) => Exited,
            (Uninitialized, SessionEvent::Initialize) => Initializing,
            (Initializing, SessionEvent::Initialized) => Ready,
            (Ready, SessionEvent::Shutdown) => ShuttingDown,
            (Initializing | Ready, SessionEvent::Initialize) => {
                return Err(SessionError::AlreadyInitialized)
            }
            (Uninitialized | Initializing, SessionEvent::Shutdown) => {
                return Err(SessionError::NotInitialized { method: event.method().to_string() })
            }
            (ShuttingDown | Exited, SessionEvent::Initialize | SessionEvent::Shutdown) => {
                return Err(SessionError::ShuttingDown { method: event.method().to_string() })
            }
            (state, event) => {
                return Err(SessionError::UnexpectedEvent {
                    event: event.method(),
                    state: state.description(),
                })
            }
        };

        if self.state == ShuttingDown {
            self.shutdown_requested = true;
        }
        let transition = StateTransition::new(self.state, next, event);
        tracing::debug!(transition = %transition.format(), "session transition");
        self.history.record(transition);
        self.state = next;
        Ok(next)
    }

    /// Gate for any request other than `initialize` and `shutdown`.
    pub fn check_request(&self, method: &str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Uninitialized | SessionState::Initializing => {
                Err(SessionError::NotInitialized { method: method.to_string() })
            }
            SessionState::ShuttingDown | SessionState::Exited => {
                Err(SessionError::ShuttingDown { method: method.to_string() })
            }
        }
    }

    /// Process exit code once the session has exited: 0 only after a clean shutdown.
    pub fn exit_code(&self) -> i32 {
        if self.state == SessionState::Exited && self.shutdown_requested {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> Session {
        let mut session = Session::default();
        session.apply(SessionEvent::Initialize).unwrap();
        session.apply(SessionEvent::Initialized).unwrap();
        session
    }

    #[test]
    fn test_session_default() {
        assert_eq!(Session::default().state(), SessionState::Uninitialized);
        assert!(!SessionState::default().can_accept_requests());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut session = ready();
        assert!(session.state().can_accept_requests());
        assert_eq!(session.apply(SessionEvent::Shutdown), Ok(SessionState::ShuttingDown));
        assert_eq!(session.apply(SessionEvent::Exit), Ok(SessionState::Exited));
        assert_eq!(session.exit_code(), 0);
        assert_eq!(session.history().transitions().len(), 4);
    }

    #[test]
    fn test_exit_without_shutdown_is_unclean() {
        let mut session = ready();
        session.apply(SessionEvent::Exit).unwrap();
        assert_eq!(session.exit_code(), 1);
    }

    #[test]
    fn test_requests_before_ready() {
        let mut session = Session::default();
        let err = session.check_request("textDocument/hover").unwrap_err();
        assert_eq!(err.code() as i32, ErrorCode::ServerNotInitialized as i32);

        session.apply(SessionEvent::Initialize).unwrap();
        let err = session.check_request("textDocument/hover").unwrap_err();
        assert_eq!(err.code() as i32, ErrorCode::ServerNotInitialized as i32);
    }

    #[test]
    fn test_requests_after_shutdown() {
        let mut session = ready();
        session.apply(SessionEvent::Shutdown).unwrap();
        let err = session.check_request("textDocument/completion").unwrap_err();
        assert_eq!(err.code() as i32, ErrorCode::InvalidRequest as i32);
        assert!(err.to_string().contains("textDocument/completion"));
    }

    #[test]
    fn test_refused_event_keeps_state() {
        let mut session = ready();
        assert_eq!(session.apply(SessionEvent::Initialize), Err(SessionError::AlreadyInitialized));
        assert_eq!(session.state(), SessionState::Ready);

        let mut fresh = Session::default();
        let err = fresh.apply(SessionEvent::Shutdown).unwrap_err();
        assert_eq!(err.code() as i32, ErrorCode::ServerNotInitialized as i32);
        assert!(fresh.apply(SessionEvent::Initialized).is_err());
        assert_eq!(fresh.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_transition_format() {
        let transition =
            StateTransition::new(SessionState::Ready, SessionState::ShuttingDown, SessionEvent::Shutdown);
        assert_eq!(transition.format(), "Ready -> Shutting down (shutdown)");
    }

    #[test]
    fn test_state_history_bounds() {
        let mut history = StateHistory::new(3);
        for _ in 0..5 {
            history.record(StateTransition::new(
                SessionState::Uninitialized,
                SessionState::Initializing,
                SessionEvent::Initialize,
            ));
        }
        assert_eq!(history.transitions().len(), 3);
        assert_eq!(history.format().lines().count(), 3);
    }
}
