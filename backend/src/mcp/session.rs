//! MCP session management.
//!
//! A session binds one [`McpHandler`] to one [`SseTransport`] for the
//! lifetime of an SSE stream. Sessions are only reachable through the
//! [`SessionRegistry`], keyed by the identifier the transport allocated.
//!
//! Registry operations take a synchronous lock and never hold it across an
//! `.await`, so a stream that is torn down from a `Drop` impl can remove its
//! entry without a runtime.

use crate::mcp::handler::McpHandler;
use crate::mcp::transport::{SessionStream, SseTransport, TransportError};
use axum::http::HeaderMap;
use axum::response::sse::Event;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, handshake not yet sent.
    Connecting,
    /// Handshake sent; messages are accepted.
    Open,
    /// Terminal.
    Closed,
}

/// Knobs for behavior that is deliberately permissive by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Reject `resources/read` for any URI other than the widget template.
    pub strict_resource_uri: bool,
    /// Close the owning session when a message fails with a server error.
    pub close_on_message_error: bool,
}

/// Error type for session registry operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session id already registered: {0}")]
    DuplicateId(String),

    #[error("Failed to establish session {id}: {source}")]
    Connect {
        id: String,
        #[source]
        source: TransportError,
    },
}

/// An MCP session.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: Instant,
    handler: McpHandler,
    transport: SseTransport,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a session in the `Connecting` state.
    pub fn new(handler: McpHandler, transport: SseTransport) -> Self {
        Self {
            id: transport.session_id().to_string(),
            created_at: Instant::now(),
            handler,
            transport,
            state: Mutex::new(SessionState::Connecting),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Get the session age in seconds.
    pub fn age_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    fn mark_open(&self) -> bool {
        let mut state = self.state.lock();
        if *state == SessionState::Connecting {
            *state = SessionState::Open;
            true
        } else {
            false
        }
    }

    /// Returns false if the session was already closed.
    fn mark_closed(&self) -> bool {
        let mut state = self.state.lock();
        let was_open = *state != SessionState::Closed;
        *state = SessionState::Closed;
        was_open
    }

    /// Decode a POSTed message, dispatch it and write any response onto
    /// the stream.
    pub async fn handle_message(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), TransportError> {
        match self.state() {
            SessionState::Open => {}
            SessionState::Connecting => return Err(TransportError::NotConnected),
            SessionState::Closed => return Err(TransportError::StreamClosed),
        }

        let request = SseTransport::decode(headers, body)?;
        debug!("MCP session {}: method={}", self.id, request.method);

        if let Some(response) = self.handler.handle_request(request) {
            self.transport.send(&response).await?;
        }
        Ok(())
    }
}

/// Removes its session from the registry when dropped.
///
/// Owned by the SSE response stream, so a client disconnect (which drops
/// the response body) closes the session.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    id: String,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.close(&self.id) {
            info!("MCP: SSE stream closed for session {}", self.id);
        }
    }
}

/// Process-wide map from session id to session.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. An id that is already present is refused.
    pub fn insert(&self, session: Session) -> Result<Arc<Session>, SessionError> {
        let mut sessions = self.sessions.write();
        match sessions.entry(session.id.clone()) {
            Entry::Occupied(entry) => Err(SessionError::DuplicateId(entry.key().clone())),
            Entry::Vacant(entry) => {
                let session = Arc::new(session);
                entry.insert(session.clone());
                Ok(session)
            }
        }
    }

    /// Establish a new session and return the stream that feeds its client.
    ///
    /// The session is registered before the handshake so that a POST racing
    /// in right behind the stream can already find it.
    pub fn connect(
        &self,
        handler: McpHandler,
        post_path: &str,
    ) -> Result<SessionStream, SessionError> {
        let (transport, events) = SseTransport::new(post_path);
        self.attach(handler, transport, events)
    }

    /// Register a session around an existing transport and send its
    /// handshake. A failed handshake leaves nothing registered.
    pub fn attach(
        &self,
        handler: McpHandler,
        transport: SseTransport,
        events: mpsc::Receiver<Event>,
    ) -> Result<SessionStream, SessionError> {
        let session = self.insert(Session::new(handler, transport))?;
        let guard = SessionGuard {
            registry: self.clone(),
            id: session.id.clone(),
        };

        if let Err(source) = session.transport.start() {
            // The guard removes the entry when it drops on return.
            return Err(SessionError::Connect {
                id: session.id.clone(),
                source,
            });
        }

        session.mark_open();
        info!("MCP: SSE stream opened for session {}", session.id);
        Ok(SessionStream::new(events, guard))
    }

    /// Get a session by ID.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Check if a session exists.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Close a session and drop it from the registry.
    ///
    /// Returns false if no such session was registered.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(session) => {
                session.mark_closed();
                debug!(
                    "MCP: Session {} removed after {}s",
                    id,
                    session.age_secs()
                );
                true
            }
            None => false,
        }
    }

    /// Close every session. Used on shutdown so open streams end.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.mark_closed();
        }
        if !drained.is_empty() {
            warn!("MCP: Closed {} open session(s)", drained.len());
        }
        drained.len()
    }

    /// Get the number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Snapshot of registered ids.
    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
