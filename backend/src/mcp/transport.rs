//! SSE transport for MCP sessions.
//!
//! Server-to-client messages travel on a long-lived SSE stream; the client
//! sends its messages as POSTs to the endpoint announced on that stream.
//! Responses to POSTed requests are written onto the stream, never onto the
//! POST response body.

use crate::mcp::handler::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::session::SessionGuard;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// Events buffered per stream before `send` waits on the client.
const EVENT_BUFFER: usize = 32;

/// Failures while delivering a POSTed message.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("SSE connection not established")]
    NotConnected,

    #[error("Unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(#[source] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("SSE stream closed")]
    StreamClosed,
}

impl TransportError {
    /// HTTP status reported to the POSTing client.
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::UnsupportedContentType(_) | TransportError::InvalidMessage(_) => {
                StatusCode::BAD_REQUEST
            }
            TransportError::NotConnected
            | TransportError::Encode(_)
            | TransportError::StreamClosed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Write half of one SSE stream.
#[derive(Debug)]
pub struct SseTransport {
    session_id: String,
    endpoint: String,
    events: mpsc::Sender<Event>,
}

impl SseTransport {
    /// Create a transport with a fresh random session id.
    pub fn new(post_path: &str) -> (Self, mpsc::Receiver<Event>) {
        Self::with_id(Uuid::new_v4().to_string(), post_path)
    }

    /// Create a transport with a caller-chosen session id.
    pub fn with_id(
        session_id: impl Into<String>,
        post_path: &str,
    ) -> (Self, mpsc::Receiver<Event>) {
        let session_id = session_id.into();
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let endpoint = format!("{}?sessionId={}", post_path, session_id);
        (
            Self {
                session_id,
                endpoint,
                events,
            },
            rx,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// URL the client should POST messages to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Announce the message endpoint. This is the connect handshake.
    pub fn start(&self) -> Result<(), TransportError> {
        self.events
            .try_send(Event::default().event("endpoint").data(&self.endpoint))
            .map_err(|_| TransportError::StreamClosed)
    }

    /// Write a JSON-RPC response onto the stream.
    pub async fn send(&self, response: &JsonRpcResponse) -> Result<(), TransportError> {
        let json = serde_json::to_string(response).map_err(TransportError::Encode)?;
        self.events
            .send(Event::default().event("message").data(json))
            .await
            .map_err(|_| TransportError::StreamClosed)
    }

    /// Decode a POSTed body into a JSON-RPC request.
    pub fn decode(headers: &HeaderMap, body: &[u8]) -> Result<JsonRpcRequest, TransportError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let mime = content_type.split(';').next().unwrap_or("").trim();
        if !mime.eq_ignore_ascii_case("application/json") {
            return Err(TransportError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }

        serde_json::from_slice(body).map_err(TransportError::InvalidMessage)
    }
}

/// Read half of one SSE stream, as handed to the HTTP response.
///
/// Holds the session's [`SessionGuard`]; dropping the stream closes the
/// session.
#[derive(Debug)]
pub struct SessionStream {
    events: ReceiverStream<Event>,
    guard: SessionGuard,
}

impl SessionStream {
    pub(crate) fn new(events: mpsc::Receiver<Event>, guard: SessionGuard) -> Self {
        Self {
            events: ReceiverStream::new(events),
            guard,
        }
    }

    pub fn session_id(&self) -> &str {
        self.guard.id()
    }
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx).map(|event| event.map(Ok))
    }
}
