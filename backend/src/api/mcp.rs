//! MCP SSE endpoint handlers.
//!
//! ## Endpoints
//!
//! - `OPTIONS /mcp`, `OPTIONS /mcp/messages` - CORS preflight
//! - `GET /mcp` - Open the SSE stream for a new session
//! - `POST /mcp/messages?sessionId=<id>` - Deliver a message to a session

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use pizzaz_types::POST_PATH;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::state::AppState;

/// Query string of the message endpoint.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// OPTIONS on either MCP path - answer the CORS preflight.
pub async fn mcp_preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            ),
        ],
    )
        .into_response()
}

/// GET /mcp - Open an SSE stream.
///
/// Creates a dispatcher and a session, registers it and announces the
/// message endpoint as the first event. The session is closed when the
/// client goes away.
pub async fn mcp_sse(State(state): State<AppState>) -> Response {
    match state.sessions().connect(state.new_handler(), POST_PATH) {
        Ok(stream) => Sse::new(stream)
            .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
            .into_response(),
        Err(e) => {
            error!("Failed to start SSE session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to establish SSE connection",
            )
                .into_response()
        }
    }
}

/// POST /mcp/messages - Deliver a JSON-RPC message to a session.
///
/// Answers 202 once the message has been handled; the JSON-RPC response
/// itself is written to the session's SSE stream.
pub async fn mcp_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "Missing sessionId query parameter",
        )
            .into_response();
    };

    let Some(session) = state.sessions().get(&session_id) else {
        debug!("MCP: POST for unknown session {}", session_id);
        return (StatusCode::NOT_FOUND, "Unknown session").into_response();
    };

    match session.handle_message(&headers, &body).await {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!("Failed to process message for session {}: {}", session_id, e);
                if state.policy().close_on_message_error {
                    state.sessions().close(&session_id);
                }
                (status, "Failed to process message").into_response()
            } else {
                warn!("MCP: Rejected message for session {}: {}", session_id, e);
                (status, e.to_string()).into_response()
            }
        }
    }
}

/// Anything that is not an MCP route.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
