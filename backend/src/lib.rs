//! Pizzaz MCP widget server library.
//!
//! This module exposes the application builder for use in tests.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::{
    routing::{get, post},
    Router,
};
use pizzaz_types::{POST_PATH, SSE_PATH};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod state;

use state::AppState;

/// Largest message body accepted on the message endpoint.
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Create the Axum application router.
///
/// Only the two MCP paths are routed; every other method/path pair gets a
/// 404. `HEAD` is answered explicitly since axum would otherwise hand it to
/// the `GET` handler and open a session.
pub fn create_app(state: AppState) -> Router {
    let mcp_router = Router::new()
        .route(
            SSE_PATH,
            get(api::mcp::mcp_sse)
                .head(api::mcp::not_found)
                .options(api::mcp::mcp_preflight)
                .fallback(api::mcp::not_found),
        )
        .route(
            POST_PATH,
            post(api::mcp::mcp_message)
                .options(api::mcp::mcp_preflight)
                .fallback(api::mcp::not_found)
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static("content-type"),
                )),
        )
        .layer(DefaultBodyLimit::max(MAX_MESSAGE_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ));

    Router::new()
        .merge(mcp_router)
        .fallback(api::mcp::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
