//! Shared types for the Pizzaz MCP widget server.
//!
//! This crate contains the widget record and the MCP descriptor shapes
//! that the server publishes and that clients (and tests) decode.

/// Default port for the server when `PORT` is unset or invalid.
pub const DEFAULT_PORT: u16 = 8000;

/// Path of the SSE stream endpoint.
pub const SSE_PATH: &str = "/mcp";

/// Path of the message delivery endpoint.
pub const POST_PATH: &str = "/mcp/messages";

pub mod mcp;
pub mod widget;

// Re-export commonly used types
pub use mcp::{
    CallToolResult, Content, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    PizzaToppingArgs, ReadResourceResult, Resource, ResourceContents, ResourceTemplate, Tool,
};
pub use widget::{Widget, WidgetMeta};
