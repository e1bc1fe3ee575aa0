//! MCP (Model Context Protocol) over Server-Sent Events.
//!
//! ## Endpoints
//!
//! - `GET /mcp` - Open an SSE stream; the first event (`endpoint`) names
//!   the URL to POST messages to
//! - `POST /mcp/messages?sessionId=<id>` - Deliver a JSON-RPC message; the
//!   response arrives on the stream as a `message` event
//!
//! ## Session Management
//!
//! Sessions live exactly as long as their SSE stream and are looked up by
//! the `sessionId` query parameter.

pub mod handler;
pub mod session;
pub mod transport;

pub use handler::McpHandler;
pub use session::{Session, SessionPolicy, SessionRegistry, SessionState};
pub use transport::{SessionStream, SseTransport, TransportError};
