//! MCP JSON-RPC request handler.
//!
//! Answers the fixed set of MCP methods from the shared [`Catalog`]. The
//! handler does no I/O; the transport decides where responses go.

use crate::catalog::Catalog;
use crate::mcp::session::SessionPolicy;
use pizzaz_types::{
    CallToolResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    PizzaToppingArgs, ReadResourceResult,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Latest MCP protocol version we speak.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions a client may negotiate.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &["2025-06-18", "2025-03-26", "2024-11-05", "2024-10-07"];

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "zk-demo-node";

/// JSON-RPC 2.0 Request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with the given id.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Notifications carry no id and never get a response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 Response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC 2.0 Error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// Failures the dispatcher reports back to the caller as JSON-RPC errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// JSON-RPC error code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::MethodNotFound(_) => -32601,
            DispatchError::InvalidParams(_) | DispatchError::InvalidArguments { .. } => -32602,
            DispatchError::ResourceNotFound(_) => -32002,
            DispatchError::Encode(_) => -32603,
        }
    }
}

/// Tool call parameters from MCP.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
}

/// MCP request handler bound to the shared catalog.
#[derive(Debug, Clone)]
pub struct McpHandler {
    catalog: Arc<Catalog>,
    policy: SessionPolicy,
}

impl McpHandler {
    pub fn new(catalog: Arc<Catalog>, policy: SessionPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Handle an MCP JSON-RPC request.
    ///
    /// Returns `None` for notifications.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("MCP: Handling method: {}", request.method);

        if request.method.starts_with("notifications/") {
            return None;
        }

        let is_notification = request.is_notification();
        let result = self.dispatch(&request.method, request.params);
        if is_notification {
            if let Err(e) = result {
                warn!("MCP: Notification {} failed: {}", request.method, e);
            }
            return None;
        }

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => {
                warn!("MCP: {} failed: {}", request.method, e);
                JsonRpcResponse::error(request.id, e.code(), e.to_string())
            }
        })
    }

    /// Route a method name and its params to the matching operation.
    pub fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, DispatchError> {
        let value = match method {
            "initialize" => {
                let params: InitializeParams = match params {
                    Some(p) => parse_params(Some(p))?,
                    None => InitializeParams::default(),
                };
                self.initialize(params.protocol_version.as_deref())
            }
            "ping" => json!({}),
            "tools/list" => serde_json::to_value(self.list_tools())?,
            "resources/list" => serde_json::to_value(self.list_resources())?,
            "resources/templates/list" => serde_json::to_value(self.list_resource_templates())?,
            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                serde_json::to_value(self.read_resource(&params.uri)?)?
            }
            "tools/call" => {
                let params: ToolCallParams = parse_params(params)?;
                serde_json::to_value(self.call_tool(&params.name, params.arguments)?)?
            }
            _ => return Err(DispatchError::MethodNotFound(method.to_string())),
        };
        Ok(value)
    }

    /// Result of the `initialize` handshake.
    pub fn initialize(&self, requested_version: Option<&str>) -> Value {
        let version = requested_version
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(PROTOCOL_VERSION);
        json!({
            "protocolVersion": version,
            "capabilities": {
                "resources": {},
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: vec![self.catalog.tool().clone()],
        }
    }

    pub fn list_resources(&self) -> ListResourcesResult {
        ListResourcesResult {
            resources: vec![self.catalog.resource().clone()],
        }
    }

    pub fn list_resource_templates(&self) -> ListResourceTemplatesResult {
        ListResourceTemplatesResult {
            resource_templates: vec![self.catalog.resource_template().clone()],
        }
    }

    /// Read the widget resource.
    ///
    /// The requested URI is only checked when the policy asks for it; by
    /// default any URI yields the widget HTML.
    pub fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, DispatchError> {
        if self.policy.strict_resource_uri && uri != self.catalog.resource().uri {
            return Err(DispatchError::ResourceNotFound(uri.to_string()));
        }
        Ok(ReadResourceResult {
            contents: vec![self.catalog.contents()],
        })
    }

    /// Validate the tool arguments and echo them back as structured content.
    pub fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, DispatchError> {
        if name != self.catalog.tool().name {
            warn!("MCP: Call for unknown tool '{}', serving widget tool", name);
        }

        let args: PizzaToppingArgs = serde_json::from_value(arguments.unwrap_or(json!({})))
            .map_err(|e| DispatchError::InvalidArguments {
                tool: name.to_string(),
                reason: e.to_string(),
            })?;

        debug!("MCP: Tool call with topping '{}'", args.pizza_topping);

        Ok(CallToolResult {
            content: vec![self.catalog.response_content()],
            structured_content: args,
            meta: self.catalog.meta().clone(),
        })
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, DispatchError> {
    let params = params.ok_or_else(|| DispatchError::InvalidParams("missing params".into()))?;
    serde_json::from_value(params).map_err(|e| DispatchError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pizzaz_types::Content;

    fn handler() -> McpHandler {
        McpHandler::new(
            Arc::new(Catalog::with_html("<div>widget</div>")),
            SessionPolicy::default(),
        )
    }

    fn strict_handler() -> McpHandler {
        McpHandler::new(
            Arc::new(Catalog::with_html("<div>widget</div>")),
            SessionPolicy {
                strict_resource_uri: true,
                ..SessionPolicy::default()
            },
        )
    }

    #[test]
    fn test_call_tool_echoes_topping() {
        let handler = handler();
        for topping in ["mushroom", "", "extra cheese", "🍍"] {
            let result = handler
                .call_tool("zk-demo", Some(json!({ "pizzaTopping": topping })))
                .unwrap();
            assert_eq!(result.structured_content.pizza_topping, topping);
            assert_eq!(
                result.content,
                vec![Content::Text {
                    text: "help!".to_string()
                }]
            );
            assert_eq!(result.meta.output_template, "ui://widget/zk.html");
        }
    }

    #[test]
    fn test_call_tool_rejects_invalid_arguments() {
        let handler = handler();
        for args in [
            None,
            Some(json!({})),
            Some(json!({ "pizzaTopping": 42 })),
            Some(json!({ "pizzaTopping": "ham", "size": "large" })),
        ] {
            let err = handler.call_tool("zk-demo", args).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidArguments { .. }));
            assert_eq!(err.code(), -32602);
        }
    }

    #[test]
    fn test_list_methods_are_idempotent() {
        let handler = handler();
        let other = handler.clone();
        for method in ["tools/list", "resources/list", "resources/templates/list"] {
            let first = handler.dispatch(method, None).unwrap();
            let second = handler.dispatch(method, None).unwrap();
            let third = other.dispatch(method, None).unwrap();
            assert_eq!(first, second);
            assert_eq!(first, third);
        }
    }

    #[test]
    fn test_list_shapes() {
        let handler = handler();
        let tools = handler.dispatch("tools/list", None).unwrap();
        assert_eq!(tools["tools"][0]["name"], "zk-demo");
        assert_eq!(tools["tools"][0]["_meta"]["openai/widgetAccessible"], true);

        let resources = handler.dispatch("resources/list", None).unwrap();
        assert_eq!(resources["resources"][0]["mimeType"], "text/html+skybridge");

        let templates = handler.dispatch("resources/templates/list", None).unwrap();
        assert_eq!(
            templates["resourceTemplates"][0]["uriTemplate"],
            "ui://widget/zk.html"
        );
    }

    #[test]
    fn test_read_resource_ignores_uri_by_default() {
        let handler = handler();
        let result = handler.read_resource("ui://widget/other.html").unwrap();
        assert_eq!(result.contents.len(), 1);
        assert_eq!(result.contents[0].uri, "ui://widget/zk.html");
        assert_eq!(result.contents[0].text, "<div>widget</div>");
    }

    #[test]
    fn test_read_resource_strict_policy() {
        let handler = strict_handler();
        assert!(handler.read_resource("ui://widget/zk.html").is_ok());
        let err = handler.read_resource("ui://widget/other.html").unwrap_err();
        assert_eq!(err.code(), -32002);
    }

    #[test]
    fn test_handle_request_wraps_errors() {
        let handler = handler();
        let response = handler
            .handle_request(JsonRpcRequest::new(
                7,
                "tools/call",
                Some(json!({ "name": "zk-demo", "arguments": { "pizzaTopping": false } })),
            ))
            .unwrap();
        assert_eq!(response.id, Some(json!(7)));
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[test]
    fn test_unknown_method() {
        let handler = handler();
        let response = handler
            .handle_request(JsonRpcRequest::new(1, "prompts/list", None))
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_notifications_get_no_response() {
        let handler = handler();
        let notification = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(handler.handle_request(notification).is_none());

        let no_id = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "tools/list".to_string(),
            params: None,
        };
        assert!(handler.handle_request(no_id).is_none());
    }

    #[test]
    fn test_initialize_negotiates_version() {
        let handler = handler();
        let result = handler
            .dispatch("initialize", Some(json!({ "protocolVersion": "2024-11-05" })))
            .unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);

        let result = handler
            .dispatch("initialize", Some(json!({ "protocolVersion": "1999-01-01" })))
            .unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    }

    #[test]
    fn test_read_resource_requires_uri() {
        let handler = handler();
        let err = handler.dispatch("resources/read", Some(json!({}))).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParams(_)));
    }
}
