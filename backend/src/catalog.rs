//! Widget catalog.
//!
//! The server publishes exactly one widget. Its tool, resource and resource
//! template descriptors are derived once from the widget record and shared
//! read-only by every session.

use pizzaz_types::{
    Content, Resource, ResourceContents, ResourceTemplate, Tool, Widget, WidgetMeta,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// MIME type under which the widget HTML is served.
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

const WIDGET_ID: &str = "zk-demo";
const WIDGET_TITLE: &str = "uesZkDemo";
const WIDGET_TEMPLATE_URI: &str = "ui://widget/zk.html";
const WIDGET_INVOKING: &str = "zk invoking";
const WIDGET_INVOKED: &str = "zk invoked";
const WIDGET_RESPONSE_TEXT: &str = "help!";

/// Immutable set of descriptors derived from the widget.
#[derive(Debug, Clone)]
pub struct Catalog {
    widget: Widget,
    meta: WidgetMeta,
    tool: Tool,
    resource: Resource,
    resource_template: ResourceTemplate,
}

impl Catalog {
    /// Derive every descriptor from a widget record.
    pub fn new(widget: Widget) -> Self {
        let meta = widget.meta();

        let tool = Tool {
            name: widget.id.clone(),
            description: widget.title.clone(),
            input_schema: tool_input_schema(),
            title: widget.title.clone(),
            meta: meta.clone(),
        };

        let resource = Resource {
            uri: widget.template_uri.clone(),
            name: widget.title.clone(),
            description: "demo -- resources".to_string(),
            mime_type: WIDGET_MIME_TYPE.to_string(),
            meta: meta.clone(),
        };

        let resource_template = ResourceTemplate {
            uri_template: widget.template_uri.clone(),
            name: widget.title.clone(),
            description: "demo -- resources template".to_string(),
            mime_type: WIDGET_MIME_TYPE.to_string(),
            meta: meta.clone(),
        };

        Self {
            widget,
            meta,
            tool,
            resource,
            resource_template,
        }
    }

    /// Build the catalog for the demo widget around the given HTML.
    pub fn with_html(html: impl Into<String>) -> Self {
        Self::new(Widget {
            id: WIDGET_ID.to_string(),
            title: WIDGET_TITLE.to_string(),
            template_uri: WIDGET_TEMPLATE_URI.to_string(),
            invoking: WIDGET_INVOKING.to_string(),
            invoked: WIDGET_INVOKED.to_string(),
            html: html.into(),
            response_text: WIDGET_RESPONSE_TEXT.to_string(),
        })
    }

    /// Read the widget HTML from disk and build the catalog.
    pub fn load(html_path: &Path) -> anyhow::Result<Self> {
        let html = std::fs::read_to_string(html_path).map_err(|e| {
            anyhow::anyhow!("Failed to read widget HTML {}: {}", html_path.display(), e)
        })?;
        info!(
            "Loaded widget HTML from {} ({} bytes)",
            html_path.display(),
            html.len()
        );
        Ok(Self::with_html(html))
    }

    pub fn widget(&self) -> &Widget {
        &self.widget
    }

    pub fn meta(&self) -> &WidgetMeta {
        &self.meta
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn resource_template(&self) -> &ResourceTemplate {
        &self.resource_template
    }

    /// Contents of the widget resource.
    pub fn contents(&self) -> ResourceContents {
        ResourceContents {
            uri: self.widget.template_uri.clone(),
            mime_type: WIDGET_MIME_TYPE.to_string(),
            text: self.widget.html.clone(),
            meta: self.meta.clone(),
        }
    }

    /// Plain-text content echoed by every successful tool call.
    pub fn response_content(&self) -> Content {
        Content::Text {
            text: self.widget.response_text.clone(),
        }
    }
}

/// JSON Schema for [`pizzaz_types::PizzaToppingArgs`].
fn tool_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "pizzaTopping": {
                "type": "string",
                "description": "Topping to mention when rendering the widget."
            }
        },
        "required": ["pizzaTopping"],
        "additionalProperties": false
    })
}
