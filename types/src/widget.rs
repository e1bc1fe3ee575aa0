//! Widget record and the metadata block attached to everything derived from it.

use serde::{Deserialize, Serialize};

/// A named bundle of static HTML plus the strings a client shows around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    /// Identifier, also used as the tool name.
    pub id: String,
    /// Human readable title.
    pub title: String,
    /// URI of the output template resource (`ui://...`).
    pub template_uri: String,
    /// Status text while the tool is running.
    pub invoking: String,
    /// Status text once the tool has run.
    pub invoked: String,
    /// Rendered HTML payload.
    pub html: String,
    /// Text returned as the plain-text tool result.
    pub response_text: String,
}

impl Widget {
    /// Build the metadata block for this widget.
    pub fn meta(&self) -> WidgetMeta {
        WidgetMeta {
            output_template: self.template_uri.clone(),
            invoking: self.invoking.clone(),
            invoked: self.invoked.clone(),
            widget_accessible: true,
            result_can_produce_widget: true,
        }
    }
}

/// Metadata identifying the output template and invocation status strings.
///
/// Serialized as the `_meta` object on tools, resources, resource templates,
/// resource contents and tool-call results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetMeta {
    #[serde(rename = "openai/outputTemplate")]
    pub output_template: String,
    #[serde(rename = "openai/toolInvocation/invoking")]
    pub invoking: String,
    #[serde(rename = "openai/toolInvocation/invoked")]
    pub invoked: String,
    #[serde(rename = "openai/widgetAccessible")]
    pub widget_accessible: bool,
    #[serde(rename = "openai/resultCanProduceWidget")]
    pub result_can_produce_widget: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget() -> Widget {
        Widget {
            id: "w".to_string(),
            title: "W".to_string(),
            template_uri: "ui://widget/w.html".to_string(),
            invoking: "going".to_string(),
            invoked: "gone".to_string(),
            html: "<div></div>".to_string(),
            response_text: "ok".to_string(),
        }
    }

    #[test]
    fn test_meta_uses_openai_keys() {
        let meta = serde_json::to_value(widget().meta()).unwrap();
        assert_eq!(
            meta,
            json!({
                "openai/outputTemplate": "ui://widget/w.html",
                "openai/toolInvocation/invoking": "going",
                "openai/toolInvocation/invoked": "gone",
                "openai/widgetAccessible": true,
                "openai/resultCanProduceWidget": true
            })
        );
    }
}
