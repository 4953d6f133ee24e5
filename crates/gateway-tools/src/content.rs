//! Wire shapes for a tool call's result: a list of content blocks plus an
//! `isError` flag, per the MCP `tools/call` result envelope.

use serde::Serialize;
use serde_json::Value;

/// One block of a tool result's `content` array. Every block this
/// gateway emits is a `text` block; a JSON metadata block is just JSON
/// serialized into `text` rather than using a distinct MCP content type.
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ContentBlock {
    /// A Markdown prose block.
    #[must_use]
    pub fn markdown(text: String) -> Self {
        Self { kind: "text", text }
    }

    /// A JSON metadata block, pretty-printed so it reads as a block in
    /// its own right rather than a minified tail.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self {
            kind: "text",
            text: serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        }
    }
}

/// The full result of a `tools/call` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ToolResult {
    /// Build a successful result from a Markdown body and a metadata value.
    #[must_use]
    pub fn ok(markdown: String, metadata: &Value) -> Self {
        Self {
            content: vec![ContentBlock::markdown(markdown), ContentBlock::json(metadata)],
            is_error: false,
        }
    }

    /// Build an error result: a single explanatory Markdown block, no
    /// metadata block (there's nothing to report execution stats on).
    #[must_use]
    pub fn error(markdown: String) -> Self {
        Self {
            content: vec![ContentBlock::markdown(markdown)],
            is_error: true,
        }
    }
}
