//! Tool registry and content-builder envelope: turns a JSON-RPC
//! `tools/call` into an upstream API fetch and a Markdown + JSON content
//! response, and `tools/list` into the registered descriptors.

pub mod content;
pub mod content_builder;
pub mod registry;
mod tools;

pub use content::{ContentBlock, ToolResult};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use tools::{AnalyzeCodeTool, GetPatternTool, SearchPatternsTool};

use std::sync::Arc;

use gateway_api::ApiClient;

/// Build the registry this gateway ships: the three representative
/// tools, wired against one shared API client.
#[must_use]
pub fn default_registry(api: Arc<ApiClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchPatternsTool::new(Arc::clone(&api))));
    registry.register(Arc::new(GetPatternTool::new(Arc::clone(&api))));
    registry.register(Arc::new(AnalyzeCodeTool::new(api)));
    registry
}
