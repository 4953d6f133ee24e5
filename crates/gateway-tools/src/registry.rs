//! The tool → handler map and its [`ToolDispatcher`] implementation —
//! the seam `gateway-transport` calls into for every non-`initialize`
//! JSON-RPC method.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_transport::{BoxFuture, ToolDispatcher};
use serde_json::Value;

use crate::content::ToolResult;

/// Static metadata describing a registered tool, surfaced via `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// One tool's implementation: its descriptor plus the async call itself.
/// The handler owns the whole envelope — it calls the API client,
/// interprets the result, and returns an already content-built
/// [`ToolResult`]; dispatch failures (unknown tool, malformed call
/// request) are the registry's concern, not the handler's.
pub trait ToolHandler: Send + Sync {
    /// This tool's fixed descriptor.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool against `arguments` (the `tools/call` request's
    /// `arguments` field, absent for tools that take none).
    fn call<'a>(&'a self, arguments: Option<Value>) -> BoxFuture<'a, ToolResult>;
}

/// In-process map of tool name to handler, built once at startup.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// An empty registry; call [`Self::register`] to populate it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, keyed by its descriptor's name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.descriptor().name, handler);
    }

    fn list_result(&self) -> Value {
        let mut tools: Vec<&str> = self.handlers.keys().copied().collect();
        tools.sort_unstable();
        let tools: Vec<Value> = tools
            .into_iter()
            .map(|name| {
                let descriptor = self.handlers[name].descriptor();
                serde_json::json!({
                    "name": descriptor.name,
                    "description": descriptor.description,
                    "inputSchema": descriptor.input_schema,
                })
            })
            .collect();
        serde_json::json!({ "tools": tools })
    }

    async fn call(&self, params: Option<&Value>) -> Result<Value, String> {
        let params = params.ok_or_else(|| "tools/call requires params".to_string())?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "tools/call requires a string name".to_string())?;
        let arguments = params.get("arguments").cloned();

        let handler = self.handlers.get(name).ok_or_else(|| format!("unknown tool: {name}"))?;
        let result = handler.call(arguments).await;
        serde_json::to_value(result).map_err(|err| err.to_string())
    }
}

impl ToolDispatcher for ToolRegistry {
    fn dispatch<'a>(&'a self, method: &'a str, params: Option<&'a Value>) -> BoxFuture<'a, Result<Value, String>> {
        Box::pin(async move {
            match method {
                "tools/list" => Ok(self.list_result()),
                "tools/call" => self.call(params).await,
                other => Err(format!("method not found: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    impl ToolHandler for EchoTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: "echo",
                description: "echoes its argument",
                input_schema: serde_json::json!({ "type": "object" }),
            }
        }

        fn call<'a>(&'a self, arguments: Option<Value>) -> BoxFuture<'a, ToolResult> {
            Box::pin(async move {
                ToolResult::ok(format!("echoed {arguments:?}"), &serde_json::json!({ "tool": "echo" }))
            })
        }
    }

    fn registry_with_echo() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry
    }

    #[tokio::test]
    async fn tools_list_includes_registered_tool() {
        let registry = registry_with_echo();
        let result = registry.dispatch("tools/list", None).await.unwrap();
        assert_eq!(result["tools"][0]["name"], serde_json::json!("echo"));
    }

    #[tokio::test]
    async fn tools_call_dispatches_to_handler() {
        let registry = registry_with_echo();
        let params = serde_json::json!({ "name": "echo", "arguments": { "x": 1 } });
        let result = registry.dispatch("tools/call", Some(&params)).await.unwrap();
        assert!(result.get("isError").is_none());
        assert!(result["content"][0]["text"].as_str().unwrap().contains("echoed"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_dispatch_error() {
        let registry = registry_with_echo();
        let params = serde_json::json!({ "name": "does-not-exist" });
        let err = registry.dispatch("tools/call", Some(&params)).await.unwrap_err();
        assert!(err.contains("unknown tool"));
    }

    #[tokio::test]
    async fn unknown_method_is_a_dispatch_error() {
        let registry = registry_with_echo();
        let err = registry.dispatch("prompts/list", None).await.unwrap_err();
        assert!(err.contains("method not found"));
    }
}
