//! `search_patterns`: query the upstream patterns API and render the
//! top matches as Markdown cards plus search metadata.

use std::sync::Arc;
use std::time::Instant;

use gateway_api::{ApiClient, Method};
use gateway_transport::BoxFuture;
use serde_json::Value;

use crate::content::ToolResult;
use crate::content_builder::{cards_shown, divider, heading, render_pattern_cards};
use crate::registry::{ToolDescriptor, ToolHandler};
use gateway_core::urlencode;

/// Finds Effect patterns matching a free-text query, optionally scoped
/// to a category.
pub struct SearchPatternsTool {
    api: Arc<ApiClient>,
}

impl SearchPatternsTool {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl ToolHandler for SearchPatternsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "search_patterns",
            description: "Search the Effect patterns library by free-text query, optionally scoped to a category",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "category": { "type": "string" },
                },
                "required": ["query"],
            }),
        }
    }

    fn call<'a>(&'a self, arguments: Option<Value>) -> BoxFuture<'a, ToolResult> {
        Box::pin(async move {
            let start = Instant::now();

            let Some(query) = arguments.as_ref().and_then(|a| a.get("query")).and_then(Value::as_str) else {
                return ToolResult::error(format!(
                    "{}A `query` string argument is required.\n\nRelated tools: `get_pattern`.",
                    heading(2, "search_patterns: missing argument")
                ));
            };
            let category = arguments.as_ref().and_then(|a| a.get("category")).and_then(Value::as_str);

            let mut endpoint = format!("/patterns?search={}", urlencode(query));
            if let Some(category) = category {
                endpoint.push_str(&format!("&category={}", urlencode(category)));
            }

            match self.api.call(&endpoint, Method::Get, None).await {
                Ok(body) => {
                    let patterns = body.get("patterns").and_then(Value::as_array).cloned().unwrap_or_default();
                    let cards: Vec<(String, String)> = patterns
                        .iter()
                        .map(|p| {
                            let name = p.get("name").and_then(Value::as_str).unwrap_or("untitled").to_string();
                            let summary = p.get("summary").and_then(Value::as_str).unwrap_or("").to_string();
                            (name, summary)
                        })
                        .collect();

                    let mut markdown = heading(2, &format!("Patterns matching \"{query}\""));
                    markdown.push_str(&render_pattern_cards(&cards));
                    markdown.push_str(&divider());

                    let metadata = serde_json::json!({
                        "executionTimeMs": start.elapsed().as_millis(),
                        "totalMatches": patterns.len(),
                        "shown": cards_shown(patterns.len()),
                        "relatedTools": ["get_pattern", "analyze_code"],
                    });

                    ToolResult::ok(markdown, &metadata)
                }
                Err(err) => ToolResult::error(format!(
                    "{}Could not reach the patterns API: {err}.\n\nTry again, or use `get_pattern` if you already know the pattern id.",
                    heading(2, "search_patterns failed")
                )),
            }
        })
    }
}
