//! `get_pattern`: fetch a single pattern's detail by id and render its
//! full write-up including a truncated code example.

use std::sync::Arc;
use std::time::Instant;

use gateway_api::{ApiClient, Method};
use gateway_transport::BoxFuture;
use serde_json::Value;

use crate::content::ToolResult;
use crate::content_builder::{code_block, heading};
use crate::registry::{ToolDescriptor, ToolHandler};
use gateway_core::urlencode;

/// Fetches one pattern's full detail by id.
pub struct GetPatternTool {
    api: Arc<ApiClient>,
}

impl GetPatternTool {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl ToolHandler for GetPatternTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_pattern",
            description: "Fetch the full detail (description, code example, related patterns) for one pattern id",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "id": { "type": "string" } },
                "required": ["id"],
            }),
        }
    }

    fn call<'a>(&'a self, arguments: Option<Value>) -> BoxFuture<'a, ToolResult> {
        Box::pin(async move {
            let start = Instant::now();

            let Some(id) = arguments.as_ref().and_then(|a| a.get("id")).and_then(Value::as_str) else {
                return ToolResult::error(format!(
                    "{}An `id` string argument is required.\n\nRelated tools: `search_patterns`.",
                    heading(2, "get_pattern: missing argument")
                ));
            };

            let endpoint = format!("/patterns/{}", urlencode(id));

            match self.api.call(&endpoint, Method::Get, None).await {
                Ok(body) => {
                    let name = body.get("name").and_then(Value::as_str).unwrap_or(id);
                    let description = body.get("description").and_then(Value::as_str).unwrap_or("");
                    let language = body.get("language").and_then(Value::as_str).unwrap_or("typescript");
                    let example = body.get("example").and_then(Value::as_str).unwrap_or("");

                    let mut markdown = heading(2, name);
                    markdown.push_str(description);
                    markdown.push('\n');
                    if !example.is_empty() {
                        markdown.push_str(&heading(3, "Example"));
                        markdown.push_str(&code_block(language, example));
                    }

                    let metadata = serde_json::json!({
                        "executionTimeMs": start.elapsed().as_millis(),
                        "patternId": id,
                        "relatedTools": ["search_patterns", "analyze_code"],
                    });

                    ToolResult::ok(markdown, &metadata)
                }
                Err(err) if err.status == Some(404) => ToolResult::error(format!(
                    "{}No pattern with id `{id}` exists.\n\nTry `search_patterns` to find the right id.",
                    heading(2, "get_pattern: not found")
                )),
                Err(err) => ToolResult::error(format!(
                    "{}Could not reach the patterns API: {err}.",
                    heading(2, "get_pattern failed")
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::Config;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> Config {
        Config {
            upstream_api_url: base.to_string(),
            pattern_api_key: None,
            port: 0,
            public_url: String::new(),
            production: false,
            oauth: gateway_core::OAuthConfig {
                client_id: "c".into(),
                client_secret: None,
                token_auth_method: gateway_core::TokenAuthMethod::None,
                max_sessions: 10,
                max_auth_codes: 10,
                cleanup_interval: Duration::from_secs(60),
                supported_scopes: vec!["mcp:access".into()],
                require_consent: false,
            },
            event_store: gateway_core::config::EventStoreConfig { max_events: 10, ttl: Duration::from_secs(60) },
            sse_drop_after: Duration::from_secs(0),
            debug: false,
        }
    }

    #[tokio::test]
    async fn renders_pattern_detail_with_example() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patterns/retry-with-backoff"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Retry With Backoff",
                "description": "Retries a failing effect.",
                "language": "typescript",
                "example": "Effect.retry(schedule)",
            })))
            .mount(&server)
            .await;

        let tool = GetPatternTool::new(Arc::new(ApiClient::new(&config(&server.uri())).unwrap()));
        let result = tool.call(Some(serde_json::json!({ "id": "retry-with-backoff" }))).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("Retry With Backoff"));
        assert!(result.content[0].text.contains("Effect.retry"));
    }

    #[tokio::test]
    async fn unknown_id_surfaces_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patterns/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let tool = GetPatternTool::new(Arc::new(ApiClient::new(&config(&server.uri())).unwrap()));
        let result = tool.call(Some(serde_json::json!({ "id": "missing" }))).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("No pattern"));
    }
}
