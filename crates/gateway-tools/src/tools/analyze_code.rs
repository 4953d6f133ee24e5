//! `analyze_code`: submit a code snippet to the upstream analyzer and
//! render its findings grouped by severity.

use std::sync::Arc;
use std::time::Instant;

use gateway_api::{ApiClient, Method};
use gateway_transport::BoxFuture;
use serde_json::Value;

use crate::content::ToolResult;
use crate::content_builder::{code_block, divider, heading, render_findings_by_severity, severity_breakdown, Finding};
use crate::registry::{ToolDescriptor, ToolHandler};

/// Submits a code snippet for analysis against the Effect patterns
/// knowledge base and reports any findings.
pub struct AnalyzeCodeTool {
    api: Arc<ApiClient>,
}

impl AnalyzeCodeTool {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl ToolHandler for AnalyzeCodeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "analyze_code",
            description: "Analyze a code snippet against known Effect patterns and report issues by severity",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "language": { "type": "string" },
                },
                "required": ["code"],
            }),
        }
    }

    fn call<'a>(&'a self, arguments: Option<Value>) -> BoxFuture<'a, ToolResult> {
        Box::pin(async move {
            let start = Instant::now();

            let Some(code) = arguments.as_ref().and_then(|a| a.get("code")).and_then(Value::as_str) else {
                return ToolResult::error(format!(
                    "{}A `code` string argument is required.\n\nRelated tools: `search_patterns`.",
                    heading(2, "analyze_code: missing argument")
                ));
            };
            let language = arguments.as_ref().and_then(|a| a.get("language")).and_then(Value::as_str).unwrap_or("typescript");

            let body = serde_json::json!({ "code": code, "language": language });

            match self.api.call("/analyze", Method::Post, Some(body)).await {
                Ok(response) => {
                    let findings: Vec<Finding> = response
                        .get("findings")
                        .and_then(Value::as_array)
                        .map(|arr| {
                            arr.iter()
                                .map(|f| Finding {
                                    severity: f.get("severity").and_then(Value::as_str).unwrap_or("low").to_string(),
                                    title: f.get("title").and_then(Value::as_str).unwrap_or("finding").to_string(),
                                    detail: f.get("detail").and_then(Value::as_str).unwrap_or("").to_string(),
                                })
                                .collect()
                        })
                        .unwrap_or_default();

                    let mut markdown = heading(2, "Analysis");
                    markdown.push_str(&code_block(language, code));
                    if findings.is_empty() {
                        markdown.push_str("\nNo issues found against known patterns.\n");
                    } else {
                        markdown.push_str(&render_findings_by_severity(&findings));
                    }
                    markdown.push_str(&divider());

                    let metadata = serde_json::json!({
                        "executionTimeMs": start.elapsed().as_millis(),
                        "findingCount": findings.len(),
                        "severityBreakdown": severity_breakdown(&findings),
                        "relatedTools": ["search_patterns", "get_pattern"],
                    });

                    ToolResult::ok(markdown, &metadata)
                }
                Err(err) => ToolResult::error(format!(
                    "{}Could not analyze code: {err}.\n\nTry again, or use `search_patterns` to browse manually.",
                    heading(2, "analyze_code failed")
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
    async fn renders_findings_grouped_by_severity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "findings": [
                    { "severity": "high", "title": "unhandled rejection", "detail": "missing catchAll" },
                    { "severity": "low", "title": "naming", "detail": "prefer camelCase" },
                ]
            })))
            .mount(&server)
            .await;

        let tool = AnalyzeCodeTool::new(Arc::new(ApiClient::new(&config(&server.uri())).unwrap()));
        let result = tool.call(Some(serde_json::json!({ "code": "const x = 1" }))).await;
        assert!(!result.is_error);
        let text = &result.content[0].text;
        assert!(text.find("High").unwrap() < text.find("Low").unwrap());
    }

    #[tokio::test]
    async fn no_findings_reports_clean() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "findings": [] })))
            .mount(&server)
            .await;

        let tool = AnalyzeCodeTool::new(Arc::new(ApiClient::new(&config(&server.uri())).unwrap()));
        let result = tool.call(Some(serde_json::json!({ "code": "const x = 1" }))).await;
        assert!(result.content[0].text.contains("No issues found"));
    }
}
