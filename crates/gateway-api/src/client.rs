//! Pooled HTTPS client for the upstream patterns API.
//!
//! One [`reqwest::Client`] is built at startup and shared by every call;
//! it owns its own connection pool (separate effective pools per scheme
//! fall out of `reqwest`'s own host-keyed pooling, configured here with
//! the keep-alive and idle-socket limits below).

use std::time::Duration;

use serde_json::Value;

use crate::dedup::{
    is_cacheable_pattern_endpoint, new_pattern_cache, pattern_cache_ttl_ms, DedupMap,
};
use crate::error::{ApiError, ApiResult};
use gateway_core::{BoundedCache, Config, PROTOCOL_VERSION};

/// HTTP method used for an upstream call; the gateway only ever needs these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET` — eligible for dedup and caching.
    Get,
    /// `POST` — never deduped or cached.
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_IDLE_PER_HOST: usize = 10;
const MAX_SOCKETS: usize = 50;

/// Pooled, deduped, cached client for the upstream patterns API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    pattern_cache: std::sync::Arc<BoundedCache<String, Value>>,
    dedup: DedupMap,
}

impl ApiClient {
    /// Build a client from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` fails to build
    /// (invalid TLS configuration, for instance).
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(SOCKET_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(SOCKET_TIMEOUT)
            // reqwest pools per-host rather than the Node-style dedicated
            // http/https agents; `MAX_SOCKETS` documents the intended cap
            // even though reqwest doesn't expose a single hard cap knob.
            .build()?;

        Ok(Self {
            http,
            base_url: config.upstream_api_url.trim_end_matches('/').to_string(),
            api_key: config.pattern_api_key.clone(),
            pattern_cache: new_pattern_cache(),
            dedup: DedupMap::new(),
        })
    }

    /// Invoke the upstream API. `endpoint` is the path after `/api`, e.g.
    /// `/patterns/search`.
    pub async fn call(&self, endpoint: &str, method: Method, body: Option<Value>) -> ApiResult<Value> {
        let cache_key = format!(
            "{}:{}:{}",
            method.as_str(),
            endpoint,
            body.as_ref().map(Value::to_string).unwrap_or_default()
        );

        if method == Method::Get && is_cacheable_pattern_endpoint(endpoint) {
            if let Some(cached) = self.pattern_cache.get(&cache_key) {
                tracing::debug!(endpoint, "pattern cache hit");
                return Ok(cached);
            }
        }

        let result = if method == Method::Get {
            self.call_deduped(&cache_key, endpoint, method, body).await
        } else {
            self.fetch(endpoint, method, body).await
        };

        if let Ok(ref value) = result {
            if method == Method::Get && is_cacheable_pattern_endpoint(endpoint) {
                let ttl = pattern_cache_ttl_ms(endpoint);
                self.pattern_cache.set(cache_key, value.clone(), ttl);
            }
        }

        result
    }

    async fn call_deduped(
        &self,
        cache_key: &str,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let endpoint = endpoint.to_string();
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let api_key = self.api_key.clone();

        let shared = self.dedup.call_or_insert(cache_key, move || {
            Box::pin(async move { fetch_once(&http, &base_url, api_key.as_deref(), &endpoint, method, body).await })
        });

        shared.await
    }

    async fn fetch(&self, endpoint: &str, method: Method, body: Option<Value>) -> ApiResult<Value> {
        fetch_once(&self.http, &self.base_url, self.api_key.as_deref(), endpoint, method, body).await
    }
}

async fn fetch_once(
    http: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
    endpoint: &str,
    method: Method,
    body: Option<Value>,
) -> ApiResult<Value> {
    let url = format!("{base_url}/api{endpoint}");

    let mut request = match method {
        Method::Get => http.get(&url),
        Method::Post => http.post(&url),
    };

    request = request
        .header("Content-Type", "application/json")
        .header("MCP-Protocol-Version", PROTOCOL_VERSION);

    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }

    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(endpoint, error = %err, "upstream call failed");
            return Err(ApiError::from_reqwest(&err));
        }
    };

    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(ApiError::from_status(status.as_u16(), text));
    }

    let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    // `data`-unwrapping: a response shaped `{ "data": ... }` unwraps to
    // that inner value; anything else (including a legitimate top-level
    // `data` field that doesn't mean "envelope") passes through whole.
    // Ambiguous for endpoints where `data` is a real field rather than
    // an envelope marker, but matches upstream's actual behavior.
    Ok(match parsed {
        Value::Object(ref map) if map.contains_key("data") => map["data"].clone(),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str) -> Config {
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
            event_store: gateway_core::config::EventStoreConfig {
                max_events: 10,
                ttl: Duration::from_secs(60),
            },
            sse_drop_after: Duration::from_secs(0),
            debug: false,
        }
    }

    #[tokio::test]
    async fn unwraps_top_level_data_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patterns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "patterns": [] }
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(&server.uri())).unwrap();
        let result = client.call("/patterns", Method::Get, None).await.unwrap();
        assert_eq!(result, serde_json::json!({ "patterns": [] }));
    }

    #[tokio::test]
    async fn non_2xx_becomes_api_error_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patterns/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(&server.uri())).unwrap();
        let err = client
            .call("/patterns/missing", Method::Get, None)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(404));
    }

    #[tokio::test]
    async fn repeated_get_is_served_from_pattern_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patterns/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "p1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(&server.uri())).unwrap();
        let first = client.call("/patterns/p1", Method::Get, None).await.unwrap();
        let second = client.call("/patterns/p1", Method::Get, None).await.unwrap();
        assert_eq!(first, second);
    }
}
