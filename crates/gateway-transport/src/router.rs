//! HTTP router: endpoint multiplexing, origin/auth admission for `/mcp`,
//! OAuth endpoints, and discovery/info documents.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use futures::stream::{self, Stream};
use futures::StreamExt as _;
use gateway_core::Config;
use gateway_oauth::{AuthorizeRequest, OAuthServer, TokenRequest};
use serde::Deserialize;
use serde_json::Value;

use crate::auth_gate::{self, Principal};
use crate::body::{self, DEFAULT_BODY_TIMEOUT, DEFAULT_MAX_BODY_BYTES};
use crate::dispatch::ToolDispatcher;
use crate::error::TransportError;
use crate::event_bus::EventBus;
use crate::jsonrpc::{self, JsonRpcPayload};
use crate::origin::check_origin;
use crate::sse::McpSseEvent;
use crate::transport::Transport;

/// Shared application state threaded through every route.
#[derive(Clone)]
pub struct GatewayState {
    /// Process configuration.
    pub config: Arc<Config>,
    /// OAuth 2.1 authorization server.
    pub oauth: Arc<OAuthServer>,
    /// Streamable HTTP transport (sessions + event filing).
    pub transport: Arc<Transport>,
    /// Shared event bus backing both transport filing and GET replay.
    pub events: Arc<EventBus>,
    /// Tool dispatch, implemented by `gateway-tools`.
    pub dispatcher: Arc<dyn ToolDispatcher>,
}

/// Build the complete `axum` router.
#[must_use]
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/mcp", post(post_mcp).get(get_mcp))
        .route("/auth", get(authorize))
        .route("/token", post(token))
        .route(
            "/.well-known/oauth-authorization-server",
            get(discovery_metadata),
        )
        .route("/info", get(info))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn post_mcp(State(state): State<GatewayState>, headers: HeaderMap, body: axum::body::Body) -> Response {
    let host = production_host(&state.config);
    if let Err(err) = check_origin(origin_header(&headers), state.config.production, host.as_deref()) {
        return transport_error_response(err, None);
    }

    let principal = match admit(&headers, &state) {
        Ok(p) => p,
        Err(err) => return transport_error_response(err, None),
    };

    let declared_len = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    let parsed = match body::read_bounded_json(body, declared_len, DEFAULT_MAX_BODY_BYTES, DEFAULT_BODY_TIMEOUT).await {
        Ok(value) => value,
        Err(err) => return transport_error_response(err, None),
    };

    let Some(value) = parsed else {
        return transport_error_response(TransportError::MalformedJson, None);
    };

    let payload: JsonRpcPayload = match serde_json::from_value(value) {
        Ok(p) => p,
        Err(_) => return transport_error_response(TransportError::MalformedJson, None),
    };

    let session_id = headers
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state.transport.handle_post(session_id, payload, state.dispatcher.as_ref()).await;

    let sse_stream = stream::iter(outcome.events.into_iter().map(|(id, data)| {
        Ok::<_, std::convert::Infallible>(McpSseEvent { id, data }.into_axum_event())
    }));

    let mut response = Sse::new(sse_stream).keep_alive(KeepAlive::default()).into_response();
    apply_principal_headers(&mut response, &principal);
    response
        .headers_mut()
        .insert("Mcp-Session-Id", outcome.session_id.parse().expect("uuid is valid header value"));
    response
}

#[derive(Debug, Deserialize)]
struct McpQuery {
    key: Option<String>,
    api_key: Option<String>,
}

async fn get_mcp(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<McpQuery>,
) -> Response {
    let host = production_host(&state.config);
    if let Err(err) = check_origin(origin_header(&headers), state.config.production, host.as_deref()) {
        return transport_error_response(err, None);
    }

    let principal = match admit_with_query(&headers, &query, &state) {
        Ok(p) => p,
        Err(err) => return transport_error_response(err, None),
    };

    let session_id = match headers.get("mcp-session-id").and_then(|v| v.to_str().ok()) {
        Some(id) => id.to_string(),
        None => return transport_error_response(TransportError::InvalidOrigin, None),
    };

    let mut replayed = Vec::new();
    if let Some(last_event_id) = headers.get("last-event-id").and_then(|v| v.to_str().ok()) {
        if let Err(_err) = state.events.replay_after(last_event_id, |id, msg| {
            replayed.push(McpSseEvent { id: id.to_string(), data: msg.clone() }.into_axum_event());
        }) {
            return transport_error_response(TransportError::UnknownEventId, None);
        }
    }

    let live = state.events.subscribe(&session_id);
    let drop_after = state.config.sse_drop_after;

    let live_stream = async_stream_from_broadcast(live, drop_after);

    let combined = stream::iter(replayed.into_iter().map(Ok::<_, std::convert::Infallible>)).chain(live_stream);

    let mut response = Sse::new(combined).keep_alive(KeepAlive::default()).into_response();
    apply_principal_headers(&mut response, &principal);
    response
}

fn async_stream_from_broadcast(
    mut rx: tokio::sync::broadcast::Receiver<crate::event_bus::LiveEvent>,
    drop_after: Duration,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    use tokio::sync::broadcast::error::RecvError;

    async_stream::stream! {
        if drop_after.is_zero() {
            loop {
                match rx.recv().await {
                    Ok(event) => yield Ok(McpSseEvent { id: event.id, data: event.data }.into_axum_event()),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                }
            }
        } else {
            // Diagnostic hook: force-close this connection after
            // `drop_after` to exercise client reconnection with
            // Last-Event-ID, per MCP_SSE_DROP_AFTER_MS.
            let sleep = tokio::time::sleep(drop_after);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    () = &mut sleep => break,
                    event = rx.recv() => {
                        match event {
                            Ok(event) => yield Ok(McpSseEvent { id: event.id, data: event.data }.into_axum_event()),
                            Err(RecvError::Closed) => break,
                            Err(RecvError::Lagged(_)) => continue,
                        }
                    }
                }
            }
        }
    }
}

fn admit(headers: &HeaderMap, state: &GatewayState) -> Result<Principal, TransportError> {
    let presented_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    auth_gate::admit(presented_key, state.config.pattern_api_key.as_deref(), bearer, &state.oauth)
}

fn admit_with_query(headers: &HeaderMap, query: &McpQuery, state: &GatewayState) -> Result<Principal, TransportError> {
    let header_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let presented_key = header_key.or(query.key.as_deref()).or(query.api_key.as_deref());
    let bearer = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    auth_gate::admit(presented_key, state.config.pattern_api_key.as_deref(), bearer, &state.oauth)
}

fn apply_principal_headers(response: &mut Response, principal: &Principal) {
    let headers = response.headers_mut();
    headers.insert(
        "MCP-Protocol-Version",
        gateway_core::PROTOCOL_VERSION.parse().expect("static header value"),
    );
    if let Principal::OAuth { client_id, scopes } = principal {
        if let Ok(value) = client_id.parse() {
            headers.insert("X-OAuth-Client-ID", value);
        }
        if let Ok(value) = scopes.join(" ").parse() {
            headers.insert("X-OAuth-Scopes", value);
        }
    }
}

fn origin_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(http::header::ORIGIN).and_then(|v| v.to_str().ok())
}

fn production_host(config: &Config) -> Option<String> {
    if !config.production {
        return None;
    }
    url::Url::parse(&config.public_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn transport_error_response(err: TransportError, id: Option<Value>) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = jsonrpc::error_response(id, err.rpc_code(), err.to_string(), None);
    let mut response = (status, Json(body)).into_response();

    if matches!(err, TransportError::Unauthorized) {
        response.headers_mut().insert(
            http::header::WWW_AUTHENTICATE,
            "Bearer realm=\"MCP Server\", error=\"invalid_token\""
                .parse()
                .expect("static header value"),
        );
    }

    response
}

#[derive(Debug, Deserialize)]
struct AuthorizeQuery {
    response_type: String,
    client_id: String,
    redirect_uri: String,
    code_challenge: String,
    #[serde(default)]
    code_challenge_method: Option<String>,
    scope: Option<String>,
    state: Option<String>,
}

async fn authorize(State(state): State<GatewayState>, Query(query): Query<AuthorizeQuery>) -> Response {
    let redirect = state.oauth.authorize(AuthorizeRequest {
        response_type: query.response_type,
        client_id: query.client_id,
        redirect_uri: query.redirect_uri,
        code_challenge: query.code_challenge,
        code_challenge_method: query.code_challenge_method.unwrap_or_default(),
        scope: query.scope,
        state: query.state,
    });
    Redirect::to(&redirect.location).into_response()
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    grant_type: String,
    code: Option<String>,
    redirect_uri: Option<String>,
    client_id: Option<String>,
    code_verifier: Option<String>,
    refresh_token: Option<String>,
    client_secret: Option<String>,
}

async fn token(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<TokenForm>,
) -> Response {
    let client_secret = form.client_secret.or_else(|| basic_auth_secret(&headers));

    match state.oauth.token(TokenRequest {
        grant_type: form.grant_type,
        code: form.code,
        redirect_uri: form.redirect_uri,
        client_id: form.client_id,
        code_verifier: form.code_verifier,
        refresh_token: form.refresh_token,
        client_secret,
    }) {
        Ok(response) => Json(response).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": err.code() }))).into_response(),
    }
}

fn basic_auth_secret(headers: &HeaderMap) -> Option<String> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let header = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    text.split_once(':').map(|(_, secret)| secret.to_string())
}

async fn discovery_metadata(State(state): State<GatewayState>) -> Response {
    let authorize_url = format!("{}/auth", state.config.public_url);
    let token_url = format!("{}/token", state.config.public_url);
    let metadata = state.oauth.discovery_metadata(&authorize_url, &token_url);
    let mut response = Json(metadata).into_response();
    response.headers_mut().insert(
        http::header::CACHE_CONTROL,
        "public, max-age=3600".parse().expect("static header value"),
    );
    response
}

async fn info(State(state): State<GatewayState>) -> Response {
    let mut response = Json(serde_json::json!({
        "name": "effect-patterns-mcp-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": gateway_core::PROTOCOL_VERSION,
        "publicUrl": state.config.public_url,
    }))
    .into_response();
    response.headers_mut().insert(
        http::header::CACHE_CONTROL,
        "public, max-age=3600".parse().expect("static header value"),
    );
    response
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not found",
            "availableEndpoints": ["/mcp", "/auth", "/token", "/.well-known/oauth-authorization-server", "/info"],
        })),
    )
        .into_response()
}
