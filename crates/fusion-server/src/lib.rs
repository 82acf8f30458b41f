//! Process wiring and MCP transport for the patent fusion engine
//! (SPEC_FULL.md §10.3).
//!
//! `build_server` registers every tool from spec.md §6 onto a fastmcp
//! [`Server`]; `run_stdio`/`run_http` drive it over the two transports the
//! teacher's server supports. This crate keeps the teacher's stdio/HTTP
//! shape but drops everything that was specific to the mail domain: no
//! TUI, dashboard, mail UI, rate limiter, or JWT/JWKS machinery. HTTP auth
//! is a single static bearer token, matching spec.md's scope for the tool
//! transport.

#![forbid(unsafe_code)]

pub mod startup_checks;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use asupersync::http::h1::listener::Http1Listener;
use asupersync::http::h1::types::{
    Method as Http1Method, Request as Http1Request, Response as Http1Response, default_reason,
};
use asupersync::runtime::RuntimeBuilder;
use asupersync::time::wall_now;
use asupersync::{Budget, Cx};
use fastmcp::prelude::*;
use fastmcp_core::{McpError, McpErrorCode, SessionState};
use fastmcp_protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use fastmcp_server::Session;
use fastmcp_transport::http::{
    HttpError, HttpHandlerConfig, HttpMethod as McpHttpMethod, HttpRequest, HttpRequestHandler,
    HttpResponse, HttpStatus,
};
use fusion_core::Config;
use fusion_engine::Engine;
use fusion_tools::{
    GetProvenance, GetPublication, GetSnippets, PeekSnippets, RegisterRepresentatives,
    RrfBlendFrontier, RrfMutateRun, RrfSearchFulltextRaw, RrfSearchSemanticRaw,
    RunMultilaneSearch, SearchFulltext, SearchSemantic,
};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// How long a single `tools/call` may run before its [`Budget`] expires.
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Initialize `tracing` from [`Config::log_level`]/[`Config::log_json`],
/// matching the teacher's `EnvFilter`-driven setup (SPEC_FULL.md §10.2).
pub fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.log_json { subscriber.json().try_init() } else { subscriber.try_init() };
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}

/// Register every tool named in spec.md §6 onto a fresh [`Server`].
///
/// `engine` is accepted (rather than built inline) so the caller controls
/// when the process-wide engine singleton is constructed and can fail
/// startup before the listener binds; the tool handlers themselves reach
/// it through [`fusion_tools::bootstrap::engine`].
#[must_use]
pub fn build_server(config: &Config, engine: &Arc<Engine>) -> Server {
    tracing::info!(host = %config.mcp_host, port = config.mcp_port, "engine ready, registering tools");
    let _ = engine;

    Server::new("fusion-rs", env!("CARGO_PKG_VERSION"))
        .tool(SearchFulltext)
        .tool(SearchSemantic)
        .tool(RrfSearchFulltextRaw)
        .tool(RrfSearchSemanticRaw)
        .tool(RunMultilaneSearch)
        .tool(RrfBlendFrontier)
        .tool(RrfMutateRun)
        .tool(PeekSnippets)
        .tool(GetSnippets)
        .tool(GetPublication)
        .tool(GetProvenance)
        .tool(RegisterRepresentatives)
        .build()
}

/// Serve over stdio. Does not return.
pub fn run_stdio(config: &Config) {
    init_tracing(config);

    let probe_report = startup_checks::run_startup_probes_stdio(config);
    if !probe_report.is_ok() {
        tracing::error!("{}", probe_report.format_errors());
        return;
    }

    let engine = fusion_tools::bootstrap::engine();
    build_server(config, &engine).run_stdio();
}

/// Serve JSON-RPC-over-HTTP with a bearer-token gate.
pub fn run_http(config: &Config) -> std::io::Result<()> {
    init_tracing(config);

    let probe_report = startup_checks::run_startup_probes(config);
    if !probe_report.is_ok() {
        return Err(std::io::Error::other(probe_report.format_errors()));
    }

    let engine = fusion_tools::bootstrap::engine();
    let server = build_server(config, &engine);
    let server_info = server.info().clone();
    let server_capabilities = server.capabilities().clone();
    let router = Arc::new(server.into_router());

    let addr = format!("{}:{}", config.mcp_host, config.mcp_port);
    let state = Arc::new(HttpState::new(router, server_info, server_capabilities, config.clone()));

    let runtime = RuntimeBuilder::new().build().map_err(|e| map_asupersync_err(&e))?;
    let handle = runtime.handle();
    runtime.block_on(async move {
        let handler_state = Arc::clone(&state);
        let listener = Http1Listener::bind(addr, move |req| {
            let inner = Arc::clone(&handler_state);
            async move { inner.handle(req).await }
        })
        .await?;
        listener.run(&handle).await?;
        Ok::<(), std::io::Error>(())
    })
}

fn map_asupersync_err(err: &asupersync::Error) -> std::io::Error {
    std::io::Error::other(format!("asupersync error: {err}"))
}

struct HttpState {
    router: Arc<fastmcp_server::Router>,
    server_info: fastmcp_protocol::ServerInfo,
    server_capabilities: fastmcp_protocol::ServerCapabilities,
    config: Config,
    handler: Arc<HttpRequestHandler>,
}

impl HttpState {
    fn new(
        router: Arc<fastmcp_server::Router>,
        server_info: fastmcp_protocol::ServerInfo,
        server_capabilities: fastmcp_protocol::ServerCapabilities,
        config: Config,
    ) -> Self {
        let handler = Arc::new(HttpRequestHandler::with_config(HttpHandlerConfig {
            base_path: "/".to_string(),
            allow_cors: false,
            cors_origins: Vec::new(),
            timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
        }));
        Self { router, server_info, server_capabilities, config, handler }
    }

    #[allow(clippy::unused_async)]
    async fn handle(&self, req: Http1Request) -> Http1Response {
        let start = Instant::now();
        let method = req.method.clone();
        let (path, _query) = split_path_query(&req.uri);
        let resp = self.handle_inner(req).await;
        tracing::info!(
            method = ?method,
            path = %path,
            status = resp.status,
            took_ms = start.elapsed().as_millis() as u64,
            "http request"
        );
        resp
    }

    async fn handle_inner(&self, req: Http1Request) -> Http1Response {
        let (path, _query) = split_path_query(&req.uri);

        if path == "/health" || path == "/healthz" {
            if !matches!(req.method, Http1Method::Get) {
                return self.error_response(405, "Method Not Allowed");
            }
            return self.json_response(200, &serde_json::json!({"status": "ok"}));
        }

        if let Some(resp) = self.check_bearer_auth(&req) {
            return resp;
        }

        if !matches!(req.method, Http1Method::Post) {
            return self.error_response(405, "Method Not Allowed");
        }

        let http_req = to_mcp_http_request(&req, &path);
        let json_rpc = match self.handler.parse_request(&http_req) {
            Ok(req) => req,
            Err(err) => {
                let status = http_error_status(&err);
                let resp = self.handler.error_response(status, &err.to_string());
                return to_http1_response(resp);
            }
        };

        let response = self
            .dispatch(json_rpc)
            .map_or_else(|| HttpResponse::new(HttpStatus::ACCEPTED), |resp| HttpResponse::ok().with_json(&resp));
        to_http1_response(response)
    }

    fn has_expected_bearer_header(&self, req: &Http1Request) -> bool {
        let Some(expected) = &self.config.mcp_auth_token else {
            return false;
        };
        let auth = header_value(req, "authorization").unwrap_or("");
        let expected_header = format!("Bearer {expected}");
        constant_time_eq(auth, &expected_header)
    }

    fn check_bearer_auth(&self, req: &Http1Request) -> Option<Http1Response> {
        self.config.mcp_auth_token.as_ref()?;
        if self.has_expected_bearer_header(req) {
            return None;
        }
        Some(self.error_response(401, "Unauthorized"))
    }

    fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        match self.dispatch_inner(request) {
            Ok(value) => id.map(|req_id| JsonRpcResponse::success(req_id, value)),
            Err(err) => id.map(|req_id| JsonRpcResponse::error(Some(req_id), JsonRpcError::from(err))),
        }
    }

    fn dispatch_inner(&self, request: JsonRpcRequest) -> Result<serde_json::Value, McpError> {
        let request_id = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let deadline = wall_now() + std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS);
        let budget = Budget::new().with_deadline(deadline);
        let cx = Cx::for_request_with_budget(budget);
        let mut session = Session::new(self.server_info.clone(), self.server_capabilities.clone());

        match request.method.as_str() {
            "initialize" => {
                let params: fastmcp_protocol::InitializeParams = parse_params(request.params)?;
                let out = self.router.handle_initialize(&cx, &mut session, params, None)?;
                serde_json::to_value(out).map_err(McpError::from)
            }
            "initialized" | "notifications/cancelled" | "logging/setLevel" | "ping" => Ok(serde_json::Value::Null),
            "tools/list" => {
                let params: fastmcp_protocol::ListToolsParams = parse_params_or_default(request.params)?;
                let out = self.router.handle_tools_list(&cx, params, Some(session.state()))?;
                serde_json::to_value(out).map_err(McpError::from)
            }
            "tools/call" => {
                let params: fastmcp_protocol::CallToolParams = parse_params(request.params)?;
                let out =
                    self.router.handle_tools_call(&cx, request_id, params, &budget, SessionState::new(), None, None)?;
                serde_json::to_value(out).map_err(McpError::from)
            }
            other => Err(McpError::new(McpErrorCode::MethodNotFound, format!("Method not found: {other}"))),
        }
    }

    fn json_response(&self, status: u16, body: &serde_json::Value) -> Http1Response {
        let mut resp = Http1Response::new(status, default_reason(status), serde_json::to_vec(body).unwrap_or_default());
        resp.headers.push(("content-type".to_string(), "application/json".to_string()));
        resp
    }

    fn error_response(&self, status: u16, message: &str) -> Http1Response {
        self.json_response(status, &serde_json::json!({ "detail": message }))
    }
}

fn split_path_query(uri: &str) -> (String, Option<String>) {
    let mut parts = uri.splitn(2, '?');
    let path = parts.next().unwrap_or("/").to_string();
    let query = parts.next().map(std::string::ToString::to_string);
    (path, query)
}

fn to_mcp_http_request(req: &Http1Request, path: &str) -> HttpRequest {
    let method = match req.method {
        Http1Method::Get => McpHttpMethod::Get,
        Http1Method::Post => McpHttpMethod::Post,
        Http1Method::Put => McpHttpMethod::Put,
        Http1Method::Delete => McpHttpMethod::Delete,
        Http1Method::Options => McpHttpMethod::Options,
        Http1Method::Head => McpHttpMethod::Head,
        Http1Method::Patch => McpHttpMethod::Patch,
        Http1Method::Connect | Http1Method::Trace | Http1Method::Extension(_) => McpHttpMethod::Post,
    };
    let mut headers = std::collections::HashMap::new();
    for (k, v) in &req.headers {
        let lk = k.to_lowercase();
        if lk == "accept" {
            continue;
        }
        headers.insert(lk, v.clone());
    }
    headers.insert("accept".to_string(), "application/json, text/event-stream".to_string());
    if matches!(req.method, Http1Method::Post) && !headers.contains_key("content-type") {
        headers.insert("content-type".to_string(), "application/json".to_string());
    }
    HttpRequest { method, path: path.to_string(), headers, body: req.body.clone(), query: std::collections::HashMap::new() }
}

fn to_http1_response(resp: HttpResponse) -> Http1Response {
    let status = resp.status.0;
    let mut out = Http1Response::new(status, default_reason(status), resp.body);
    for (k, v) in resp.headers {
        out.headers.push((k, v));
    }
    out
}

const fn http_error_status(err: &HttpError) -> HttpStatus {
    match err {
        HttpError::InvalidMethod(_) => HttpStatus::METHOD_NOT_ALLOWED,
        HttpError::InvalidContentType(_)
        | HttpError::JsonError(_)
        | HttpError::CodecError(_)
        | HttpError::HeadersTooLarge { .. }
        | HttpError::BodyTooLarge { .. }
        | HttpError::UnsupportedTransferEncoding(_) => HttpStatus::BAD_REQUEST,
        HttpError::Timeout | HttpError::Closed => HttpStatus::SERVICE_UNAVAILABLE,
        HttpError::Transport(_) => HttpStatus::INTERNAL_SERVER_ERROR,
    }
}

fn header_value<'a>(req: &'a Http1Request, name: &str) -> Option<&'a str> {
    let name = name.to_lowercase();
    req.headers.iter().find(|(k, _)| k.to_lowercase() == name).map(|(_, v)| v.as_str())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let mut diff = u64::try_from(a_bytes.len() ^ b_bytes.len()).unwrap_or(u64::MAX);
    let max_len = a_bytes.len().max(b_bytes.len());
    for i in 0..max_len {
        let x = a_bytes.get(i).copied().unwrap_or(0);
        let y = b_bytes.get(i).copied().unwrap_or(0);
        diff |= u64::from(x ^ y);
    }
    diff == 0
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, McpError> {
    let value = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value).map_err(|e| McpError::new(McpErrorCode::InvalidParams, e.to_string()))
}

fn parse_params_or_default<T: serde::de::DeserializeOwned + Default>(
    params: Option<serde_json::Value>,
) -> Result<T, McpError> {
    match params {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| McpError::new(McpErrorCode::InvalidParams, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_strings() {
        assert!(constant_time_eq("Bearer abc", "Bearer abc"));
    }

    #[test]
    fn constant_time_eq_rejects_different_lengths() {
        assert!(!constant_time_eq("Bearer abc", "Bearer abcd"));
    }

    #[test]
    fn split_path_query_separates_query_string() {
        let (path, query) = split_path_query("/tools/call?trace=1");
        assert_eq!(path, "/tools/call");
        assert_eq!(query.as_deref(), Some("trace=1"));
    }

    #[test]
    fn split_path_query_handles_bare_path() {
        let (path, query) = split_path_query("/healthz");
        assert_eq!(path, "/healthz");
        assert_eq!(query, None);
    }
}
