//! HTTP transport implementation.
//!
//! JSON-RPC over POST on the MCP path, with the session carried in the
//! `mcp-session-id` header. GET and DELETE on the same path report and close
//! a session.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};

use super::router::{RouteOutcome, SessionRouter};
use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;
use crate::core::config::SessionsConfig;
use crate::core::protocol::JsonRpcResponse;
use crate::core::session::{SESSION_HEADER, SessionRegistry};

/// Body returned by the side channel when the session cannot be resolved.
const INVALID_SESSION: &str = "Invalid or missing session ID";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    router: SessionRouter,
    rpc_path: Arc<str>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Run the HTTP transport until a shutdown signal arrives.
    ///
    /// In-flight requests are drained before every session is closed.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();

        let registry = Arc::new(SessionRegistry::new());
        let router = SessionRouter::new(server.clone(), registry.clone());
        let app = build_router(router, &self.config);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let sweeper = spawn_idle_sweeper(registry.clone(), &server.config().sessions);

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Session:  GET|DELETE {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        registry.close_all().await;
        info!("Server closed");

        served.map_err(|e| TransportError::http(e.to_string()))
    }
}

/// Build the axum application for a session router.
pub fn build_router(router: SessionRouter, config: &HttpConfig) -> Router {
    let request_level = if router.server().config().logging.log_requests {
        Level::INFO
    } else {
        Level::DEBUG
    };

    let state = AppState {
        router,
        rpc_path: Arc::from(config.rpc_path.as_str()),
    };

    let mut app = Router::new()
        .route(
            &config.rpc_path,
            post(handle_rpc)
                .get(handle_session_status)
                .delete(handle_session_delete),
        )
        .route("/health", get(health_check))
        .route("/", get(root_handler))
        .fallback(not_found)
        .with_state(state);

    if let Some(timeout) = config.request_timeout() {
        app = app.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ));
    }

    app = app.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(request_level))
            .on_request(DefaultOnRequest::new().level(request_level))
            .on_response(DefaultOnResponse::new().level(request_level)),
    );

    // Add CORS if enabled
    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static(SESSION_HEADER)]);
        app = app.layer(cors);
    }

    app
}

/// Periodically evict idle sessions, when an idle timeout is configured.
fn spawn_idle_sweeper(
    registry: Arc<SessionRegistry>,
    sessions: &SessionsConfig,
) -> Option<JoinHandle<()>> {
    let max_idle = sessions.idle_timeout()?;
    let period = sessions.sweep_interval();
    info!(
        "Idle sessions expire after {:?} (checked every {:?})",
        max_idle, period
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.sweep_idle(max_idle).await;
        }
    }))
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    // A header that is present but not valid UTF-8 still counts as present.
    headers
        .get(SESSION_HEADER)
        .map(|value| value.to_str().unwrap_or_default())
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let server = state.router.server();
    Json(json!({
        "name": server.name(),
        "version": server.version(),
        "transport": "HTTP",
        "endpoints": {
            "rpc": &*state.rpc_path,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "sessionHeader": SESSION_HEADER,
        "documentation": format!(
            "POST an initialize request to {} without a session header, then send the returned {} header with every request",
            state.rpc_path, SESSION_HEADER
        )
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let server = state.router.server();
    Json(json!({
        "status": "healthy",
        "server": server.name(),
        "version": server.version(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "activeSessions": state.router.registry().count().await
    }))
}

/// Handle JSON-RPC requests.
async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let outcome = state.router.route(session_header(&headers), &body).await;
    outcome_response(outcome)
}

fn outcome_response(outcome: RouteOutcome) -> Response {
    match outcome {
        RouteOutcome::Bootstrapped {
            session_id,
            response,
        } => {
            let mut http_response = json_response(StatusCode::OK, response);
            match HeaderValue::from_str(session_id.as_str()) {
                Ok(value) => {
                    http_response.headers_mut().insert(SESSION_HEADER, value);
                }
                Err(e) => error!(session_id = %session_id, error = %e, "Session id is not a valid header value"),
            }
            http_response
        }
        RouteOutcome::Resumed {
            response: Some(response),
            ..
        }
        | RouteOutcome::Unbound { response } => json_response(StatusCode::OK, response),
        RouteOutcome::Resumed { response: None, .. } => StatusCode::ACCEPTED.into_response(),
        RouteOutcome::Rejected { response } => json_response(StatusCode::BAD_REQUEST, response),
        RouteOutcome::Failed { response } => {
            json_response(StatusCode::INTERNAL_SERVER_ERROR, response)
        }
    }
}

fn json_response(status: StatusCode, response: JsonRpcResponse) -> Response {
    (status, Json(response)).into_response()
}

/// GET on the MCP path: session status.
async fn handle_session_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.router.status(session_header(&headers)).await {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::BAD_REQUEST, INVALID_SESSION).into_response(),
    }
}

/// DELETE on the MCP path: close the session.
async fn handle_session_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.router.terminate(session_header(&headers)).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::BAD_REQUEST, INVALID_SESSION).into_response()
    }
}

async fn not_found(method: Method, uri: Uri) -> Response {
    warn!(%method, %uri, "Route not found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Route {} {} not found", method, uri)
        })),
    )
        .into_response()
}
