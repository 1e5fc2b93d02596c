//! Session router.
//!
//! Classifies each POSTed envelope against the `mcp-session-id` header, in
//! this order:
//!
//! 1. **Resume**: the header names a live session; the request goes to that
//!    session's engine.
//! 2. **Bootstrap**: no header and the method is `initialize`; a new session
//!    is created, and registered only if its handshake succeeds.
//! 3. **Reject**: anything else, including a stale header on an `initialize`
//!    request. Answered with -32000 and no state is created.
//!
//! The GET/DELETE side channel only resolves the header; there is no
//! bootstrap path for those verbs.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::core::McpServer;
use crate::core::protocol::{JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse};
use crate::core::session::{Session, SessionError, SessionId, SessionRegistry, SessionStatus};

/// Message used for every internal failure reported to clients.
const INTERNAL_FAILURE: &str = "Failed to handle request";

/// How a request was routed, and the response to send back.
#[derive(Debug)]
pub enum RouteOutcome {
    /// Handled by an existing session. `None` for notifications.
    Resumed {
        session_id: SessionId,
        response: Option<JsonRpcResponse>,
    },
    /// A new session was created by this handshake.
    Bootstrapped {
        session_id: SessionId,
        response: JsonRpcResponse,
    },
    /// Handshake without a session header that did not succeed; nothing
    /// was registered.
    Unbound { response: JsonRpcResponse },
    /// Malformed envelope, or no valid session for this request.
    Rejected { response: JsonRpcResponse },
    /// Request handling failed internally.
    Failed { response: JsonRpcResponse },
}

impl RouteOutcome {
    /// Response body, if the outcome has one.
    pub fn response(&self) -> Option<&JsonRpcResponse> {
        match self {
            RouteOutcome::Resumed { response, .. } => response.as_ref(),
            RouteOutcome::Bootstrapped { response, .. }
            | RouteOutcome::Unbound { response }
            | RouteOutcome::Rejected { response }
            | RouteOutcome::Failed { response } => Some(response),
        }
    }

    /// Session bound to this request, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            RouteOutcome::Resumed { session_id, .. }
            | RouteOutcome::Bootstrapped { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}

/// Routes requests to per-session protocol engines.
#[derive(Clone)]
pub struct SessionRouter {
    server: McpServer,
    registry: Arc<SessionRegistry>,
}

impl SessionRouter {
    pub fn new(server: McpServer, registry: Arc<SessionRegistry>) -> Self {
        Self { server, registry }
    }

    pub fn server(&self) -> &McpServer {
        &self.server
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Route one POSTed body.
    #[instrument(skip_all, fields(session_id = header.unwrap_or("-")))]
    pub async fn route(&self, header: Option<&str>, body: &[u8]) -> RouteOutcome {
        let request = match parse_envelope(body) {
            Ok(request) => request,
            Err(response) => return RouteOutcome::Rejected { response },
        };
        debug!(method = %request.method, "Routing request");

        if let Some(header) = header {
            return match self.registry.get_session(header).await {
                Some(session) => self.resume(session, request).await,
                None => {
                    warn!(method = %request.method, "Unknown or expired session id");
                    RouteOutcome::Rejected {
                        response: JsonRpcResponse::no_valid_session(request.id),
                    }
                }
            };
        }

        if request.method == "initialize" {
            return self.bootstrap(request).await;
        }

        warn!(method = %request.method, "Request without session id");
        RouteOutcome::Rejected {
            response: JsonRpcResponse::no_valid_session(request.id),
        }
    }

    /// Resolve the session named by a side-channel request.
    pub async fn resolve(&self, header: Option<&str>) -> Option<Arc<Session>> {
        self.registry.get_session(header?).await
    }

    /// Status snapshot for a GET on the session endpoint. Answered even while
    /// a request holds the session's engine.
    pub async fn status(&self, header: Option<&str>) -> Option<SessionStatus> {
        let session = self.resolve(header).await?;
        session.touch();
        Some(session.status())
    }

    /// Close the session named by a DELETE. Returns `false` when there was
    /// nothing to close.
    pub async fn terminate(&self, header: Option<&str>) -> bool {
        match header {
            Some(id) => self.registry.remove_session(id).await.is_some(),
            None => false,
        }
    }

    async fn resume(&self, session: Arc<Session>, request: JsonRpcRequest) -> RouteOutcome {
        session.touch();
        let session_id = session.id().clone();
        let id = request.id.clone();

        match dispatch(&session, request).await {
            Ok(response) => {
                session.touch();
                RouteOutcome::Resumed {
                    session_id,
                    response,
                }
            }
            Err(SessionError::Closed(_)) => {
                info!(session_id = %session_id, "Session closed while handling request");
                RouteOutcome::Rejected {
                    response: JsonRpcResponse::no_valid_session(id),
                }
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Request handling failed");
                RouteOutcome::Failed {
                    response: JsonRpcResponse::internal_error(id, INTERNAL_FAILURE),
                }
            }
        }
    }

    async fn bootstrap(&self, request: JsonRpcRequest) -> RouteOutcome {
        let session_id = SessionId::generate();
        let id = request.id.clone();
        let mut engine = self.server.create_engine(Some(session_id.clone()));

        let response = match AssertUnwindSafe(engine.handle(request)).catch_unwind().await {
            Ok(Some(response)) => response,
            Ok(None) => {
                return RouteOutcome::Rejected {
                    response: JsonRpcResponse::invalid_request(id),
                };
            }
            Err(payload) => {
                let e = SessionError::from_panic(payload);
                error!(error = %e, "Handshake failed");
                return RouteOutcome::Failed {
                    response: JsonRpcResponse::internal_error(id, INTERNAL_FAILURE),
                };
            }
        };

        if !engine.is_ready() {
            debug!("Handshake rejected; no session created");
            return RouteOutcome::Unbound { response };
        }

        let session = Arc::new(Session::new(session_id.clone(), engine));
        self.registry.add_session(session_id.clone(), session).await;

        RouteOutcome::Bootstrapped {
            session_id,
            response,
        }
    }
}

/// Run one request on a session's engine.
///
/// Waits for the engine (same-session requests queue in arrival order),
/// contains panics, and gives up as soon as the session is closed. Dropping
/// the returned future releases the engine.
async fn dispatch(
    session: &Session,
    request: JsonRpcRequest,
) -> Result<Option<JsonRpcResponse>, SessionError> {
    let closed = || SessionError::Closed(session.id().clone());

    let mut engine = tokio::select! {
        biased;
        _ = session.closed() => return Err(closed()),
        engine = session.lock_engine() => engine,
    };
    if session.is_closed() {
        return Err(closed());
    }

    let work = AssertUnwindSafe(engine.handle(request)).catch_unwind();
    tokio::select! {
        biased;
        _ = session.closed() => Err(closed()),
        result = work => result.map_err(SessionError::from_panic),
    }
}

/// Parse a body into a request envelope.
fn parse_envelope(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Body is not valid JSON");
        JsonRpcResponse::parse_error()
    })?;

    let id = value.get("id").cloned();
    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "Body is not a JSON-RPC request");
        JsonRpcResponse::invalid_request(id.clone())
    })?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::invalid_request(request.id));
    }
    Ok(request)
}
