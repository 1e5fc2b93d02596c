//! Per-session protocol engine.
//!
//! The engine is a two-state machine. It starts `Uninitialized`, moves to
//! `Ready` on a successful `initialize`, and never goes back. Until the
//! handshake completes only `initialize` and `ping` are served; everything
//! else is answered with an ordering error and the state is unchanged.
//!
//! Tool dispatch resolves the name, checks the arguments against the tool's
//! contract and runs it. A tool that fails returns a *successful* response
//! whose content describes the failure: the session keeps working. Only
//! malformed requests produce JSON-RPC errors.

use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};

use super::types::SessionId;
use crate::core::config::ServerConfig;
use crate::core::protocol::{JsonRpcRequest, JsonRpcResponse, error_codes};
use crate::domains::tools::contract::describe_violations;
use crate::domains::tools::{ToolContext, ToolRegistry};

/// Protocol versions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Version offered when the client asks for one we do not support.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Client identification sent in the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: String,
    #[serde(default)]
    capabilities: Map<String, Value>,
    client_info: ClientInfo,
}

/// What was agreed during the handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub protocol_version: String,
    pub client_info: ClientInfo,
    pub client_capabilities: Map<String, Value>,
    /// Exact result returned to the client, replayed on repeated handshakes.
    result: Value,
}

/// Engine state.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Uninitialized,
    Ready(Handshake),
}

/// Server identity advertised in the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub instructions: String,
}

impl From<&ServerConfig> for ServerIdentity {
    fn from(config: &ServerConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            instructions: config.instructions.clone(),
        }
    }
}

/// Pick the protocol version to answer with.
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// Capability set advertised by this server.
pub fn server_capabilities() -> Value {
    json!({ "tools": { "listChanged": false } })
}

/// Protocol state machine for one session.
pub struct ProtocolEngine {
    session_id: Option<SessionId>,
    identity: Arc<ServerIdentity>,
    tools: Arc<ToolRegistry>,
    state: EngineState,
    /// Set once when the handshake completes; readable without the engine.
    published: Arc<OnceLock<Handshake>>,
}

impl fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("tools", &self.tools.tool_names())
            .finish()
    }
}

impl ProtocolEngine {
    pub fn new(
        session_id: Option<SessionId>,
        identity: Arc<ServerIdentity>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            session_id,
            identity,
            tools,
            state: EngineState::Uninitialized,
            published: Arc::new(OnceLock::new()),
        }
    }

    /// Shared slot the engine fills when it reaches `Ready`.
    pub fn published_handshake(&self) -> Arc<OnceLock<Handshake>> {
        Arc::clone(&self.published)
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    pub fn handshake(&self) -> Option<&Handshake> {
        match &self.state {
            EngineState::Ready(handshake) => Some(handshake),
            EngineState::Uninitialized => None,
        }
    }

    /// Process one request. Notifications return `None`.
    #[instrument(skip_all, fields(method = %request.method))]
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.handle_notification(&request.method);
            return None;
        }

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let ready = self.is_ready();
        let response = match (method.as_str(), ready) {
            ("initialize", _) => self.handle_initialize(id, params),
            ("ping", _) => JsonRpcResponse::success(id, json!({})),
            (m, _) if m.starts_with("notifications/") => {
                warn!("Notification method '{}' sent with an id", method);
                JsonRpcResponse::method_not_found(id, &method)
            }
            (_, false) => {
                warn!("Rejecting '{}' before initialize", method);
                JsonRpcResponse::not_initialized(id, &method)
            }
            ("tools/list", true) => self.handle_tools_list(id),
            ("tools/call", true) => self.handle_tools_call(id, params).await,
            _ => {
                warn!("Unknown method: {}", method);
                JsonRpcResponse::method_not_found(id, &method)
            }
        };

        Some(response)
    }

    fn handle_notification(&self, method: &str) {
        match (method, &self.state) {
            ("notifications/initialized", EngineState::Ready(_)) => {
                info!("Client sent initialized notification");
            }
            ("notifications/initialized", EngineState::Uninitialized) => {
                warn!("Initialized notification before initialize; ignoring");
            }
            _ => debug!("Ignoring notification: {}", method),
        }
    }

    fn handle_initialize(&mut self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if let EngineState::Ready(handshake) = &self.state {
            debug!("Repeated initialize; replaying handshake result");
            return JsonRpcResponse::success(id, handshake.result.clone());
        }

        let Some(params) = params else {
            return JsonRpcResponse::invalid_params(id, "Missing initialize params");
        };
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::invalid_params(id, e.to_string()),
        };

        let protocol_version = negotiate_version(&params.protocol_version);
        if protocol_version != params.protocol_version {
            warn!(
                requested = %params.protocol_version,
                offered = protocol_version,
                "Unsupported protocol version requested"
            );
        }

        let result = json!({
            "protocolVersion": protocol_version,
            "capabilities": server_capabilities(),
            "serverInfo": {
                "name": self.identity.name,
                "version": self.identity.version
            },
            "instructions": self.identity.instructions
        });

        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version,
            "Handshake completed"
        );

        let handshake = Handshake {
            protocol_version: protocol_version.to_string(),
            client_info: params.client_info,
            client_capabilities: params.capabilities,
            result: result.clone(),
        };
        // Only the first handshake reaches this point.
        let _ = self.published.set(handshake.clone());
        self.state = EngineState::Ready(handshake);

        JsonRpcResponse::success(id, result)
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .tools
            .list_tools()
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(Value::Object(mut params)) = params else {
            return JsonRpcResponse::invalid_params(id, "Missing params");
        };

        let name = match params.get("name").and_then(Value::as_str) {
            Some(n) => n.to_string(),
            None => return JsonRpcResponse::invalid_params(id, "Missing tool name"),
        };

        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => return JsonRpcResponse::invalid_params(id, "'arguments' must be an object"),
        };

        let Some(tool) = self.tools.get(&name) else {
            warn!("Unknown tool requested: {}", name);
            return JsonRpcResponse::unknown_tool(id, &name);
        };

        if let Err(violations) = tool.contract().validate(&arguments) {
            warn!(tool = %name, violations = violations.len(), "Tool arguments rejected");
            return JsonRpcResponse::error_with_data(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {}", describe_violations(&violations)),
                Some(json!(violations)),
            );
        }

        let context = ToolContext {
            session_id: self.session_id.clone(),
        };

        let result = match tool.invoke(arguments, &context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool invocation failed");
                CallToolResult::error(vec![Content::text(format!("Error: {e}"))])
            }
        };

        let mut response = json!({
            "content": result.content,
            "isError": result.is_error.unwrap_or(false)
        });

        // Include structured_content if present
        if let (Some(structured), Some(obj)) = (result.structured_content, response.as_object_mut()) {
            obj.insert("structuredContent".to_string(), structured);
        }

        JsonRpcResponse::success(id, response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domains::tools::definitions::CalculatorTool;

    pub(crate) fn identity() -> Arc<ServerIdentity> {
        Arc::new(ServerIdentity::from(&ServerConfig::default()))
    }

    pub(crate) fn engine(session_id: Option<SessionId>) -> ProtocolEngine {
        let mut registry = ToolRegistry::new();
        registry.register(CalculatorTool::new()).unwrap();
        ProtocolEngine::new(session_id, identity(), Arc::new(registry))
    }

    pub(crate) fn initialize_request(id: i64) -> JsonRpcRequest {
        JsonRpcRequest::new(
            id,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            }),
        )
    }

    pub(crate) fn calculator_request(id: i64, arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(
            id,
            "tools/call",
            json!({ "name": "calculator", "arguments": arguments }),
        )
    }

    async fn ready_engine() -> ProtocolEngine {
        let mut engine = engine(Some(SessionId::generate()));
        let response = engine.handle(initialize_request(0)).await.unwrap();
        assert!(!response.is_error());
        engine
    }

    #[tokio::test]
    async fn test_handshake_moves_to_ready() {
        let mut engine = engine(None);
        let response = engine.handle(initialize_request(1)).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["capabilities"], server_capabilities());
        assert_eq!(result["serverInfo"]["name"], "tokopedia-mcp-server");
        assert!(engine.is_ready());
        assert_eq!(engine.handshake().unwrap().client_info.name, "test-client");
    }

    #[tokio::test]
    async fn test_handshake_is_published_once() {
        let mut engine = engine(None);
        let published = engine.published_handshake();
        assert!(published.get().is_none());

        engine.handle(initialize_request(1)).await.unwrap();
        assert_eq!(published.get(), engine.handshake());
    }

    #[tokio::test]
    async fn test_tool_call_before_handshake_is_ordering_error() {
        let mut engine = engine(None);
        let response = engine
            .handle(calculator_request(5, json!({"operation": "add", "a": 1, "b": 1})))
            .await
            .unwrap();
        assert_eq!(response.error_code(), Some(error_codes::SESSION_NOT_INITIALIZED));
        assert_eq!(response.id, json!(5));
        assert_eq!(engine.state(), &EngineState::Uninitialized);

        // Recoverable by retrying in the right order.
        engine.handle(initialize_request(6)).await.unwrap();
        let response = engine
            .handle(calculator_request(7, json!({"operation": "add", "a": 1, "b": 1})))
            .await
            .unwrap();
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn test_repeated_handshake_is_idempotent() {
        let mut engine = engine(None);
        let first = engine.handle(initialize_request(1)).await.unwrap();
        let mut again = initialize_request(2);
        again.params = Some(json!({
            "protocolVersion": "2025-03-26",
            "clientInfo": { "name": "other", "version": "2" }
        }));
        let second = engine.handle(again).await.unwrap();
        assert_eq!(first.result, second.result);
        assert_eq!(second.id, json!(2));
        assert_eq!(engine.handshake().unwrap().client_info.name, "test-client");
    }

    #[tokio::test]
    async fn test_invalid_handshake_stays_uninitialized() {
        let mut engine = engine(None);
        let request = JsonRpcRequest::new(1, "initialize", json!({"capabilities": {}}));
        let response = engine.handle(request).await.unwrap();
        assert_eq!(response.error_code(), Some(error_codes::INVALID_PARAMS));
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn test_unsupported_version_gets_latest() {
        assert_eq!(negotiate_version("1999-01-01"), LATEST_PROTOCOL_VERSION);
        assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
    }

    #[tokio::test]
    async fn test_add_scenario() {
        let mut engine = ready_engine().await;
        let response = engine
            .handle(calculator_request(2, json!({"operation": "add", "a": 2, "b": 3})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(false));
        assert_eq!(result["content"][0]["text"], "Calculation result: 2 + 3 = 5");
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_successful_envelope() {
        let mut engine = ready_engine().await;
        let response = engine
            .handle(calculator_request(3, json!({"operation": "divide", "a": 10, "b": 0})))
            .await
            .unwrap();
        assert!(!response.is_error());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(true));
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Division by zero"));
        assert!(engine.is_ready());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let mut engine = ready_engine().await;
        let request = JsonRpcRequest::new(
            "abc",
            "tools/call",
            json!({"name": "teleport", "arguments": {}}),
        );
        let response = engine.handle(request).await.unwrap();
        assert_eq!(response.error_code(), Some(error_codes::METHOD_NOT_FOUND));
        assert_eq!(response.id, json!("abc"));
        assert_eq!(response.error.unwrap().message, "Unknown tool: teleport");
    }

    #[tokio::test]
    async fn test_validation_lists_every_field() {
        let mut engine = ready_engine().await;
        let response = engine
            .handle(calculator_request(4, json!({"operation": "modulo", "a": "ten"})))
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::INVALID_PARAMS);
        let data = error.data.unwrap();
        let fields: Vec<_> = data
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["operation", "a"]);
        assert!(engine.is_ready());
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let mut engine = ready_engine().await;
        let request = JsonRpcRequest::new(
            9,
            "tools/call",
            json!({"name": "calculator", "arguments": [1, 2]}),
        );
        let response = engine.handle(request).await.unwrap();
        assert_eq!(response.error_code(), Some(error_codes::INVALID_PARAMS));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let mut engine = ready_engine().await;
        let response = engine
            .handle(JsonRpcRequest::new(8, "tools/list", json!({})))
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools[0]["name"], "calculator");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_notifications_have_no_response() {
        let mut engine = ready_engine().await;
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(engine.handle(request).await.is_none());
    }

    #[tokio::test]
    async fn test_call_without_id_is_not_executed() {
        let mut engine = ready_engine().await;
        let mut request = calculator_request(0, json!({"operation": "modulo"}));
        request.id = None;
        assert!(engine.handle(request).await.is_none());
    }

    #[tokio::test]
    async fn test_notification_method_with_id_is_unknown() {
        let mut engine = ready_engine().await;
        let response = engine
            .handle(JsonRpcRequest::new(11, "notifications/cancelled", json!({})))
            .await
            .unwrap();
        assert_eq!(response.error_code(), Some(error_codes::METHOD_NOT_FOUND));
        assert_eq!(response.id, json!(11));
    }

    #[tokio::test]
    async fn test_ping_before_handshake() {
        let mut engine = engine(None);
        let response = engine
            .handle(JsonRpcRequest::new(1, "ping", json!({})))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!({})));
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn test_unknown_method_when_ready() {
        let mut engine = ready_engine().await;
        let response = engine
            .handle(JsonRpcRequest::new(1, "resources/list", json!({})))
            .await
            .unwrap();
        assert_eq!(response.error_code(), Some(error_codes::METHOD_NOT_FOUND));
    }
}
