//! JSON-RPC 2.0 envelopes and the error codes used on the wire.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed error codes returned to clients.
pub mod error_codes {
    /// Body is not valid JSON.
    pub const PARSE_ERROR: i32 = -32700;
    /// Body is JSON but not a request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown method or unknown tool.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Params or tool arguments failed validation.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Unexpected failure while handling the request.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Missing, unknown or expired session identifier.
    pub const NO_VALID_SESSION: i32 = -32000;
    /// Request received before the session completed its handshake.
    pub const SESSION_NOT_INITIALIZED: i32 = -32002;
}

use error_codes::*;

/// JSON-RPC request structure.
///
/// `id` is `None` only when the member is absent; an explicit `"id": null`
/// deserializes to `Some(Value::Null)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with the current protocol version.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params: Some(params),
        }
    }

    /// A request without an `id` member is a notification and never
    /// receives a response body.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC response structure.
///
/// `id` is always serialized; it is `null` when the caller's id could not be
/// read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    /// Create an error response carrying structured details.
    pub fn error_with_data(
        id: Option<Value>,
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Parse error (body is not JSON).
    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, INVALID_REQUEST, "Invalid Request")
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// Unknown tool error.
    pub fn unknown_tool(id: Option<Value>, name: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Unknown tool: {name}"))
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl AsRef<str>) -> Self {
        Self::error(id, INVALID_PARAMS, format!("Invalid params: {}", msg.as_ref()))
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl AsRef<str>) -> Self {
        Self::error(id, INTERNAL_ERROR, format!("Internal error: {}", msg.as_ref()))
    }

    /// No valid session for this request.
    pub fn no_valid_session(id: Option<Value>) -> Self {
        Self::error(
            id,
            NO_VALID_SESSION,
            "Bad Request: No valid session ID provided",
        )
    }

    /// Request arrived before the handshake completed.
    pub fn not_initialized(id: Option<Value>, method: &str) -> Self {
        Self::error(
            id,
            SESSION_NOT_INITIALIZED,
            format!("Session not initialized: '{method}' requires a completed initialize handshake"),
        )
    }

    /// Whether this response carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Error code, if any.
    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_id_parses() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .unwrap();
        assert!(request.id.is_none());
        assert!(request.is_notification());
    }

    #[test]
    fn test_null_id_is_not_a_notification() {
        let request: JsonRpcRequest = serde_json::from_value(
            json!({"jsonrpc": "2.0", "id": null, "method": "tools/list"}),
        )
        .unwrap();
        assert_eq!(request.id, Some(Value::Null));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_notification_is_decided_by_missing_id() {
        let call: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "tools/call"})).unwrap();
        assert!(call.is_notification());

        let cancelled: JsonRpcRequest = serde_json::from_value(
            json!({"jsonrpc": "2.0", "id": 3, "method": "notifications/cancelled"}),
        )
        .unwrap();
        assert!(!cancelled.is_notification());
    }

    #[test]
    fn test_error_serializes_null_id() {
        let response = JsonRpcResponse::no_valid_session(None);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], json!(-32000));
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_success_echoes_string_id() {
        let response = JsonRpcResponse::success(Some(json!("req-7")), json!({}));
        assert_eq!(response.id, json!("req-7"));
        assert!(!response.is_error());
    }

    #[test]
    fn test_error_messages_carry_prefix() {
        let response = JsonRpcResponse::invalid_params(Some(json!(1)), "a: expected a number");
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Invalid params: a: expected a number");
    }
}
