//! JSON-RPC 2.0 envelope for the A2A route

use super::messages::{IncomingMessage, Task};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only accepted protocol version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed set of error codes the adapter reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Envelope is malformed (bad version, missing id)
    InvalidRequest,
    /// Params are unusable, or the addressed agent does not exist
    InvalidParams,
    /// Anything unclassified, including agent invocation failures
    InternalError,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            -32600 => Some(ErrorCode::InvalidRequest),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            _ => None,
        }
    }
}

/// Request envelope with every field left loosely typed so validation can
/// report each problem with its own code
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub jsonrpc: Value,
    #[serde(default)]
    pub id: Value,
    /// Accepted and ignored; the route determines the operation
    #[serde(default)]
    pub method: Value,
    #[serde(default)]
    pub params: Value,
}

impl RawRequest {
    /// Read the envelope fields out of a parsed body; non-object bodies
    /// behave as if every field were absent
    pub fn from_value(body: Value) -> Self {
        match body {
            Value::Object(mut map) => Self {
                jsonrpc: map.remove("jsonrpc").unwrap_or(Value::Null),
                id: map.remove("id").unwrap_or(Value::Null),
                method: map.remove("method").unwrap_or(Value::Null),
                params: map.remove("params").unwrap_or(Value::Null),
            },
            _ => Self::default(),
        }
    }

    pub fn has_valid_version(&self) -> bool {
        self.jsonrpc.as_str() == Some(JSONRPC_VERSION)
    }

    /// The request id when present and non-null
    pub fn request_id(&self) -> Option<&Value> {
        (!self.id.is_null()).then_some(&self.id)
    }
}

/// `params` of a message/send style call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    #[serde(default)]
    pub messages: Option<Vec<IncomingMessage>>,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl SendParams {
    /// Inbound messages in order: the single `message` wins over `messages`;
    /// `None` when neither yields at least one message
    pub fn into_messages(self) -> Option<Vec<IncomingMessage>> {
        match (self.message, self.messages) {
            (Some(message), _) => Some(vec![message]),
            (None, Some(messages)) if !messages.is_empty() => Some(messages),
            _ => None,
        }
    }
}

/// Error object of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Result or error, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Box<Task>),
    Error(JsonRpcError),
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl JsonRpcResponse {
    pub fn success(id: Value, task: Task) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Result(Box::new(task)),
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Error(error),
        }
    }
}
