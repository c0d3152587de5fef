//! Adapter failures and their protocol representation

use crate::config::Environment;
use crate::error::{sanitize_error_message, AgentError};
use crate::protocol::{ErrorCode, JsonRpcError};
use serde_json::{json, Value};
use thiserror::Error;

/// Every way a request can fail after its body parsed as JSON
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Invalid Request: jsonrpc must be \"2.0\"")]
    InvalidVersion { id: Value },

    #[error("Invalid Request: id is required")]
    MissingId,

    #[error("Agent '{requested}' not found")]
    AgentNotFound {
        id: Value,
        requested: String,
        available: Vec<String>,
    },

    #[error("{message}")]
    InvalidParams {
        id: Value,
        message: String,
        details: Option<String>,
    },

    #[error("Internal error")]
    Internal {
        #[source]
        source: AgentError,
    },
}

impl AdapterError {
    pub fn missing_messages(id: Value) -> Self {
        Self::InvalidParams {
            id,
            message: "Invalid params: message or messages required".to_string(),
            details: None,
        }
    }

    pub fn malformed_params(id: Value, details: impl Into<String>) -> Self {
        Self::InvalidParams {
            id,
            message: "Invalid params".to_string(),
            details: Some(details.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidVersion { .. } | Self::MissingId => ErrorCode::InvalidRequest,
            Self::AgentNotFound { .. } | Self::InvalidParams { .. } => ErrorCode::InvalidParams,
            Self::Internal { .. } => ErrorCode::InternalError,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidVersion { .. } | Self::MissingId | Self::InvalidParams { .. } => 400,
            Self::AgentNotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// Id to place in the error envelope
    pub fn response_id(&self) -> Value {
        match self {
            Self::InvalidVersion { id }
            | Self::AgentNotFound { id, .. }
            | Self::InvalidParams { id, .. } => id.clone(),
            Self::MissingId | Self::Internal { .. } => Value::Null,
        }
    }

    /// True when the request never reached an agent
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }

    pub fn to_protocol_error(&self, environment: Environment) -> JsonRpcError {
        let data = match self {
            Self::InvalidVersion { .. } | Self::MissingId => None,
            Self::AgentNotFound {
                requested,
                available,
                ..
            } => Some(json!({
                "availableAgents": available,
                "requestedAgent": requested,
            })),
            Self::InvalidParams { details, .. } => details
                .as_ref()
                .map(|details| json!({ "details": sanitize_error_message(details) })),
            Self::Internal { source } => {
                let mut data = json!({ "details": sanitize_error_message(&source.to_string()) });
                if !environment.is_production() {
                    data["stack"] = Value::String(sanitize_error_message(&format!("{source:?}")));
                }
                Some(data)
            }
        };

        JsonRpcError {
            code: self.code().as_i32(),
            message: self.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        let cases: Vec<(AdapterError, u16, i32)> = vec![
            (AdapterError::InvalidVersion { id: json!(1) }, 400, -32600),
            (AdapterError::MissingId, 400, -32600),
            (
                AdapterError::AgentNotFound {
                    id: json!(1),
                    requested: "x".to_string(),
                    available: vec![],
                },
                404,
                -32602,
            ),
            (AdapterError::missing_messages(json!(1)), 400, -32602),
            (
                AdapterError::Internal {
                    source: AgentError::llm_error("boom"),
                },
                500,
                -32603,
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.http_status(), status, "{error}");
            assert_eq!(error.code().as_i32(), code, "{error}");
        }
    }

    #[test]
    fn test_internal_error_hides_stack_in_production() {
        let error = AdapterError::Internal {
            source: AgentError::llm_error("upstream timed out"),
        };

        let production = error.to_protocol_error(Environment::Production);
        assert_eq!(production.message, "Internal error");
        let data = production.data.unwrap();
        assert_eq!(data["details"], "LLM provider error: upstream timed out");
        assert!(data.get("stack").is_none());

        let development = error.to_protocol_error(Environment::Development);
        assert!(development.data.unwrap()["stack"]
            .as_str()
            .unwrap()
            .contains("LlmError"));
    }

    #[test]
    fn test_internal_details_are_sanitized() {
        let error = AdapterError::Internal {
            source: AgentError::llm_error("rejected api_key=sk-live-123"),
        };
        let data = error.to_protocol_error(Environment::Production).data.unwrap();
        assert!(!data["details"].as_str().unwrap().contains("sk-live-123"));
    }

    #[test]
    fn test_response_ids() {
        assert_eq!(AdapterError::MissingId.response_id(), Value::Null);
        assert_eq!(
            AdapterError::InvalidVersion { id: json!("abc") }.response_id(),
            json!("abc")
        );
        assert_eq!(
            AdapterError::Internal {
                source: AgentError::internal_error("x")
            }
            .response_id(),
            Value::Null
        );
    }
}
