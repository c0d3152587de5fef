//! Crate-level error types for the ratings agent
//!
//! Every failure that can cross a component boundary is expressed here or in
//! the component's own `thiserror` enum, then mapped onto protocol error
//! codes by the A2A adapter.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Tool execution failed: {message}")]
    ToolExecutionFailed { message: String },

    #[error("LLM provider error: {message}")]
    LlmError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Tool error: {0}")]
    ToolError(#[from] crate::tools::ToolError),

    #[error("Lookup error: {0}")]
    LookupError(#[from] crate::lookup::LookupError),

    #[error("History store error: {0}")]
    HistoryError(#[from] crate::history::HistoryError),
}

impl AgentError {
    /// Create tool execution error
    pub fn tool_execution_failed<S: Into<String>>(message: S) -> Self {
        Self::ToolExecutionFailed {
            message: message.into(),
        }
    }

    /// Create LLM error
    pub fn llm_error<S: Into<String>>(message: S) -> Self {
        Self::LlmError {
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Redact credentials and sensitive paths from a message that leaves the process
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_ERROR_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}
