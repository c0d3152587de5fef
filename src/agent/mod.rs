//! Conversational agents addressed by the A2A route
//!
//! The adapter only sees [`AgentInvoker`]; [`LlmAgent`] is the production
//! implementation and [`AgentRegistry`] maps route ids to invokers.

pub mod llm_agent;
pub mod registry;

use crate::error::AgentResult;
use crate::protocol::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use llm_agent::{LlmAgent, LlmAgentSettings, DEFAULT_INSTRUCTIONS, MAX_TOOL_ITERATIONS};
pub use registry::AgentRegistry;

/// Flattened conversation turn handed to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }
}

/// Outcome of one generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    /// Outputs of every tool call that succeeded during generation, in call order
    pub tool_results: Vec<Value>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_results: Vec::new(),
        }
    }
}

/// Produces a reply for a conversation
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> AgentResult<Generation>;
}
