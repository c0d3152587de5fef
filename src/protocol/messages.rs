//! A2A task protocol message types
//!
//! This module defines the message, part, artifact and task structures carried
//! inside JSON-RPC envelopes on the agent-to-agent route.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const MESSAGE_KIND: &str = "message";
const TASK_KIND: &str = "task";

fn default_message_kind() -> String {
    MESSAGE_KIND.to_string()
}

fn default_task_kind() -> String {
    TASK_KIND.to_string()
}

/// Fresh protocol identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time in the protocol's timestamp format, e.g. `2025-01-01T12:00:00.000Z`
pub fn protocol_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Author of a protocol message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

/// Typed content fragment of a message
///
/// # Examples
/// ```
/// use ratings_agent::protocol::Part;
/// use serde_json::json;
///
/// let part: Part = serde_json::from_value(json!({"kind": "text", "text": "WhatsApp"})).unwrap();
/// assert_eq!(part, Part::text("WhatsApp"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    Data {
        data: Value,
    },
    File {
        file: Value,
    },
    /// Any part kind this agent does not understand
    #[serde(other)]
    Unsupported,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Plain-text rendering used when handing the part to the language model
    pub fn flatten(&self) -> String {
        match self {
            Part::Text { text } => text.clone(),
            Part::Data { data } => data.to_string(),
            Part::File { .. } | Part::Unsupported => String::new(),
        }
    }
}

/// Message as it arrives from a protocol client; every field but the parts is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl IncomingMessage {
    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }

    /// Newline-joined plain text of all parts
    pub fn flatten_parts(&self) -> String {
        self.parts
            .iter()
            .map(Part::flatten)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fully identified protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "default_message_kind")]
    pub kind: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Message {
    /// Agent-authored single-text message with a fresh id
    pub fn agent_text(text: impl Into<String>, task_id: Option<String>) -> Self {
        Self {
            kind: default_message_kind(),
            role: Role::Agent,
            parts: vec![Part::text(text)],
            message_id: new_id(),
            task_id,
        }
    }
}

/// Output attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    pub name: String,
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            artifact_id: new_id(),
            name: name.into(),
            parts,
        }
    }
}

/// Task lifecycle state; requests are answered synchronously so only
/// completion is ever reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub timestamp: String,
    pub message: Message,
}

/// Unit of response for every successfully processed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    pub artifacts: Vec<Artifact>,
    pub history: Vec<Message>,
    #[serde(default = "default_task_kind")]
    pub kind: String,
}

impl Task {
    /// Completed task whose status message carries `text`
    pub fn completed(
        id: String,
        context_id: String,
        text: &str,
        artifacts: Vec<Artifact>,
        history: Vec<Message>,
    ) -> Self {
        Self {
            id,
            context_id,
            status: TaskStatus {
                state: TaskState::Completed,
                timestamp: protocol_timestamp(),
                message: Message::agent_text(text, None),
            },
            artifacts,
            history,
            kind: default_task_kind(),
        }
    }
}
