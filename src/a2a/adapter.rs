//! Request handling for the A2A route

use super::error::AdapterError;
use crate::agent::{AgentRegistry, ChatMessage, Generation};
use crate::config::Environment;
use crate::error::AgentError;
use crate::observability::metrics;
use crate::protocol::{
    new_id, Artifact, IncomingMessage, JsonRpcResponse, Message, Part, RawRequest, SendParams,
    Task,
};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Status text of the task returned for an empty or unreadable body
pub const READY_MESSAGE: &str = "Ready to receive requests";

/// HTTP status plus JSON body, independent of any web framework
#[derive(Debug, Clone, PartialEq)]
pub struct A2aResponse {
    pub status: u16,
    pub body: Value,
}

impl A2aResponse {
    fn from_envelope(status: u16, envelope: &JsonRpcResponse) -> Self {
        let body = serde_json::to_value(envelope).unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize response envelope");
            Value::Null
        });
        Self { status, body }
    }
}

/// Translates JSON-RPC requests into agent invocations
#[derive(Debug, Clone)]
pub struct A2aAdapter {
    registry: AgentRegistry,
    environment: Environment,
}

impl A2aAdapter {
    pub fn new(registry: AgentRegistry, environment: Environment) -> Self {
        Self {
            registry,
            environment,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Handle one request body addressed to `agent_id`
    pub async fn handle(&self, raw_body: &[u8], agent_id: &str) -> A2aResponse {
        let span = crate::request_span!(agent_id);
        async {
            let started = Instant::now();
            metrics().request_received();
            info!(bytes = raw_body.len(), "Received A2A request");

            let Some(body) = Self::parse_body(raw_body) else {
                debug!("Empty or unparseable body, answering with ready task");
                metrics().request_completed(started.elapsed());
                return A2aResponse::from_envelope(
                    200,
                    &JsonRpcResponse::success(Value::Null, Self::ready_task()),
                );
            };

            match self.process(body, agent_id).await {
                Ok((id, task)) => {
                    metrics().request_completed(started.elapsed());
                    info!(task_id = %task.id, artifacts = task.artifacts.len(), "A2A request completed");
                    A2aResponse::from_envelope(200, &JsonRpcResponse::success(id, task))
                }
                Err(e) => {
                    if e.is_rejection() {
                        metrics().request_rejected();
                        warn!(error = %e, "A2A request rejected");
                    } else {
                        metrics().request_failed(started.elapsed());
                        error!(error = ?e, "A2A request failed");
                    }
                    let envelope = JsonRpcResponse::error(
                        e.response_id(),
                        e.to_protocol_error(self.environment),
                    );
                    A2aResponse::from_envelope(e.http_status(), &envelope)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// `None` for empty or non-JSON bodies (pure function)
    fn parse_body(raw_body: &[u8]) -> Option<Value> {
        if raw_body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        serde_json::from_slice(raw_body).ok()
    }

    fn ready_task() -> Task {
        Task::completed(new_id(), new_id(), READY_MESSAGE, Vec::new(), Vec::new())
    }

    async fn process(&self, body: Value, agent_id: &str) -> Result<(Value, Task), AdapterError> {
        let request = RawRequest::from_value(body);

        if !request.has_valid_version() {
            return Err(AdapterError::InvalidVersion { id: request.id });
        }

        let id = request
            .request_id()
            .cloned()
            .ok_or(AdapterError::MissingId)?;
        tracing::Span::current().record("request_id", tracing::field::display(&id));

        let agent = self
            .registry
            .get(agent_id)
            .ok_or_else(|| AdapterError::AgentNotFound {
                id: id.clone(),
                requested: agent_id.to_string(),
                available: self.registry.ids(),
            })?;

        let params = Self::parse_params(&id, request.params)?;
        let task_id = params.task_id.clone().unwrap_or_else(new_id);
        let context_id = params.context_id.clone().unwrap_or_else(new_id);
        let inbound = params
            .into_messages()
            .ok_or_else(|| AdapterError::missing_messages(id.clone()))?;

        let conversation = Self::to_conversation(&inbound);
        debug!(messages = conversation.len(), "Invoking agent");

        // Panics inside the agent surface as internal errors
        let invocation =
            tokio::spawn(async move { agent.generate(&conversation).await }.in_current_span());
        let generation = match invocation.await {
            Ok(result) => result.map_err(|source| AdapterError::Internal { source })?,
            Err(join_error) => {
                error!(error = %join_error, "Agent invocation aborted");
                return Err(AdapterError::Internal {
                    source: AgentError::internal_error(format!(
                        "Agent invocation aborted: {join_error}"
                    )),
                });
            }
        };

        let task = Self::assemble_task(agent_id, task_id, context_id, &inbound, generation);
        Ok((id, task))
    }

    /// Absent or null params behave like an empty object
    fn parse_params(id: &Value, params: Value) -> Result<SendParams, AdapterError> {
        if params.is_null() {
            return Ok(SendParams::default());
        }
        serde_json::from_value(params)
            .map_err(|e| AdapterError::malformed_params(id.clone(), e.to_string()))
    }

    fn to_conversation(inbound: &[IncomingMessage]) -> Vec<ChatMessage> {
        inbound
            .iter()
            .map(|message| ChatMessage {
                role: message.role(),
                content: message.flatten_parts(),
            })
            .collect()
    }

    fn assemble_task(
        agent_id: &str,
        task_id: String,
        context_id: String,
        inbound: &[IncomingMessage],
        generation: Generation,
    ) -> Task {
        let mut artifacts = vec![Artifact::new(
            format!("{agent_id}Response"),
            vec![Part::text(&generation.text)],
        )];
        if !generation.tool_results.is_empty() {
            artifacts.push(Artifact::new(
                "ToolResults",
                generation
                    .tool_results
                    .iter()
                    .map(|result| Part::text(result.to_string()))
                    .collect(),
            ));
        }

        let mut history: Vec<Message> = inbound
            .iter()
            .map(|message| Message {
                kind: "message".to_string(),
                role: message.role(),
                parts: message.parts.clone(),
                message_id: message.message_id.clone().unwrap_or_else(new_id),
                task_id: Some(message.task_id.clone().unwrap_or_else(|| task_id.clone())),
            })
            .collect();
        history.push(Message::agent_text(&generation.text, Some(task_id.clone())));

        Task::completed(task_id, context_id, &generation.text, artifacts, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentInvoker;
    use crate::testing::mocks::MockInvoker;
    use serde_json::json;
    use std::sync::Arc;

    fn adapter(invoker: MockInvoker) -> A2aAdapter {
        let registry = AgentRegistry::new().with_agent("playStoreAgent", Arc::new(invoker));
        A2aAdapter::new(registry, Environment::Production)
    }

    #[test]
    fn test_parse_body() {
        assert!(A2aAdapter::parse_body(b"").is_none());
        assert!(A2aAdapter::parse_body(b"  \n ").is_none());
        assert!(A2aAdapter::parse_body(b"{not json").is_none());
        assert_eq!(A2aAdapter::parse_body(b"[1]"), Some(json!([1])));
    }

    #[test]
    fn test_null_params_are_empty() {
        let params = A2aAdapter::parse_params(&json!(1), Value::Null).unwrap();
        assert!(params.into_messages().is_none());

        let err = A2aAdapter::parse_params(&json!(1), json!("text")).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams { details: Some(_), .. }));
    }

    #[test]
    fn test_assemble_task_history_and_artifacts() {
        let inbound: Vec<IncomingMessage> = serde_json::from_value(json!([
            {"parts": [{"kind": "text", "text": "Spotify"}], "messageId": "m-1"},
            {"role": "agent", "parts": [{"kind": "text", "text": "ok"}], "taskId": "own"}
        ]))
        .unwrap();
        let generation = Generation {
            text: "4.6 stars".to_string(),
            tool_results: vec![json!({"appId": "com.spotify.music"})],
        };

        let task = A2aAdapter::assemble_task(
            "playStoreAgent",
            "task-1".to_string(),
            "ctx-1".to_string(),
            &inbound,
            generation,
        );

        assert_eq!(task.artifacts.len(), 2);
        assert_eq!(task.artifacts[0].name, "playStoreAgentResponse");
        assert_eq!(task.artifacts[1].name, "ToolResults");
        assert_eq!(
            task.artifacts[1].parts,
            vec![Part::text(r#"{"appId":"com.spotify.music"}"#)]
        );

        assert_eq!(task.history.len(), 3);
        assert_eq!(task.history[0].message_id, "m-1");
        assert_eq!(task.history[0].task_id.as_deref(), Some("task-1"));
        assert_eq!(task.history[1].task_id.as_deref(), Some("own"));
        assert_eq!(task.history[2].parts, vec![Part::text("4.6 stars")]);
    }

    #[tokio::test]
    async fn test_invoker_receives_flattened_conversation() {
        let invoker = Arc::new(MockInvoker::replying("done"));
        let registry = AgentRegistry::new().with_agent(
            "playStoreAgent",
            invoker.clone() as Arc<dyn AgentInvoker>,
        );
        let adapter = A2aAdapter::new(registry, Environment::Production);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "params": {"message": {"parts": [
                {"kind": "text", "text": "Rate"},
                {"kind": "data", "data": {"appName": "Spotify"}}
            ]}}
        });
        let response = adapter
            .handle(body.to_string().as_bytes(), "playStoreAgent")
            .await;

        assert_eq!(response.status, 200);
        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![ChatMessage::user("Rate\n{\"appName\":\"Spotify\"}")]
        );
    }

    #[tokio::test]
    async fn test_unknown_agent_lists_available() {
        let response = adapter(MockInvoker::replying("x"))
            .handle(br#"{"jsonrpc":"2.0","id":"r1","params":{}}"#, "ghostAgent")
            .await;

        assert_eq!(response.status, 404);
        assert_eq!(response.body["id"], "r1");
        assert_eq!(response.body["error"]["message"], "Agent 'ghostAgent' not found");
        assert_eq!(
            response.body["error"]["data"],
            json!({"availableAgents": ["playStoreAgent"], "requestedAgent": "ghostAgent"})
        );
    }
}
