//! Language-model agent with a bounded tool loop

use super::{AgentInvoker, ChatMessage, Generation};
use crate::config::LlmSection;
use crate::error::{AgentError, AgentResult};
use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider, Message, ToolCall};
use crate::protocol::Role;
use crate::tools::ToolSystem;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Upper bound on completion rounds per generation
pub const MAX_TOOL_ITERATIONS: usize = 10;

pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a helpful assistant that provides Google Play Store app ratings and information.

Your primary function is to help users get app ratings and details from the Google Play Store. When responding:
- Always ask for an app name if none is provided
- Provide the app's current rating, total number of reviews, and other relevant details
- If multiple apps match the search, ask the user to be more specific
- Keep responses concise but informative
- If asked about rating trends or comparisons, provide helpful insights based on the data

Use the get-playstore-rating tool to fetch current app ratings and information.";

/// Model parameters for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct LlmAgentSettings {
    pub model: String,
    pub system_prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl From<&LlmSection> for LlmAgentSettings {
    fn from(section: &LlmSection) -> Self {
        Self {
            model: section.model.clone(),
            system_prompt: section
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            temperature: section.temperature,
            max_tokens: section.max_tokens,
        }
    }
}

/// Agent backed by an [`LlmProvider`] and a [`ToolSystem`]
pub struct LlmAgent {
    name: String,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolSystem>,
    settings: LlmAgentSettings,
}

/// Outcome of one tool call inside the loop
struct ToolOutcome {
    transcript: String,
    output: Option<Value>,
}

impl LlmAgent {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolSystem>,
        settings: LlmAgentSettings,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            tools,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// System prompt followed by the conversation (pure function)
    fn build_initial_messages(system_prompt: &str, conversation: &[ChatMessage]) -> Vec<Message> {
        std::iter::once(Message::system(system_prompt))
            .chain(conversation.iter().map(|turn| match turn.role {
                Role::User => Message::user(&turn.content),
                Role::Agent => Message::assistant(&turn.content),
            }))
            .collect()
    }

    fn completion_request(&self, messages: &[Message]) -> CompletionRequest {
        CompletionRequest {
            messages: messages.to_vec(),
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools: (!self.tools.is_empty()).then(|| self.tools.descriptions()),
        }
    }

    /// Returns Err once the iteration budget is spent (pure validation)
    fn check_iteration_limit(iteration: usize) -> AgentResult<()> {
        if iteration > MAX_TOOL_ITERATIONS {
            return Err(AgentError::internal_error(format!(
                "Tool execution exceeded maximum iterations ({MAX_TOOL_ITERATIONS})"
            )));
        }
        Ok(())
    }

    /// Tool calls that keep the loop going, if any (pure decision)
    fn pending_tool_calls(response: &CompletionResponse) -> Option<&[ToolCall]> {
        response
            .tool_calls
            .as_deref()
            .filter(|calls| !calls.is_empty())
    }

    fn add_assistant_response(messages: &mut Vec<Message>, response: &CompletionResponse) {
        if let Some(content) = response.content.as_ref().filter(|c| !c.is_empty()) {
            messages.push(Message::assistant(content));
        }
    }

    fn add_tool_results(messages: &mut Vec<Message>, transcripts: &[String]) {
        if !transcripts.is_empty() {
            messages.push(Message::user(format!(
                "Tool results:\n{}",
                transcripts.join("\n")
            )));
        }
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> ToolOutcome {
        let span = crate::tool_span!(call.name.as_str(), call.id.as_str());
        async {
            debug!(arguments = %call.arguments, "Executing tool");
            match self.tools.execute_tool(&call.name, &call.arguments).await {
                Ok(output) => ToolOutcome {
                    transcript: format!("Tool {} returned: {}", call.name, output),
                    output: Some(output),
                },
                Err(e) => {
                    warn!(error = %e, "Tool call failed");
                    ToolOutcome {
                        transcript: format!("Tool {} failed: {}", call.name, e),
                        output: None,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl AgentInvoker for LlmAgent {
    async fn generate(&self, conversation: &[ChatMessage]) -> AgentResult<Generation> {
        let mut messages = Self::build_initial_messages(&self.settings.system_prompt, conversation);
        let mut tool_results = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;
            Self::check_iteration_limit(iteration)?;

            let request = self.completion_request(&messages);
            let response = self.provider.complete(request).await.map_err(|e| {
                AgentError::llm_error(format!("{} request failed: {e}", self.provider.name()))
            })?;

            Self::add_assistant_response(&mut messages, &response);

            if let Some(calls) = Self::pending_tool_calls(&response) {
                debug!(
                    agent = %self.name,
                    iteration,
                    tool_count = calls.len(),
                    "Processing tool calls"
                );

                let mut transcripts = Vec::with_capacity(calls.len());
                for call in calls {
                    let outcome = self.execute_tool_call(call).await;
                    transcripts.push(outcome.transcript);
                    tool_results.extend(outcome.output);
                }
                Self::add_tool_results(&mut messages, &transcripts);
                continue;
            }

            info!(
                agent = %self.name,
                iterations = iteration,
                tool_results = tool_results.len(),
                "LLM generation completed"
            );
            return Ok(Generation {
                text: response.content.unwrap_or_default(),
                tool_results,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{sample_record, MockLlmProvider, MockRatingLookup};
    use crate::tools::PlayStoreRatingTool;
    use serde_json::json;

    fn settings() -> LlmAgentSettings {
        LlmAgentSettings {
            model: "gemini-2.0-flash".to_string(),
            system_prompt: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    async fn rating_tools() -> Arc<ToolSystem> {
        let lookup = MockRatingLookup::new().with_app("Spotify", sample_record("com.spotify.music"));
        let mut tools = ToolSystem::new();
        tools
            .register(Box::new(PlayStoreRatingTool::new(Arc::new(lookup))), None)
            .await
            .unwrap();
        Arc::new(tools)
    }

    #[test]
    fn test_initial_messages_map_roles() {
        let messages = LlmAgent::build_initial_messages(
            "system",
            &[ChatMessage::user("hi"), ChatMessage::agent("hello")],
        );

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system("system"));
        assert_eq!(messages[1], Message::user("hi"));
        assert_eq!(messages[2], Message::assistant("hello"));
    }

    #[test]
    fn test_iteration_limit() {
        assert!(LlmAgent::check_iteration_limit(MAX_TOOL_ITERATIONS).is_ok());
        assert!(LlmAgent::check_iteration_limit(MAX_TOOL_ITERATIONS + 1).is_err());
    }

    #[test]
    fn test_settings_fall_back_to_default_instructions() {
        let config = crate::config::AgentConfig::test_config();
        let settings = LlmAgentSettings::from(&config.llm);
        assert_eq!(settings.system_prompt, DEFAULT_INSTRUCTIONS);
        assert_eq!(settings.model, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_plain_reply_has_no_tool_results() {
        let provider = Arc::new(MockLlmProvider::with_replies(vec!["Which app?"]));
        let agent = LlmAgent::new("playStoreAgent", provider.clone(), rating_tools().await, settings());

        let generation = agent.generate(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(generation.text, "Which app?");
        assert!(generation.tool_results.is_empty());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_results_are_collected() {
        let provider = Arc::new(
            MockLlmProvider::new()
                .then_tool_call("get-playstore-rating", json!({"appName": "Spotify"}))
                .then_reply("Spotify is rated 4.6"),
        );
        let agent = LlmAgent::new("playStoreAgent", provider.clone(), rating_tools().await, settings());

        let generation = agent
            .generate(&[ChatMessage::user("How is Spotify rated?")])
            .await
            .unwrap();

        assert_eq!(generation.text, "Spotify is rated 4.6");
        assert_eq!(generation.tool_results.len(), 1);
        assert_eq!(generation.tool_results[0]["appId"], "com.spotify.music");

        let second = provider.request(1).unwrap();
        let last = second.messages.last().unwrap();
        assert!(last.content.starts_with("Tool results:\nTool get-playstore-rating returned:"));
    }

    #[tokio::test]
    async fn test_failed_tool_call_is_not_collected() {
        let provider = Arc::new(
            MockLlmProvider::new()
                .then_tool_call("get-playstore-rating", json!({"appName": "Ghost"}))
                .then_reply("I could not find that app"),
        );
        let agent = LlmAgent::new("playStoreAgent", provider.clone(), rating_tools().await, settings());

        let generation = agent.generate(&[ChatMessage::user("Ghost?")]).await.unwrap();
        assert!(generation.tool_results.is_empty());

        let second = provider.request(1).unwrap();
        assert!(second
            .messages
            .last()
            .unwrap()
            .content
            .contains("Tool get-playstore-rating failed:"));
    }

    #[tokio::test]
    async fn test_endless_tool_calls_hit_limit() {
        let mut provider = MockLlmProvider::new();
        for _ in 0..=MAX_TOOL_ITERATIONS {
            provider = provider.then_tool_call("get-playstore-rating", json!({"appName": "Spotify"}));
        }
        let agent = LlmAgent::new("playStoreAgent", Arc::new(provider), rating_tools().await, settings());

        let err = agent.generate(&[ChatMessage::user("loop")]).await.unwrap_err();
        assert!(err.to_string().contains("maximum iterations"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_llm_error() {
        let provider = Arc::new(MockLlmProvider::failing("quota exhausted"));
        let agent = LlmAgent::new("playStoreAgent", provider, rating_tools().await, settings());

        let err = agent.generate(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError { .. }));
        assert!(err.to_string().contains("quota exhausted"));
    }
}
