//! Mock implementations for testing
//!
//! Scripted LLM provider, rating lookup, agent invoker and history store, so
//! the adapter, agent and pipeline can be exercised without network access.

use crate::agent::{AgentInvoker, ChatMessage, Generation};
use crate::error::{AgentError, AgentResult};
use crate::history::{HistoryEntry, HistoryError, HistoryStore};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::lookup::{LookupError, RatingLookup, RatingRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Record with plausible values for `app_id`
pub fn sample_record(app_id: &str) -> RatingRecord {
    RatingRecord {
        app_id: app_id.to_string(),
        title: app_id.to_string(),
        rating: 4.6,
        ratings_count: 150_000,
        reviews: 42_000,
        installs: "10,000,000+".to_string(),
        price: "Free".to_string(),
        developer: "Example Developer".to_string(),
        last_updated: "2024-05-01T00:00:00.000Z".to_string(),
        version: "1.0.0".to_string(),
        url: format!("https://play.google.com/store/apps/details?id={app_id}"),
    }
}

/// Lookup answering from a fixed table; unknown names are not found
#[derive(Debug, Default)]
pub struct MockRatingLookup {
    outcomes: HashMap<String, Result<RatingRecord, LookupError>>,
    calls: Mutex<Vec<String>>,
}

impl MockRatingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, app_name: impl Into<String>, record: RatingRecord) -> Self {
        self.outcomes.insert(app_name.into(), Ok(record));
        self
    }

    pub fn with_failure(mut self, app_name: impl Into<String>, error: LookupError) -> Self {
        self.outcomes.insert(app_name.into(), Err(error));
        self
    }

    /// App names looked up so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RatingLookup for MockRatingLookup {
    async fn lookup(&self, app_name: &str) -> Result<RatingRecord, LookupError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(app_name.to_string());
        }

        match self.outcomes.get(app_name) {
            Some(Ok(record)) => Ok(record.clone()),
            Some(Err(e)) => Err(e.clone().into_fetch_failure()),
            None => Err(LookupError::NotFound(app_name.to_string()).into_fetch_failure()),
        }
    }
}

/// Invoker returning a canned generation or error
#[derive(Debug)]
pub struct MockInvoker {
    outcome: Result<Generation, String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockInvoker {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(Generation::text(text)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tool_results(mut self, results: Vec<Value>) -> Self {
        if let Ok(generation) = &mut self.outcome {
            generation.tool_results = results;
        }
        self
    }

    /// Every call fails with an LLM error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AgentInvoker for MockInvoker {
    async fn generate(&self, messages: &[ChatMessage]) -> AgentResult<Generation> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        match &self.outcome {
            Ok(generation) => Ok(generation.clone()),
            Err(message) => Err(AgentError::llm_error(message.clone())),
        }
    }
}

/// One scripted provider turn
#[derive(Debug, Clone)]
enum ScriptedTurn {
    Reply(String),
    ToolCall { name: String, arguments: Value },
    Fail(String),
}

/// LLM provider that plays back a script of turns and records requests
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    script: Mutex<VecDeque<ScriptedTurn>>,
    repeat_failure: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<&str>) -> Self {
        replies
            .into_iter()
            .fold(Self::new(), |provider, reply| provider.then_reply(reply))
    }

    /// Every request fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            repeat_failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(ScriptedTurn::Reply(text.into()))
    }

    pub fn then_tool_call(self, name: impl Into<String>, arguments: Value) -> Self {
        self.push(ScriptedTurn::ToolCall {
            name: name.into(),
            arguments,
        })
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(ScriptedTurn::Fail(message.into()))
    }

    fn push(self, turn: ScriptedTurn) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(turn);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// The `index`-th request received
    pub fn request(&self, index: usize) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .ok()
            .and_then(|requests| requests.get(index).cloned())
    }

    fn response(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> CompletionResponse {
        let finish_reason = if tool_calls.is_some() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason,
            tool_calls,
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let call_index = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| LlmError::RequestFailed("request log poisoned".to_string()))?;
            requests.push(request);
            requests.len()
        };

        if let Some(message) = &self.repeat_failure {
            return Err(LlmError::RequestFailed(message.clone()));
        }

        let turn = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string()))?;

        match turn {
            ScriptedTurn::Reply(text) => Ok(Self::response(Some(text), None)),
            ScriptedTurn::ToolCall { name, arguments } => Ok(Self::response(
                None,
                Some(vec![ToolCall {
                    id: format!("call_{call_index}"),
                    name,
                    arguments,
                }]),
            )),
            ScriptedTurn::Fail(message) => Err(LlmError::RequestFailed(message)),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        match &self.repeat_failure {
            Some(message) => Err(LlmError::RequestFailed(message.clone())),
            None => Ok(()),
        }
    }
}

/// History store whose appends always fail
#[derive(Debug, Default)]
pub struct FailingHistoryStore;

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn append(&self, _entry: HistoryEntry) -> Result<(), HistoryError> {
        Err(HistoryError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "history store is read-only",
        )))
    }
}
