// LLM collaborator contract
//
// The core never speaks a vendor protocol itself; agents call through this
// trait and let transport errors propagate unchanged. Production clients
// live in their own crates (see mentora-openai); MockLlm is the scripted
// test double.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::dialogue::ChatMessage;
use crate::error::{Error, Result};
use crate::tools::Tool;

/// Per-call options. `model: None` lets the client fall back to its default.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Bound on internal tool-calling rounds in `chat_with_tools`
    pub max_steps: usize,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self {
            model: None,
            temperature: None,
            max_steps: 3,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Response from a plain or tool-assisted chat call
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
}

/// Trait for LLM clients.
///
/// Implementations own the vendor protocol, authentication and any retry
/// policy. The core performs no retries of its own.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider name recorded in trace payloads (never the client
    /// object itself).
    fn provider(&self) -> &str;

    /// Free-text chat completion
    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<LlmReply>;

    /// Completion constrained to the given JSON schema; returns the parsed
    /// structured value.
    async fn structured_output(
        &self,
        messages: &[ChatMessage],
        schema: &Value,
        opts: &ChatOptions,
    ) -> Result<Value>;

    /// Chat with tool access: the client may invoke the given tools for up
    /// to `opts.max_steps` rounds before producing a final reply.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[Arc<dyn Tool>],
        opts: &ChatOptions,
    ) -> Result<LlmReply>;
}

// ============================================================================
// MockLlm - scripted client for tests and examples
// ============================================================================

/// LLM client that replays a queue of canned replies.
///
/// `chat`/`chat_with_tools` pop the next reply and render it as text;
/// `structured_output` pops it as-is. An empty queue is an error, so tests
/// fail loudly when an agent makes more calls than scripted.
#[derive(Default)]
pub struct MockLlm {
    replies: Mutex<VecDeque<Value>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next reply
    pub fn enqueue(&self, reply: Value) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn pop(&self) -> Result<Value> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::llm("mock reply queue is empty"))
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn chat(&self, _messages: &[ChatMessage], _opts: &ChatOptions) -> Result<LlmReply> {
        let reply = self.pop()?;
        let text = match reply {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(LlmReply { text })
    }

    async fn structured_output(
        &self,
        _messages: &[ChatMessage],
        _schema: &Value,
        _opts: &ChatOptions,
    ) -> Result<Value> {
        self.pop()
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: &[Arc<dyn Tool>],
        opts: &ChatOptions,
    ) -> Result<LlmReply> {
        self.chat(messages, opts).await
    }
}
