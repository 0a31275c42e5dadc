// OpenAI Chat Completions client
//
// Implements the core LlmClient trait for OpenAI-compatible APIs:
// plain chat, json_schema structured output, and a bounded tool-calling
// loop. Transport and API errors are surfaced as Error::Llm and propagate
// unchanged to the calling agent.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use mentora_core::{
    ChatMessage, ChatOptions, Error, LlmClient, LlmReply, MessageRole, Result, Tool,
};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completions client.
///
/// # Example
///
/// ```ignore
/// use mentora_openai::OpenAiClient;
///
/// let client = OpenAiClient::from_env()?;
/// // or
/// let client = OpenAiClient::new("your-api-key");
/// // or with a custom endpoint
/// let client = OpenAiClient::with_base_url("your-api-key", "https://api.example.com/v1/chat/completions");
/// ```
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_url: String,
    default_model: Option<String>,
}

impl OpenAiClient {
    /// Create a client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            default_model: None,
        }
    }

    /// Create a client from the OPENAI_API_KEY environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::llm("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    /// Create a client with a custom API URL (for OpenAI-compatible APIs)
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
            default_model: None,
        }
    }

    /// Model used when a call does not name one
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn resolve_model(&self, opts: &ChatOptions) -> Result<String> {
        opts.model
            .clone()
            .or_else(|| self.default_model.clone())
            .ok_or_else(|| Error::llm("no model configured for this call"))
    }

    fn convert_role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::System => "system",
            // No native developer role in Chat Completions
            MessageRole::Developer => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: Self::convert_role(msg.role).to_string(),
                content: Some(msg.content.clone()),
                name: msg.name.clone(),
                tool_calls: None,
                tool_call_id: None,
            })
            .collect()
    }

    fn convert_tools(tools: &[Arc<dyn Tool>]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|tool| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: tool.id().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    }

    async fn post(&self, request: &OpenAiRequest) -> Result<OpenAiResponse> {
        debug!(model = %request.model, url = %self.api_url, "calling chat completions");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("OpenAI API error {status}: {body}")));
        }

        response
            .json::<OpenAiResponse>()
            .await
            .map_err(|e| Error::llm(format!("invalid OpenAI response: {e}")))
    }

    fn first_message(mut response: OpenAiResponse) -> Result<OpenAiResponseMessage> {
        if response.choices.is_empty() {
            return Err(Error::llm("OpenAI response contained no choices"));
        }
        Ok(response.choices.remove(0).message)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<LlmReply> {
        let request = OpenAiRequest {
            model: self.resolve_model(opts)?,
            messages: Self::convert_messages(messages),
            temperature: opts.temperature,
            tools: None,
            response_format: None,
        };
        let message = Self::first_message(self.post(&request).await?)?;
        Ok(LlmReply {
            text: message.content.unwrap_or_default(),
        })
    }

    async fn structured_output(
        &self,
        messages: &[ChatMessage],
        schema: &Value,
        opts: &ChatOptions,
    ) -> Result<Value> {
        let request = OpenAiRequest {
            model: self.resolve_model(opts)?,
            messages: Self::convert_messages(messages),
            temperature: opts.temperature,
            tools: None,
            response_format: Some(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "structured_output",
                    "strict": true,
                    "schema": schema,
                }
            })),
        };
        let message = Self::first_message(self.post(&request).await?)?;
        let content = message
            .content
            .ok_or_else(|| Error::llm("structured output reply had no content"))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::llm(format!("structured output was not valid JSON: {e}")))
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[Arc<dyn Tool>],
        opts: &ChatOptions,
    ) -> Result<LlmReply> {
        let model = self.resolve_model(opts)?;
        let tool_defs = Self::convert_tools(tools);
        let mut wire_messages = Self::convert_messages(messages);

        for _round in 0..opts.max_steps.max(1) {
            let request = OpenAiRequest {
                model: model.clone(),
                messages: wire_messages.clone(),
                temperature: opts.temperature,
                tools: Some(tool_defs.clone()),
                response_format: None,
            };
            let message = Self::first_message(self.post(&request).await?)?;

            let Some(tool_calls) = message.tool_calls.filter(|c| !c.is_empty()) else {
                return Ok(LlmReply {
                    text: message.content.unwrap_or_default(),
                });
            };

            wire_messages.push(OpenAiMessage {
                role: "assistant".to_string(),
                content: message.content.clone(),
                name: None,
                tool_calls: Some(tool_calls.clone()),
                tool_call_id: None,
            });

            for call in tool_calls {
                let tool = tools
                    .iter()
                    .find(|t| t.id() == call.function.name)
                    .ok_or_else(|| {
                        Error::tool(format!("model called unknown tool: {}", call.function.name))
                    })?;
                let args: Value = serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| json!({}));
                let result = tool.run(args).await?;
                wire_messages.push(OpenAiMessage {
                    role: "tool".to_string(),
                    content: Some(result.to_string()),
                    name: None,
                    tool_calls: None,
                    tool_call_id: Some(call.id),
                });
            }
        }

        Err(Error::llm(format!(
            "tool-calling did not converge within {} rounds",
            opts.max_steps.max(1)
        )))
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("default_model", &self.default_model)
            .finish()
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}
