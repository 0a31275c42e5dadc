// ReAct workflow
//
// Decide → act → observe → verdict cycle bounded by max_steps. The
// decision and verdict come from structured LLM calls behind the ReactLlm
// seam; actions are looked up in the agent's tool map. A done verdict ends
// the run with a history-bearing final result. If max_steps elapses with
// no done verdict, the body ends without a final result of its own and the
// contract wrapper synthesizes the minimal one, which drops the history -
// kept as current behavior (see DESIGN.md) and locked by a test below.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{Agent, EventStream, RunContext};
use crate::dialogue::ChatMessage;
use crate::error::Result;
use crate::event::{names, Event};
use crate::llm::{ChatOptions, LlmClient};
use crate::registry::Registry;
use crate::tools::Tool;

/// Prompt id for the decision call
pub const DECIDE_PROMPT: &str = "react_decide";
/// Prompt id for the verdict call
pub const VERDICT_PROMPT: &str = "react_verdict";

const DEFAULT_MAX_STEPS: usize = 5;

/// One reasoning step's outcome: a thought, optionally naming a tool to
/// invoke with the given input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<Value>,
}

/// Stringified result of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
}

/// Whether the run has reached its conclusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub conclusion: String,
    #[serde(default)]
    pub done: bool,
}

/// The LLM seam of the ReAct cycle: given a prompt id and the call
/// context, produce the structured value the prompt asks for.
///
/// Production uses [`LlmReactCaller`]; tests script this directly.
#[async_trait]
pub trait ReactLlm: Send + Sync {
    async fn call(&self, prompt_id: &str, ctx: Value) -> Result<Value>;
}

/// Agent implementing the ReAct pattern over a tool map.
pub struct ReActAgent {
    id: String,
    version: String,
    llm_call: Arc<dyn ReactLlm>,
    tools: HashMap<String, Arc<dyn Tool>>,
    max_steps: usize,
}

impl ReActAgent {
    pub fn new(llm_call: Arc<dyn ReactLlm>) -> Self {
        Self {
            id: "react".to_string(),
            version: "v1".to_string(),
            llm_call,
            tools: HashMap::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Make a tool invocable under the given action name
    pub fn with_tool(mut self, name: impl Into<String>, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(name.into(), tool);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Override the workflow's registry identity
    pub fn with_identity(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.id = id.into();
        self.version = version.into();
        self
    }

    fn call_ctx(ctx: &RunContext, history: &[Value]) -> Value {
        let mut call_ctx = ctx.values().clone();
        call_ctx.insert("history".to_string(), Value::Array(history.to_vec()));
        Value::Object(call_ctx)
    }

    fn stringify(value: Value) -> String {
        match value {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl Agent for ReActAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        Box::pin(try_stream! {
            let mut history: Vec<Value> = Vec::new();
            yield Event::new(names::REACT_START, &ctx.session_id, json!({}));

            for step in 1..=self.max_steps {
                yield Event::new(
                    names::REACT_STEP_START,
                    &ctx.session_id,
                    json!({ "step": step }),
                );

                let decided = self
                    .llm_call
                    .call(DECIDE_PROMPT, Self::call_ctx(&ctx, &history))
                    .await?;
                let decision: Decision = serde_json::from_value(decided)?;

                let mut item = json!({ "decision": &decision });
                if let Some(action) = decision.action.as_deref() {
                    if let Some(tool) = self.tools.get(action) {
                        let args = decision.action_input.clone().unwrap_or(json!({}));
                        let observed = tool.run(args).await?;
                        let observation = Observation {
                            text: Self::stringify(observed),
                        };
                        item["observation"] = serde_json::to_value(&observation)?;
                    }
                }
                history.push(item.clone());
                yield Event::new(names::REACT_STEP_DONE, &ctx.session_id, item);

                let verdict_raw = self
                    .llm_call
                    .call(VERDICT_PROMPT, Self::call_ctx(&ctx, &history))
                    .await?;
                let verdict: Verdict = serde_json::from_value(verdict_raw)?;
                if verdict.done {
                    history.push(json!({ "verdict": &verdict }));
                    yield Event::final_result(
                        &ctx.session_id,
                        json!({ "history": &history, "verdict": &verdict }),
                    );
                    break;
                }
            }
        })
    }
}

// ============================================================================
// LlmReactCaller - prompt-backed production seam
// ============================================================================

/// ReactLlm backed by registry prompts and a structured-output LLM call.
///
/// The prompt text becomes the system message; the call context is passed
/// as the user message. Decision and verdict prompts each get the matching
/// response schema.
pub struct LlmReactCaller {
    registry: Arc<Registry>,
    llm: Arc<dyn LlmClient>,
    opts: ChatOptions,
}

impl LlmReactCaller {
    pub fn new(registry: Arc<Registry>, llm: Arc<dyn LlmClient>, opts: ChatOptions) -> Self {
        Self {
            registry,
            llm,
            opts,
        }
    }

    fn schema_for(prompt_id: &str) -> Value {
        match prompt_id {
            DECIDE_PROMPT => json!({
                "type": "object",
                "properties": {
                    "thought": { "type": "string" },
                    "action": { "type": ["string", "null"] },
                    "action_input": { "type": ["object", "null"] }
                },
                "required": ["thought"]
            }),
            VERDICT_PROMPT => json!({
                "type": "object",
                "properties": {
                    "conclusion": { "type": "string" },
                    "done": { "type": "boolean" }
                },
                "required": ["conclusion", "done"]
            }),
            _ => json!({ "type": "object" }),
        }
    }
}

#[async_trait]
impl ReactLlm for LlmReactCaller {
    async fn call(&self, prompt_id: &str, ctx: Value) -> Result<Value> {
        let prompt = self.registry.get_prompt(prompt_id, None)?;
        let messages = vec![
            ChatMessage::system(prompt),
            ChatMessage::user(ctx.to_string()),
        ];
        self.llm
            .structured_output(&messages, &Self::schema_for(prompt_id), &self.opts)
            .await
    }
}
