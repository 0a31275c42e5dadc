// Learning planner agent
//
// Turns the track-creation form fields into a module-by-module course plan
// via a structured LLM call, and stores the plan in session memory so later
// steps can pick it up.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{Agent, EventStream, Meta, RunContext};
use crate::dialogue::{ChatMessage, DialogueBuilder, MessageRole, RolePolicy};
use crate::error::Error;
use crate::event::Event;
use crate::llm::{ChatOptions, LlmClient};
use crate::memory::Memory;
use crate::registry::{AgentDeps, Registry};

const SYSTEM_PROMPT_ID: &str = "learning_planner.system";
const DEVELOPER_PROMPT_ID: &str = "learning_planner.developer";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Memory key the finished plan is stored under
pub const PLAN_KV_KEY: &str = "learning_plan";

/// Track-creation form fields accepted in `ctx.query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackParams {
    pub title: String,
    pub description: String,
    pub goal: String,
    #[serde(default = "default_focus")]
    pub focus: String,
    #[serde(default = "default_tone")]
    pub tone: String,
}

fn default_focus() -> String {
    "theory".to_string()
}

fn default_tone() -> String {
    "friendly".to_string()
}

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "modules": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Short one-line module titles, in teaching order"
            }
        },
        "required": ["modules"]
    })
}

pub struct LearningPlannerAgent {
    memory: Arc<dyn Memory>,
    llm: Option<Arc<dyn LlmClient>>,
    role_policy: RolePolicy,
    meta: Meta,
    registry: Option<Arc<Registry>>,
}

impl LearningPlannerAgent {
    pub fn from_deps(deps: AgentDeps) -> Self {
        Self {
            memory: deps.memory,
            llm: deps.llm,
            role_policy: deps.role_policy,
            meta: deps.meta,
            registry: deps.registry,
        }
    }

    fn model(&self) -> String {
        self.meta
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| std::env::var("MENTORA_DEFAULT_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    fn topic_text(params: &TrackParams) -> String {
        format!(
            "Title: {}.\nDescription: {}.\nGoal: {}.\nFocus: {}. Tone: {}.",
            params.title, params.description, params.goal, params.focus, params.tone
        )
    }
}

#[async_trait]
impl Agent for LearningPlannerAgent {
    fn id(&self) -> &str {
        "learning_planner"
    }

    fn version(&self) -> &str {
        "v1"
    }

    fn meta(&self) -> Option<&Meta> {
        Some(&self.meta)
    }

    fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        self.llm.as_ref()
    }

    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        Box::pin(try_stream! {
            let step = "planning";
            yield Event::new(step, &ctx.session_id, json!({ "message": "Building the course plan" }));

            let query = ctx
                .get("query")
                .cloned()
                .ok_or_else(|| Error::tool("learning_planner requires a query with track params"))?;
            let params: TrackParams = serde_json::from_value(query)?;

            let registry = self
                .registry
                .as_ref()
                .ok_or_else(|| Error::prompt("learning_planner requires a prompt registry"))?;
            let llm = self
                .llm
                .as_ref()
                .ok_or_else(|| Error::llm("learning_planner requires an LLM client"))?;

            let system_text = registry.get_prompt(SYSTEM_PROMPT_ID, None)?;
            let developer_text = registry
                .get_prompt(DEVELOPER_PROMPT_ID, None)?
                .replace("{topic}", &Self::topic_text(&params));

            let dialog = DialogueBuilder::build(
                self.memory.as_ref(),
                &ctx.session_id,
                &self.role_policy,
                step,
                system_text,
                &developer_text,
            )
            .await?;

            let opts = ChatOptions::new().with_model(self.model());
            let plan = llm.structured_output(&dialog, &plan_schema(), &opts).await?;

            let result = json!({ "plan": plan, "sources": [] });
            self.memory
                .set_kv(&ctx.session_id, PLAN_KV_KEY, plan.clone())
                .await?;
            self.memory
                .append(
                    &ctx.session_id,
                    vec![ChatMessage {
                        role: MessageRole::Assistant,
                        content: result.to_string(),
                        name: Some(step.to_string()),
                        meta: None,
                    }],
                )
                .await?;

            yield Event::final_result(&ctx.session_id, result);
        })
    }
}
