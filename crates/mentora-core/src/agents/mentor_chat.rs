// Mentor chat agent
//
// The conversational mentor behind the chat tab. Plain text replies only -
// no structured output. Blank input falls back to asking the model for a
// greeting so a fresh session still gets a useful first message.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{Agent, EventStream, Meta, RunContext};
use crate::dialogue::{ChatMessage, DialogueBuilder, RolePolicy};
use crate::error::Error;
use crate::event::Event;
use crate::llm::{ChatOptions, LlmClient};
use crate::memory::Memory;
use crate::registry::{AgentDeps, Registry};

const SYSTEM_PROMPT_ID: &str = "mentor_chat.system";
const DEVELOPER_PROMPT_ID: &str = "mentor_chat.developer";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const GREETING_REQUEST: &str =
    "Greet the student and briefly explain how you can help with the course.";

pub struct MentorChatAgent {
    memory: Arc<dyn Memory>,
    llm: Option<Arc<dyn LlmClient>>,
    role_policy: RolePolicy,
    meta: Meta,
    registry: Option<Arc<Registry>>,
}

impl MentorChatAgent {
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
}

#[async_trait]
impl Agent for MentorChatAgent {
    fn id(&self) -> &str {
        "mentor_chat"
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
            let step = "chat_reply";
            yield Event::new(step, &ctx.session_id, json!({ "message": "Preparing a reply" }));

            let user_message = ctx
                .get("user_message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string();
            let effective_message = if user_message.is_empty() {
                GREETING_REQUEST.to_string()
            } else {
                user_message
            };

            let registry = self
                .registry
                .as_ref()
                .ok_or_else(|| Error::prompt("mentor_chat requires a prompt registry"))?;
            let llm = self
                .llm
                .as_ref()
                .ok_or_else(|| Error::llm("mentor_chat requires an LLM client"))?;

            let system_text = registry.get_prompt(SYSTEM_PROMPT_ID, None)?;
            let developer_text = registry
                .get_prompt(DEVELOPER_PROMPT_ID, None)?
                .replace("{message}", &effective_message);

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
            let reply = llm.chat(&dialog, &opts).await?;

            self.memory
                .append(
                    &ctx.session_id,
                    vec![ChatMessage::assistant(&reply.text).with_meta(json!({
                        "agentId": self.id(),
                        "version": self.version(),
                    }))],
                )
                .await?;

            yield Event::final_result(&ctx.session_id, json!({ "message": reply.text }));
        })
    }
}
