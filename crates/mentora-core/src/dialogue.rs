// Dialogue assembly
//
// Messages are provider-agnostic here; provider crates own the mapping to
// their wire roles. The RolePolicy controls how a dialog is assembled from
// memory before an LLM call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::memory::Memory;

/// Message role in a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    /// Subsystem instructions; providers without a native developer role
    /// map this to their system role.
    Developer,
    User,
    Assistant,
}

/// One dialog message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            meta: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// How dialog history is assembled and attributed for an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePolicy {
    pub provider_mode: String,
    pub synthetic_user_between_steps: bool,
    pub inject_system: bool,
    pub assistant_name_by_step: bool,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            provider_mode: "assistant-only".to_string(),
            synthetic_user_between_steps: false,
            inject_system: true,
            assistant_name_by_step: true,
        }
    }
}

/// Assembles the message list for an LLM call.
pub struct DialogueBuilder;

impl DialogueBuilder {
    /// Build the dialog for one step: optional system message, then the
    /// prior dialog from memory, then the current user request last so the
    /// model sees history before the new input.
    pub async fn build(
        memory: &dyn Memory,
        session_id: &str,
        policy: &RolePolicy,
        step_name: &str,
        system_text: &str,
        developer_text: &str,
    ) -> Result<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        if policy.inject_system {
            messages.push(ChatMessage::system(system_text));
        }
        let prior = memory.load_dialog(session_id, policy).await?;
        messages.extend(prior);
        messages.push(ChatMessage::user(developer_text));
        if policy.synthetic_user_between_steps {
            messages.push(ChatMessage::user(format!("continue:{step_name}")));
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMemory;

    #[tokio::test]
    async fn builds_system_then_history_then_user() {
        let memory = InMemoryMemory::new();
        memory
            .append(
                "s1",
                vec![
                    ChatMessage::user("earlier question"),
                    ChatMessage::assistant("earlier answer"),
                ],
            )
            .await
            .unwrap();

        let dialog = DialogueBuilder::build(
            &memory,
            "s1",
            &RolePolicy::default(),
            "chat_reply",
            "you are a mentor",
            "new question",
        )
        .await
        .unwrap();

        assert_eq!(dialog.len(), 4);
        assert_eq!(dialog[0].role, MessageRole::System);
        assert_eq!(dialog[1].content, "earlier question");
        assert_eq!(dialog[2].content, "earlier answer");
        assert_eq!(dialog[3].role, MessageRole::User);
        assert_eq!(dialog[3].content, "new question");
    }

    #[tokio::test]
    async fn policy_flags_control_system_and_synthetic_user() {
        let memory = InMemoryMemory::new();
        let policy = RolePolicy {
            inject_system: false,
            synthetic_user_between_steps: true,
            ..RolePolicy::default()
        };

        let dialog =
            DialogueBuilder::build(&memory, "s1", &policy, "plan", "sys", "input")
                .await
                .unwrap();

        assert_eq!(dialog.len(), 2);
        assert_eq!(dialog[0].content, "input");
        assert_eq!(dialog[1].content, "continue:plan");
    }
}
