// Memory collaborator contract and implementations
//
// Memory owns the conversation history and per-session key/value state.
// The core only consumes this narrow interface; safety under concurrent
// sessions is the implementation's obligation.
//
// Implementations here:
// - InMemoryMemory: process-local, for tests, examples and the CLI
// - BackendMemory: REST-backed, for running against the tutoring backend

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::dialogue::{ChatMessage, RolePolicy};
use crate::error::{Error, Result};

/// Trait for conversation memory
#[async_trait]
pub trait Memory: Send + Sync {
    /// Load the prior dialog for a session, shaped per the role policy
    async fn load_dialog(&self, session_id: &str, policy: &RolePolicy)
        -> Result<Vec<ChatMessage>>;

    /// Append messages to the session's dialog
    async fn append(&self, session_id: &str, messages: Vec<ChatMessage>) -> Result<()>;

    /// Store a per-session value
    async fn set_kv(&self, session_id: &str, key: &str, value: Value) -> Result<()>;

    /// Fetch a per-session value
    async fn get_kv(&self, session_id: &str, key: &str) -> Result<Option<Value>>;
}

// ============================================================================
// InMemoryMemory - process-local memory
// ============================================================================

/// In-memory implementation, keyed by session id.
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    messages: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
    kv: Arc<RwLock<HashMap<String, HashMap<String, Value>>>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a session's dialog (useful for testing)
    pub async fn seed(&self, session_id: impl Into<String>, messages: Vec<ChatMessage>) {
        self.messages
            .write()
            .await
            .insert(session_id.into(), messages);
    }

    /// Drop all sessions
    pub async fn clear(&self) {
        self.messages.write().await.clear();
        self.kv.write().await.clear();
    }
}

#[async_trait]
impl Memory for InMemoryMemory {
    async fn load_dialog(
        &self,
        session_id: &str,
        _policy: &RolePolicy,
    ) -> Result<Vec<ChatMessage>> {
        Ok(self
            .messages
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        self.messages
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn set_kv(&self, session_id: &str, key: &str, value: Value) -> Result<()> {
        self.kv
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get_kv(&self, session_id: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .kv
            .read()
            .await
            .get(session_id)
            .and_then(|m| m.get(key))
            .cloned())
    }
}

// ============================================================================
// BackendMemory - REST-backed memory
// ============================================================================

/// Memory backed by the tutoring backend's REST API.
///
/// Reads and writes the chat branch of a session's messages. KV state is
/// not persisted by the backend yet, so those calls are no-ops here.
pub struct BackendMemory {
    base_url: String,
    client: reqwest::Client,
}

impl BackendMemory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Construct from `MENTORA_BACKEND_URL`, defaulting to localhost
    pub fn from_env() -> Self {
        let base_url = std::env::var("MENTORA_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        Self::new(base_url)
    }

    fn messages_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}/messages/chat", self.base_url, session_id)
    }
}

#[async_trait]
impl Memory for BackendMemory {
    async fn load_dialog(
        &self,
        session_id: &str,
        _policy: &RolePolicy,
    ) -> Result<Vec<ChatMessage>> {
        let response = self
            .client
            .get(self.messages_url(session_id))
            .send()
            .await
            .map_err(|e| Error::memory(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::memory(e.to_string()))?;
        let messages: Vec<ChatMessage> = response
            .json()
            .await
            .map_err(|e| Error::memory(e.to_string()))?;
        Ok(messages)
    }

    async fn append(&self, session_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        for message in messages {
            self.client
                .post(self.messages_url(session_id))
                .json(&message)
                .send()
                .await
                .map_err(|e| Error::memory(e.to_string()))?
                .error_for_status()
                .map_err(|e| Error::memory(e.to_string()))?;
        }
        Ok(())
    }

    async fn set_kv(&self, _session_id: &str, _key: &str, _value: Value) -> Result<()> {
        Ok(())
    }

    async fn get_kv(&self, _session_id: &str, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let memory = InMemoryMemory::new();
        memory
            .append("s1", vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        memory
            .append("s1", vec![ChatMessage::assistant("hello")])
            .await
            .unwrap();

        let dialog = memory
            .load_dialog("s1", &RolePolicy::default())
            .await
            .unwrap();
        assert_eq!(dialog.len(), 2);
        assert_eq!(dialog[1].content, "hello");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let memory = InMemoryMemory::new();
        memory
            .append("s1", vec![ChatMessage::user("hi")])
            .await
            .unwrap();

        let other = memory
            .load_dialog("s2", &RolePolicy::default())
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn kv_store_set_and_get() {
        let memory = InMemoryMemory::new();
        assert_eq!(memory.get_kv("s1", "plan").await.unwrap(), None);

        memory
            .set_kv("s1", "plan", json!({ "modules": 3 }))
            .await
            .unwrap();
        assert_eq!(
            memory.get_kv("s1", "plan").await.unwrap(),
            Some(json!({ "modules": 3 }))
        );
    }
}
