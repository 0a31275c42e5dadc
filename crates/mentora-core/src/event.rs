// Execution events
//
// Every agent run produces an ordered stream of Event records. Events are
// immutable once constructed; within one run their order is the emission
// order and callers may rely on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known event names.
///
/// Agents are free to emit additional domain-specific names (e.g.
/// `chat_reply`); these are the ones the contract layer and the runner
/// interpret.
pub mod names {
    /// First event of every run, injected by the contract wrapper.
    pub const START_AGENT: &str = "start_agent";
    /// Terminal event of a successful run.
    pub const FINAL_RESULT: &str = "final_result";
    /// Terminal event the runner emits when a run fails.
    pub const ERROR: &str = "error";

    pub const WORKFLOW_STEP_START: &str = "workflow_step_start";
    pub const WORKFLOW_STEP_DONE: &str = "workflow_step_done";
    pub const LOOP_STEP_START: &str = "loop_step_start";
    pub const LOOP_STEP_DONE: &str = "loop_step_done";
    pub const REACT_START: &str = "react_start";
    pub const REACT_STEP_START: &str = "react_step_start";
    pub const REACT_STEP_DONE: &str = "react_step_done";
}

/// A single record emitted during agent execution.
///
/// `trace_id` is filled in by the runner when it records the event against a
/// trace; events emitted outside a runner carry an empty trace id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub session_id: String,
    #[serde(default)]
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event with a payload
    pub fn new(
        event: impl Into<String>,
        session_id: impl Into<String>,
        payload: impl Into<Option<Value>>,
    ) -> Self {
        Self {
            event: event.into(),
            session_id: session_id.into(),
            trace_id: String::new(),
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a `start_agent` event for the given agent identity
    pub fn start_agent(session_id: impl Into<String>, agent_id: &str, version: &str) -> Self {
        Self::new(
            names::START_AGENT,
            session_id,
            serde_json::json!({ "agent": agent_id, "version": version }),
        )
    }

    /// Create a `final_result` event
    pub fn final_result(session_id: impl Into<String>, payload: Value) -> Self {
        Self::new(names::FINAL_RESULT, session_id, payload)
    }

    /// Create an `error` event carrying a failure message
    pub fn error(
        session_id: impl Into<String>,
        trace_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event: names::ERROR.to_string(),
            session_id: session_id.into(),
            trace_id: trace_id.into(),
            payload: Some(serde_json::json!({ "message": message.into() })),
            timestamp: Utc::now(),
        }
    }

    /// Attach a trace id, consuming the event
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// True if this is the terminal `final_result` event
    pub fn is_final(&self) -> bool {
        self.event == names::FINAL_RESULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_agent_carries_identity() {
        let ev = Event::start_agent("s1", "mentor_chat", "v1");
        assert_eq!(ev.event, names::START_AGENT);
        assert_eq!(ev.session_id, "s1");
        let payload = ev.payload.unwrap();
        assert_eq!(payload["agent"], "mentor_chat");
        assert_eq!(payload["version"], "v1");
    }

    #[test]
    fn error_event_carries_message_and_trace() {
        let ev = Event::error("s1", "t-42", "boom");
        assert_eq!(ev.trace_id, "t-42");
        assert_eq!(ev.payload.unwrap()["message"], "boom");
    }

    #[test]
    fn serializes_without_empty_payload() {
        let ev = Event::new("chat_reply", "s1", None);
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json.get("payload").is_none());
        assert_eq!(json["event"], "chat_reply");
    }

    #[test]
    fn final_result_is_final() {
        assert!(Event::final_result("s1", json!({"ok": true})).is_final());
        assert!(!Event::new("chat_reply", "s1", None).is_final());
    }
}
