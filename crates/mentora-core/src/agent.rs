// Agent execution contract
//
// Any agent is polymorphic over one capability: produce an ordered stream of
// events for a run. The provided `run_with_events` wrapper gives every agent
// the same lifecycle guarantee:
//
//   start_agent → (domain events…) → final_result
//
// The wrapper injects `start_agent`, delegates to the implementor-supplied
// `execute` body, and synthesizes a minimal `final_result` if the body never
// emitted one. Failures are not caught here: an `Err` item ends the stream
// and propagates to whoever drives it (the runner converts, workflows don't).

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::llm::LlmClient;

/// Free-form metadata attached to agents (`model`, feature flags, …)
pub type Meta = Map<String, Value>;

/// Lazily-produced sequence of events for one run.
///
/// Dropping the stream cancels the run: execution proceeds to the next
/// suspension point and unwinds, releasing collaborator handles on the way.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<Event>> + Send + 'a>>;

/// Per-run invocation context: the session plus named payload values.
///
/// Workflows extend the context for sub-steps (`history`, `plan`, …) by
/// cloning and inserting; agents read what they need and ignore the rest.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub session_id: String,
    values: Map<String, Value>,
}

impl RunContext {
    /// Create a context for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            values: Map::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Insert a named value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Look up a named value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All named values (used by the runner for the trace payload)
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// The execution contract every agent satisfies.
///
/// Implementors supply `execute` — the run body, written as an event
/// generator. Callers use `run_with_events` (full stream) or `run` (drain to
/// the final payload); both go through the shared contract wrapper.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;

    fn version(&self) -> &str;

    /// Agent metadata. The runner reads `model` from here for trace
    /// diagnostics; agents may carry whatever else they want.
    fn meta(&self) -> Option<&Meta> {
        None
    }

    /// The LLM collaborator, if this agent has one. Only its provider name
    /// is ever recorded; the client itself is never serialized.
    fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        None
    }

    /// The run body. Yield domain events; finish with a `final_result`
    /// event carrying the run's result, or let the wrapper synthesize a
    /// minimal one. Errors end the stream and propagate to the driver.
    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a>;

    /// Run with the full lifecycle guarantee: `start_agent` first, then the
    /// body's events, then a synthesized `final_result {ok: true}` if the
    /// body finished without emitting one. An error item is re-yielded
    /// unchanged and terminates the stream without synthesis.
    fn run_with_events<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        let session_id = ctx.session_id.clone();
        Box::pin(try_stream! {
            yield Event::start_agent(&session_id, self.id(), self.version());
            let mut saw_final = false;
            let mut body = self.execute(ctx);
            while let Some(item) = body.next().await {
                let ev = item?;
                if ev.is_final() {
                    saw_final = true;
                }
                yield ev;
            }
            if !saw_final {
                yield Event::final_result(&session_id, json!({ "ok": true }));
            }
        })
    }

    /// Drain the event stream and return the payload of the last
    /// `final_result` (`{"ok": true}` when the body emitted none).
    async fn run(&self, ctx: RunContext) -> Result<Value> {
        let mut events = self.run_with_events(ctx);
        let mut result = json!({ "ok": true });
        while let Some(item) = events.next().await {
            let ev = item?;
            if ev.is_final() {
                if let Some(payload) = ev.payload {
                    result = payload;
                }
            }
        }
        Ok(result)
    }
}

// ============================================================================
// Test agents
// ============================================================================

/// Agent that immediately finishes with the context's `query` value as its
/// result. Exported for tests and examples.
pub struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    fn id(&self) -> &str {
        "echo"
    }

    fn version(&self) -> &str {
        "v1"
    }

    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        Box::pin(try_stream! {
            let payload = ctx.get("query").cloned().unwrap_or(Value::Null);
            yield Event::final_result(&ctx.session_id, payload);
        })
    }
}

/// Agent that yields a configurable number of progress events and then
/// fails. Exported for tests and examples.
pub struct FailingAgent {
    events_before_failure: usize,
    message: String,
}

impl FailingAgent {
    pub fn new(events_before_failure: usize, message: impl Into<String>) -> Self {
        Self {
            events_before_failure,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Agent for FailingAgent {
    fn id(&self) -> &str {
        "failing"
    }

    fn version(&self) -> &str {
        "v1"
    }

    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        Box::pin(try_stream! {
            for step in 0..self.events_before_failure {
                yield Event::new("working", &ctx.session_id, json!({ "step": step + 1 }));
            }
            let failure: Result<()> = Err(Error::tool(self.message.clone()));
            failure?;
        })
    }
}
