// Agent runner
//
// Composes a resolved agent with callbacks and tracing around one
// execution. This is the single place where failures become data: any
// error escaping the agent's stream (or a hook) is converted into one
// terminal `error` event and an errored trace. Callers of the runner never
// observe an error value - the output stream item type says so.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::error;

use crate::agent::{Agent, RunContext};
use crate::callbacks::{CallbackManager, HookContext, Moment};
use crate::event::Event;
use crate::trace::{NoopTracer, TraceStatus, Tracer};

/// Event stream produced by the runner. Unlike an agent's own stream this
/// is infallible: failures arrive as a terminal `error` event.
pub type RunnerStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Drives one agent run with hooks and tracing.
pub struct Runner {
    callbacks: Arc<CallbackManager>,
    tracer: Arc<dyn Tracer>,
}

impl Runner {
    pub fn new(callbacks: Arc<CallbackManager>, tracer: Arc<dyn Tracer>) -> Self {
        Self { callbacks, tracer }
    }

    /// Runner with no hooks and no trace persistence
    pub fn in_process() -> Self {
        Self::new(Arc::new(CallbackManager::new()), Arc::new(NoopTracer))
    }

    /// The hook registry, for callers registering instrumentation
    pub fn callbacks(&self) -> &Arc<CallbackManager> {
        &self.callbacks
    }

    /// Run an agent, recording every event against a fresh trace before it
    /// is yielded onward. The stream always ends in `final_result` or
    /// `error`.
    pub fn run_agent_with_events(&self, agent: Arc<dyn Agent>, ctx: RunContext) -> RunnerStream {
        let callbacks = Arc::clone(&self.callbacks);
        let tracer = Arc::clone(&self.tracer);

        Box::pin(stream! {
            // Diagnostic trace payload: the caller's context values plus the
            // collaborator's provider name and the configured model. Never
            // the collaborator object itself.
            let mut payload = ctx.values().clone();
            payload.insert(
                "llm_type".to_string(),
                agent
                    .llm()
                    .map(|l| Value::String(l.provider().to_string()))
                    .unwrap_or(Value::Null),
            );
            payload.insert(
                "model".to_string(),
                agent
                    .meta()
                    .and_then(|m| m.get("model"))
                    .cloned()
                    .unwrap_or(Value::Null),
            );

            let mut trace = tracer.start("agent", agent.id(), agent.version(), payload);
            let session_id = ctx.session_id.clone();

            let before = callbacks.fire(
                Moment::Before,
                "agent",
                &HookContext {
                    moment: Moment::Before,
                    kind: "agent",
                    trace: &trace,
                    agent: agent.as_ref(),
                    ctx: &ctx,
                },
            );
            if let Err(e) = before {
                error!(agent = agent.id(), error = %e, "run failed");
                let ev = Event::error(&session_id, trace.id.to_string(), e.to_string());
                tracer.record(&trace, &ev);
                tracer.finish(&mut trace, TraceStatus::Error);
                yield ev;
                return;
            }

            let mut events = agent.run_with_events(ctx.clone());
            while let Some(item) = events.next().await {
                match item {
                    Ok(ev) => {
                        let ev = ev.with_trace_id(trace.id.to_string());
                        tracer.record(&trace, &ev);
                        yield ev;
                    }
                    Err(e) => {
                        error!(agent = agent.id(), error = %e, "run failed");
                        let ev = Event::error(&session_id, trace.id.to_string(), e.to_string());
                        tracer.record(&trace, &ev);
                        tracer.finish(&mut trace, TraceStatus::Error);
                        yield ev;
                        return;
                    }
                }
            }

            let after = callbacks.fire(
                Moment::After,
                "agent",
                &HookContext {
                    moment: Moment::After,
                    kind: "agent",
                    trace: &trace,
                    agent: agent.as_ref(),
                    ctx: &ctx,
                },
            );
            match after {
                Ok(()) => tracer.finish(&mut trace, TraceStatus::Success),
                Err(e) => {
                    error!(agent = agent.id(), error = %e, "run failed");
                    let ev = Event::error(&session_id, trace.id.to_string(), e.to_string());
                    tracer.record(&trace, &ev);
                    tracer.finish(&mut trace, TraceStatus::Error);
                    yield ev;
                }
            }
        })
    }
}
