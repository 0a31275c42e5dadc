// Sequential workflow
//
// Runs its steps in list order, threading the accumulated history into
// each step's context. There is no early termination: a failing step
// aborts the whole sequence and the failure propagates to the driver.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{Agent, EventStream, RunContext};
use crate::event::{names, Event};

/// Agent that runs an ordered list of (step_id, sub-agent) pairs.
///
/// Each step receives the shared context plus a `history` array of
/// `{step, id, result}` items for the steps before it; the final result is
/// the full history.
pub struct SequentialAgent {
    id: String,
    version: String,
    steps: Vec<(String, Arc<dyn Agent>)>,
}

impl SequentialAgent {
    pub fn new(steps: Vec<(String, Arc<dyn Agent>)>) -> Self {
        Self {
            id: "sequential_workflow".to_string(),
            version: "v1".to_string(),
            steps,
        }
    }

    /// Override the workflow's registry identity
    pub fn with_identity(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.id = id.into();
        self.version = version.into();
        self
    }
}

#[async_trait]
impl Agent for SequentialAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        Box::pin(try_stream! {
            let mut history: Vec<Value> = Vec::new();
            for (idx, (step_id, step)) in self.steps.iter().enumerate() {
                let step_no = idx + 1;
                yield Event::new(
                    names::WORKFLOW_STEP_START,
                    &ctx.session_id,
                    json!({ "step": step_no, "id": step_id }),
                );

                let step_ctx = ctx
                    .clone()
                    .with("history", Value::Array(history.clone()));
                let result = step.run(step_ctx).await?;

                let item = json!({ "step": step_no, "id": step_id, "result": result });
                history.push(item.clone());
                yield Event::new(names::WORKFLOW_STEP_DONE, &ctx.session_id, item);
            }
            yield Event::final_result(&ctx.session_id, json!({ "history": history }));
        })
    }
}
