// Loop workflow
//
// Plan / act / check cycle bounded by max_steps. The check agent's result
// decides termination: a `done: true` field stops the loop early. Whether
// the loop stopped early or ran out of steps, the final result carries the
// full iteration history.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{Agent, EventStream, RunContext};
use crate::event::{names, Event};

const DEFAULT_MAX_STEPS: usize = 10;

/// Agent that iterates three fixed-role sub-agents until the check agent
/// signals done or `max_steps` iterations have run.
///
/// Each iteration appends `{step, plan, act, check}` to the history; the
/// plan agent sees the history, the act agent additionally sees the plan,
/// and the check agent sees plan and act result both.
pub struct LoopAgent {
    id: String,
    version: String,
    plan: Arc<dyn Agent>,
    act: Arc<dyn Agent>,
    check: Arc<dyn Agent>,
    max_steps: usize,
}

impl LoopAgent {
    pub fn new(plan: Arc<dyn Agent>, act: Arc<dyn Agent>, check: Arc<dyn Agent>) -> Self {
        Self {
            id: "loop_workflow".to_string(),
            version: "v1".to_string(),
            plan,
            act,
            check,
            max_steps: DEFAULT_MAX_STEPS,
        }
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

    /// A check result terminates the loop iff it carries `done: true`.
    fn is_done(check: &Value) -> bool {
        check
            .get("done")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Agent for LoopAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
        Box::pin(try_stream! {
            let mut history: Vec<Value> = Vec::new();
            for step in 1..=self.max_steps {
                yield Event::new(
                    names::LOOP_STEP_START,
                    &ctx.session_id,
                    json!({ "step": step }),
                );

                let history_value = Value::Array(history.clone());
                let plan = self
                    .plan
                    .run(ctx.clone().with("history", history_value.clone()))
                    .await?;
                let act = self
                    .act
                    .run(
                        ctx.clone()
                            .with("plan", plan.clone())
                            .with("history", history_value.clone()),
                    )
                    .await?;
                let check = self
                    .check
                    .run(
                        ctx.clone()
                            .with("result", act.clone())
                            .with("plan", plan.clone())
                            .with("history", history_value),
                    )
                    .await?;

                let item = json!({ "step": step, "plan": plan, "act": act, "check": check });
                history.push(item.clone());
                yield Event::new(names::LOOP_STEP_DONE, &ctx.session_id, item);

                if Self::is_done(&check) {
                    break;
                }
            }
            yield Event::final_result(&ctx.session_id, json!({ "history": history }));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::event::Event;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Sub-agent that replays scripted results and counts its runs.
    struct StubRole {
        replies: Mutex<VecDeque<Value>>,
        fallback: Value,
        runs: Arc<Mutex<usize>>,
    }

    impl StubRole {
        fn constant(value: Value) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::new()),
                fallback: value,
                runs: Arc::new(Mutex::new(0)),
            })
        }

        fn scripted(replies: Vec<Value>, fallback: Value) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                fallback,
                runs: Arc::new(Mutex::new(0)),
            })
        }
    }

    #[async_trait]
    impl Agent for StubRole {
        fn id(&self) -> &str {
            "stub_role"
        }
        fn version(&self) -> &str {
            "v1"
        }
        fn execute<'a>(&'a self, ctx: RunContext) -> EventStream<'a> {
            Box::pin(try_stream! {
                *self.runs.lock().unwrap() += 1;
                let reply = self
                    .replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| self.fallback.clone());
                yield Event::final_result(&ctx.session_id, reply);
            })
        }
    }

    async fn event_kinds(agent: &dyn Agent, ctx: RunContext) -> Vec<String> {
        let mut stream = agent.run_with_events(ctx);
        let mut kinds = Vec::new();
        while let Some(item) = stream.next().await {
            let item: Result<Event> = item;
            kinds.push(item.unwrap().event);
        }
        kinds
    }

    #[tokio::test]
    async fn runs_exactly_max_steps_when_check_never_signals_done() {
        let plan = StubRole::constant(json!("plan"));
        let plan_runs = Arc::clone(&plan.runs);
        let workflow = LoopAgent::new(
            plan,
            StubRole::constant(json!("act")),
            StubRole::constant(json!({ "done": false })),
        )
        .with_max_steps(3);

        let result = workflow.run(RunContext::new("s1")).await.unwrap();
        let history = result["history"].as_array().unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(*plan_runs.lock().unwrap(), 3);
        assert_eq!(history[2]["step"], 3);
    }

    #[tokio::test]
    async fn emits_three_step_pairs_then_final_result() {
        let workflow = LoopAgent::new(
            StubRole::constant(json!("plan")),
            StubRole::constant(json!("act")),
            StubRole::constant(json!({ "done": false })),
        )
        .with_max_steps(3);

        let kinds = event_kinds(&workflow, RunContext::new("s1")).await;
        let starts = kinds.iter().filter(|k| *k == names::LOOP_STEP_START).count();
        let dones = kinds.iter().filter(|k| *k == names::LOOP_STEP_DONE).count();

        assert_eq!(starts, 3);
        assert_eq!(dones, 3);
        assert_eq!(kinds.last().unwrap(), names::FINAL_RESULT);
    }

    #[tokio::test]
    async fn stops_as_soon_as_check_signals_done() {
        let check = StubRole::scripted(
            vec![json!({ "done": false }), json!({ "done": true })],
            json!({ "done": false }),
        );
        let check_runs = Arc::clone(&check.runs);

        let workflow = LoopAgent::new(
            StubRole::constant(json!("plan")),
            StubRole::constant(json!("act")),
            check,
        )
        .with_max_steps(5);

        let result = workflow.run(RunContext::new("s1")).await.unwrap();
        let history = result["history"].as_array().unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(*check_runs.lock().unwrap(), 2);
        assert_eq!(history[1]["check"]["done"], true);
    }

    #[tokio::test]
    async fn history_items_carry_plan_act_and_check() {
        let workflow = LoopAgent::new(
            StubRole::constant(json!("the plan")),
            StubRole::constant(json!({ "answer": 42 })),
            StubRole::constant(json!({ "done": true, "score": 1.0 })),
        );

        let result = workflow.run(RunContext::new("s1")).await.unwrap();
        let item = &result["history"][0];

        assert_eq!(item["step"], 1);
        assert_eq!(item["plan"], "the plan");
        assert_eq!(item["act"]["answer"], 42);
        assert_eq!(item["check"]["score"], 1.0);
    }

    #[tokio::test]
    async fn check_without_done_field_keeps_looping() {
        let workflow = LoopAgent::new(
            StubRole::constant(json!("plan")),
            StubRole::constant(json!("act")),
            StubRole::constant(json!({ "verdict": "unclear" })),
        )
        .with_max_steps(2);

        let result = workflow.run(RunContext::new("s1")).await.unwrap();
        assert_eq!(result["history"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn role_failure_aborts_the_loop() {
        let workflow = LoopAgent::new(
            StubRole::constant(json!("plan")),
            Arc::new(crate::agent::FailingAgent::new(0, "act failed")),
            StubRole::constant(json!({ "done": false })),
        )
        .with_max_steps(3);

        let err = workflow.run(RunContext::new("s1")).await.unwrap_err();
        assert!(err.to_string().contains("act failed"));
    }
}
