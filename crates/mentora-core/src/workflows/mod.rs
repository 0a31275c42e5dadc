// Workflow patterns
//
// Composition strategies that produce an agent out of other agents. Every
// pattern implements the same Agent contract its steps do, so workflows
// nest arbitrarily: a step of a Sequential may itself be a Loop whose
// check agent is a ReAct, and so on. Patterns hold `Arc<dyn Agent>`
// references - never concrete types - and none of them catches a
// sub-agent failure.

mod r#loop;
mod react;
mod sequential;

pub use r#loop::LoopAgent;
pub use react::{
    Decision, LlmReactCaller, Observation, ReActAgent, ReactLlm, Verdict, DECIDE_PROMPT,
    VERDICT_PROMPT,
};
pub use sequential::SequentialAgent;
