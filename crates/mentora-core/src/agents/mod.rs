// Built-in tutoring agents
//
// Concrete agents shipped with the core. Each exposes a `factory` suitable
// for registry registration; construction arguments arrive as AgentDeps at
// lookup time.

mod learning_planner;
mod mentor_chat;

pub use learning_planner::LearningPlannerAgent;
pub use mentor_chat::MentorChatAgent;

/// Register the built-in agents and tools under their canonical ids.
pub fn register_builtins(registry: &mut crate::registry::Registry) {
    use std::sync::Arc;

    registry.register_agent("echo", "v1", |_| Arc::new(crate::agent::EchoAgent));
    registry.register_agent("mentor_chat", "v1", |deps| {
        Arc::new(MentorChatAgent::from_deps(deps))
    });
    registry.register_agent("learning_planner", "v1", |deps| {
        Arc::new(LearningPlannerAgent::from_deps(deps))
    });
    registry.register_tool("echo", "v1", |_| Arc::new(crate::tools::EchoTool));
}
