// Agent execution core
//
// This crate provides the agent execution core of the Mentora tutoring
// backend: a registry of versioned agent/tool/prompt factories, a uniform
// event-streaming execution contract, composable workflow patterns built on
// that contract, and a runner adding tracing and hooks around one run.
//
// Key design decisions:
// - One shared contract (the Agent trait) for leaf agents and workflow
//   patterns alike, so composition nests arbitrarily
// - Event streams are lazily-produced async streams; dropping one cancels
//   the run at the next suspension point
// - Collaborators (Memory, LlmClient, Tool, Tracer) are traits with
//   in-memory implementations for tests, examples and the CLI
// - Sub-agent failures propagate unchanged; the runner is the single place
//   that converts an error into a terminal event
// - Registration is explicit and happens at bootstrap - no import-time
//   side effects, no hidden globals

pub mod agent;
pub mod agents;
pub mod callbacks;
pub mod dialogue;
pub mod error;
pub mod event;
pub mod llm;
pub mod memory;
pub mod registry;
pub mod runner;
pub mod tools;
pub mod trace;
pub mod workflows;

// Re-exports for convenience
pub use agent::{Agent, EchoAgent, EventStream, FailingAgent, Meta, RunContext};
pub use callbacks::{CallbackManager, Handler, HookContext, Moment};
pub use dialogue::{ChatMessage, DialogueBuilder, MessageRole, RolePolicy};
pub use error::{Error, RegistryKind, Result};
pub use event::{names as event_names, Event};
pub use llm::{ChatOptions, LlmClient, LlmReply, MockLlm};
pub use memory::{BackendMemory, InMemoryMemory, Memory};
pub use registry::{
    scan_prompt_dir, AgentDeps, AgentFactory, PromptTemplate, Registry, ToolDeps, ToolFactory,
};
pub use runner::{Runner, RunnerStream};
pub use tools::{EchoTool, Tool};
pub use trace::{NoopTracer, RecordingTracer, Trace, TraceStatus, Tracer};
pub use workflows::{
    Decision, LlmReactCaller, LoopAgent, Observation, ReActAgent, ReactLlm, SequentialAgent,
    Verdict, DECIDE_PROMPT, VERDICT_PROMPT,
};

// Built-in agent re-exports
pub use agents::{register_builtins, LearningPlannerAgent, MentorChatAgent};
