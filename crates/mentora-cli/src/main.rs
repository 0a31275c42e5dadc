// Mentora CLI
//
// Runs registered agents against an in-memory or backend-backed session and
// prints every event as one JSON line.
//
// Examples:
//   mentora list
//   mentora run echo v1 --session dev-s1 --query '{"x": 1}'
//   mentora run mentor_chat v1 --session dev-s1 --query "How do I start?"
//   mentora run-planner --session dev-s1 --title "Intro to neural networks" \
//       --goal "Build a first network"

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mentora_core::{
    register_builtins, scan_prompt_dir, AgentDeps, BackendMemory, InMemoryMemory, LlmClient,
    Memory, Registry, RunContext, Runner,
};
use mentora_openai::OpenAiClient;

#[derive(Parser)]
#[command(name = "mentora")]
#[command(about = "Mentora CLI - run tutoring agents and inspect their event streams")]
#[command(version)]
struct Cli {
    /// Directory of prompt template YAML files
    #[arg(long, env = "MENTORA_PROMPTS_DIR", default_value = "prompts")]
    prompts: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents and loaded prompts
    List,

    /// Run an agent and print its events to stdout
    Run {
        /// Agent id
        id: String,
        /// Agent version
        version: String,
        /// Session id
        #[arg(long)]
        session: String,
        /// Free text or JSON payload for the agent
        #[arg(long, default_value = "")]
        query: String,
        /// Memory backing for the session
        #[arg(long, default_value = "inmem", value_parser = ["inmem", "backend"])]
        memory: String,
    },

    /// Run the learning planner with track-creation form fields
    RunPlanner {
        #[arg(long)]
        session: String,
        #[arg(long, default_value = "Intro to neural networks")]
        title: String,
        #[arg(long, default_value = "A first course to understand the basics")]
        description: String,
        #[arg(long, default_value = "Build a first network")]
        goal: String,
        #[arg(long, default_value = "theory", value_parser = ["theory", "practice"])]
        focus: String,
        #[arg(long, default_value = "friendly", value_parser = ["strict", "friendly", "motivational", "neutral"])]
        tone: String,
        #[arg(long, default_value = "inmem", value_parser = ["inmem", "backend"])]
        memory: String,
    },
}

fn bootstrap(prompts_dir: &PathBuf) -> anyhow::Result<Arc<Registry>> {
    let mut registry = Registry::new();
    register_builtins(&mut registry);
    let templates = scan_prompt_dir(prompts_dir)
        .with_context(|| format!("scanning prompts in {}", prompts_dir.display()))?;
    registry.load_prompts(templates);
    Ok(Arc::new(registry))
}

fn make_memory(kind: &str) -> Arc<dyn Memory> {
    match kind {
        "backend" => Arc::new(BackendMemory::from_env()),
        _ => Arc::new(InMemoryMemory::new()),
    }
}

fn make_llm() -> Option<Arc<dyn LlmClient>> {
    match OpenAiClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "running without an LLM client; LLM-backed agents will fail");
            None
        }
    }
}

async fn run_agent(
    registry: Arc<Registry>,
    id: &str,
    version: &str,
    memory: Arc<dyn Memory>,
    ctx: RunContext,
) -> anyhow::Result<()> {
    let mut deps = AgentDeps::new(memory).with_registry(Arc::clone(&registry));
    if let Some(llm) = make_llm() {
        deps = deps.with_llm(llm);
    }
    let agent = registry.get_agent(id, version, deps)?;

    let runner = Runner::in_process();
    let mut events = runner.run_agent_with_events(agent, ctx);
    while let Some(ev) = events.next().await {
        println!("{}", serde_json::to_string(&ev)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let registry = bootstrap(&cli.prompts)?;

    match cli.command {
        Commands::List => {
            println!("agents:");
            for (id, version) in registry.agent_ids() {
                println!("  {id}@{version}");
            }
            println!("prompts:");
            for id in registry.prompt_ids() {
                println!("  {id}");
            }
        }

        Commands::Run {
            id,
            version,
            session,
            query,
            memory,
        } => {
            let mut ctx = RunContext::new(session).with("user_message", json!(query));
            // A JSON query is also exposed as the structured payload
            if let Ok(value) = serde_json::from_str::<Value>(&query) {
                ctx.insert("query", value);
            }
            run_agent(registry, &id, &version, make_memory(&memory), ctx).await?;
        }

        Commands::RunPlanner {
            session,
            title,
            description,
            goal,
            focus,
            tone,
            memory,
        } => {
            let query = json!({
                "title": title,
                "description": description,
                "goal": goal,
                "focus": focus,
                "tone": tone,
            });
            let ctx = RunContext::new(session).with("query", query);
            run_agent(
                registry,
                "learning_planner",
                "v1",
                make_memory(&memory),
                ctx,
            )
            .await?;
        }
    }

    Ok(())
}
