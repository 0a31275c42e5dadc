// Registry of agent factories, tool factories and prompt templates
//
// Three independent keyed stores, each mapping (id, version) to a factory or
// value. Registration is explicit and happens at bootstrap, before the
// registry is shared; lookups never mutate and never fall back to a
// different version than requested.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::agent::{Agent, Meta};
use crate::dialogue::RolePolicy;
use crate::error::{Error, RegistryKind, Result};
use crate::llm::LlmClient;
use crate::memory::Memory;
use crate::tools::Tool;

/// Construction arguments handed to agent factories at lookup time.
#[derive(Clone)]
pub struct AgentDeps {
    pub memory: Arc<dyn Memory>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub role_policy: RolePolicy,
    pub meta: Meta,
    /// The shared registry, for agents that resolve prompts at run time
    pub registry: Option<Arc<Registry>>,
}

impl AgentDeps {
    pub fn new(memory: Arc<dyn Memory>) -> Self {
        Self {
            memory,
            llm: None,
            role_policy: RolePolicy::default(),
            meta: Meta::new(),
            registry: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_role_policy(mut self, role_policy: RolePolicy) -> Self {
        self.role_policy = role_policy;
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// Construction arguments handed to tool factories.
#[derive(Clone, Default)]
pub struct ToolDeps {
    pub memory: Option<Arc<dyn Memory>>,
}

pub type AgentFactory = Arc<dyn Fn(AgentDeps) -> Arc<dyn Agent> + Send + Sync>;
pub type ToolFactory = Arc<dyn Fn(ToolDeps) -> Arc<dyn Tool> + Send + Sync>;

/// A prompt id with its named versions, in load order.
///
/// The last version of the last-loaded template for an id becomes that id's
/// "latest" version.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub id: String,
    pub versions: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct PromptFile {
    id: Option<String>,
    versions: Option<serde_yaml::Mapping>,
}

/// Process-wide lookup table for agents, tools and prompts.
///
/// Mutation requires `&mut self`; share as `Arc<Registry>` once populated so
/// registration happens-before every lookup.
#[derive(Default)]
pub struct Registry {
    agents: HashMap<(String, String), AgentFactory>,
    tools: HashMap<(String, String), ToolFactory>,
    prompts: HashMap<(String, String), String>,
    latest_prompts: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Agents
    // ========================================================================

    /// Register an agent factory under (id, version)
    pub fn register_agent(
        &mut self,
        id: impl Into<String>,
        version: impl Into<String>,
        factory: impl Fn(AgentDeps) -> Arc<dyn Agent> + Send + Sync + 'static,
    ) {
        self.agents
            .insert((id.into(), version.into()), Arc::new(factory));
    }

    /// Construct an agent from its registered factory
    pub fn get_agent(&self, id: &str, version: &str, deps: AgentDeps) -> Result<Arc<dyn Agent>> {
        let factory = self
            .agents
            .get(&(id.to_string(), version.to_string()))
            .ok_or_else(|| Error::not_found(RegistryKind::Agent, id, version))?;
        Ok(factory(deps))
    }

    /// Registered (id, version) pairs, for listings
    pub fn agent_ids(&self) -> Vec<(String, String)> {
        let mut ids: Vec<_> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Tools
    // ========================================================================

    /// Register a tool factory under (id, version)
    pub fn register_tool(
        &mut self,
        id: impl Into<String>,
        version: impl Into<String>,
        factory: impl Fn(ToolDeps) -> Arc<dyn Tool> + Send + Sync + 'static,
    ) {
        self.tools
            .insert((id.into(), version.into()), Arc::new(factory));
    }

    /// Construct a tool from its registered factory
    pub fn get_tool(&self, id: &str, version: &str, deps: ToolDeps) -> Result<Arc<dyn Tool>> {
        let factory = self
            .tools
            .get(&(id.to_string(), version.to_string()))
            .ok_or_else(|| Error::not_found(RegistryKind::Tool, id, version))?;
        Ok(factory(deps))
    }

    // ========================================================================
    // Prompts
    // ========================================================================

    /// Ingest prompt templates, updating the version map and each id's
    /// latest pointer.
    pub fn load_prompts(&mut self, templates: impl IntoIterator<Item = PromptTemplate>) {
        for template in templates {
            let mut last_version = None;
            for (version, text) in template.versions {
                self.prompts
                    .insert((template.id.clone(), version.clone()), text);
                last_version = Some(version);
            }
            if let Some(version) = last_version {
                self.latest_prompts.insert(template.id, version);
            }
        }
    }

    /// Clear and repopulate the prompt stores from scratch.
    ///
    /// Builds the new maps first and swaps them in together, so a failed or
    /// partial source list never leaves a half-cleared store.
    pub fn reload_prompts(&mut self, templates: impl IntoIterator<Item = PromptTemplate>) {
        let mut fresh = Registry::new();
        fresh.load_prompts(templates);
        self.prompts = fresh.prompts;
        self.latest_prompts = fresh.latest_prompts;
    }

    /// Fetch a prompt's text: the named version, or the latest loaded
    /// version when `version` is `None`.
    pub fn get_prompt(&self, id: &str, version: Option<&str>) -> Result<&str> {
        let version = match version {
            Some(v) => v,
            None => self
                .latest_prompts
                .get(id)
                .ok_or_else(|| Error::not_found(RegistryKind::Prompt, id, "latest"))?,
        };
        self.prompts
            .get(&(id.to_string(), version.to_string()))
            .map(String::as_str)
            .ok_or_else(|| Error::not_found(RegistryKind::Prompt, id, version))
    }

    /// Loaded prompt ids, for listings
    pub fn prompt_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.latest_prompts.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Read prompt templates from a directory of YAML files shaped
/// `{id, versions: {name: text}}`.
///
/// A missing directory yields no templates; files that fail to parse or
/// lack an id/versions are skipped with a warning. Files are visited in
/// sorted order so the latest pointer is stable across platforms.
pub fn scan_prompt_dir(dir: impl AsRef<Path>) -> Result<Vec<PromptTemplate>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| Error::prompt(e.to_string()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .collect();
    entries.sort();

    let mut templates = Vec::new();
    for path in entries {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable prompt file");
                continue;
            }
        };
        let parsed: PromptFile = match serde_yaml::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed prompt file");
                continue;
            }
        };
        let (Some(id), Some(versions)) = (parsed.id, parsed.versions) else {
            warn!(path = %path.display(), "skipping prompt file without id/versions");
            continue;
        };
        let versions: Vec<(String, String)> = versions
            .into_iter()
            .filter_map(|(k, v)| match (k, v) {
                (serde_yaml::Value::String(k), serde_yaml::Value::String(v)) => Some((k, v)),
                _ => None,
            })
            .collect();
        if versions.is_empty() {
            continue;
        }
        templates.push(PromptTemplate { id, versions });
    }
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::EchoAgent;
    use crate::memory::InMemoryMemory;
    use crate::tools::EchoTool;

    fn deps() -> AgentDeps {
        AgentDeps::new(Arc::new(InMemoryMemory::new()))
    }

    #[test]
    fn unregistered_agent_is_not_found() {
        let registry = Registry::new();
        let err = match registry.get_agent("ghost", "v1", deps()) {
            Ok(_) => panic!("expected get_agent to fail for unregistered agent"),
            Err(e) => e,
        };
        let text = err.to_string();
        assert!(text.contains("ghost"));
        assert!(text.contains("v1"));
        assert!(text.contains("agent"));
    }

    #[test]
    fn registered_agent_is_constructed_deterministically() {
        let mut registry = Registry::new();
        registry.register_agent("echo", "v1", |_| Arc::new(EchoAgent));

        let agent = registry.get_agent("echo", "v1", deps()).unwrap();
        assert_eq!(agent.id(), "echo");
        assert_eq!(agent.version(), "v1");

        // A different version of the same id is still absent
        assert!(registry.get_agent("echo", "v2", deps()).is_err());
    }

    #[test]
    fn tool_lookup_mirrors_agents() {
        let mut registry = Registry::new();
        assert!(registry
            .get_tool("echo", "v1", ToolDeps::default())
            .is_err());

        registry.register_tool("echo", "v1", |_| Arc::new(EchoTool));
        let tool = registry.get_tool("echo", "v1", ToolDeps::default()).unwrap();
        assert_eq!(tool.id(), "echo");
    }

    #[test]
    fn prompt_lookup_honors_versions_and_latest() {
        let mut registry = Registry::new();
        registry.load_prompts([PromptTemplate {
            id: "mentor_chat.system".to_string(),
            versions: vec![
                ("v1".to_string(), "old text".to_string()),
                ("v2".to_string(), "new text".to_string()),
            ],
        }]);

        assert_eq!(
            registry.get_prompt("mentor_chat.system", Some("v1")).unwrap(),
            "old text"
        );
        // Latest is the most recently loaded version
        assert_eq!(
            registry.get_prompt("mentor_chat.system", None).unwrap(),
            "new text"
        );
        assert!(registry.get_prompt("mentor_chat.system", Some("v9")).is_err());
        assert!(registry.get_prompt("never_loaded", None).is_err());
    }

    #[test]
    fn reload_replaces_all_prompt_state() {
        let mut registry = Registry::new();
        registry.load_prompts([PromptTemplate {
            id: "a".to_string(),
            versions: vec![("v1".to_string(), "alpha".to_string())],
        }]);
        registry.reload_prompts([PromptTemplate {
            id: "b".to_string(),
            versions: vec![("v1".to_string(), "beta".to_string())],
        }]);

        assert!(registry.get_prompt("a", None).is_err());
        assert_eq!(registry.get_prompt("b", None).unwrap(), "beta");
    }

    #[test]
    fn scans_yaml_templates_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mentor.yaml"),
            "id: mentor_chat.system\nversions:\n  v1: be kind\n  v2: be kinder\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.yaml"), ":{not yaml").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "nope").unwrap();

        let templates = scan_prompt_dir(dir.path()).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, "mentor_chat.system");
        assert_eq!(templates[0].versions.len(), 2);
        assert_eq!(templates[0].versions[1].0, "v2");

        let mut registry = Registry::new();
        registry.load_prompts(templates);
        assert_eq!(registry.get_prompt("mentor_chat.system", None).unwrap(), "be kinder");
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let templates = scan_prompt_dir("/definitely/not/here").unwrap();
        assert!(templates.is_empty());
    }
}
