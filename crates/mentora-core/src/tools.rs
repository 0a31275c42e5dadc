// Tool collaborator contract
//
// Tools are versioned like agents and registered in the same registry.
// A tool exposes a JSON-schema description of its parameters (handed to
// tool-calling LLMs) and an async `run` taking JSON arguments.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;

/// Trait for implementing tools invocable by agents and by tool-calling
/// LLM rounds.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique id within a registry version slot
    fn id(&self) -> &str;

    fn version(&self) -> &str {
        "v1"
    }

    /// Description handed to the LLM so it knows when to call the tool
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    /// Execute with JSON arguments. Failures propagate to the calling
    /// agent unchanged.
    async fn run(&self, args: Value) -> Result<Value>;
}

// ============================================================================
// Built-in tools
// ============================================================================

/// Tool that echoes its arguments back. Exported for tests and examples.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn id(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the provided arguments back as the result"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Text to echo back"
                }
            }
        })
    }

    async fn run(&self, args: Value) -> Result<Value> {
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_tool_returns_arguments() {
        let tool = EchoTool;
        let result = tool.run(json!({ "message": "hi" })).await.unwrap();
        assert_eq!(result["message"], "hi");
    }

    #[test]
    fn echo_tool_describes_itself() {
        let tool = EchoTool;
        assert_eq!(tool.id(), "echo");
        assert_eq!(tool.version(), "v1");
        assert_eq!(tool.parameters_schema()["type"], "object");
    }
}
