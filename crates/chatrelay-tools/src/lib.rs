//! Tools the agent variant may invoke mid-reasoning.
//!
//! Each tool implements the [`Tool`] trait: a named, stateless callable the
//! model can reach for to fetch external data. The registry renders the set
//! as OpenAI-style function definitions for the completion request.

use async_trait::async_trait;

pub mod analytics;

pub use analytics::FetchAnalyticsData;

/// A named callable exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to the LLM (e.g., "fetch_analytics_data").
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Invoke the tool with the raw argument payload the model produced.
    async fn invoke(&self, input: &str) -> anyhow::Result<String>;
}

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render OpenAI-style function definitions for the completion request.
    pub fn to_llm_tools(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters_schema(),
                    }
                })
            })
            .collect()
    }
}

/// Register the built-in tool set.
pub fn register_builtin_tools(registry: &mut ToolRegistry) {
    registry.register(Box::new(FetchAnalyticsData::new()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry);

        assert_eq!(registry.list(), vec!["fetch_analytics_data"]);
        assert!(registry.get("fetch_analytics_data").is_some());
        assert!(registry.get("no_such_tool").is_none());
    }

    #[test]
    fn test_llm_tool_definitions() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry);

        let defs = registry.to_llm_tools();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0]["type"], "function");
        assert_eq!(defs[0]["function"]["name"], "fetch_analytics_data");
        assert!(defs[0]["function"]["parameters"].is_object());
    }
}
