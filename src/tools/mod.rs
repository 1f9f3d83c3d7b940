//! Tool trait, registry, and builtin tools.
//!
//! Every tool outcome is plain text: unknown tools, missing parameters,
//! tool errors, and panics are all turned into `"Error: ..."` strings so the
//! agent loop can feed them back to the model instead of aborting.

mod calc;
mod clock;
mod fs;
mod terminal;
mod web;

pub use calc::Calculate;
pub use clock::GetTime;
pub use fs::{ReadFile, WriteFile};
pub use terminal::ExecuteCommand;
pub use web::HttpGet;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::ToolDefinition;

/// An invocable capability advertised to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier; must not be empty.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON-Schema-like object with `properties` and `required`.
    fn input_schema(&self) -> Value;

    /// Run the tool. `workspace` is the base for relative paths.
    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String>;
}

/// Ordered set of tools keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the builtin tools.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GetTime));
        registry.register(Arc::new(ReadFile));
        registry.register(Arc::new(WriteFile));
        registry.register(Arc::new(ExecuteCommand));
        registry.register(Arc::new(Calculate));
        registry.register(Arc::new(HttpGet));
        registry
    }

    /// Insert a tool, replacing any tool with the same name in place.
    /// Tools with an empty name are ignored.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        if name.is_empty() {
            warn!("Ignoring tool registration with empty name");
            return;
        }

        match self.tools.iter().position(|t| t.name() == name) {
            Some(index) => {
                debug!(tool = %name, "Replacing registered tool");
                self.tools[index] = tool;
            }
            None => {
                debug!(tool = %name, "Registered tool");
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Run a tool by name. Never fails: every error becomes an `"Error: ..."` string.
    pub async fn execute(&self, name: &str, params: Value, workspace: &Path) -> String {
        let Some(tool) = self.get(name) else {
            return format!("Error: Tool '{}' not found", name);
        };

        if let Some(field) = missing_required_field(&tool.input_schema(), &params) {
            return format!("Error: Missing required parameter '{}'", field);
        }

        match AssertUnwindSafe(tool.execute(params, workspace))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => format!("Error: {}", e),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, "Tool panicked: {}", message);
                format!("Error: Tool '{}' panicked: {}", name, message)
            }
        }
    }

    /// Schema records for every tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// First field listed in the schema's `required` array that `params` lacks.
fn missing_required_field(schema: &Value, params: &Value) -> Option<String> {
    let required = schema.get("required")?.as_array()?;
    required
        .iter()
        .filter_map(Value::as_str)
        .find(|field| params.get(*field).map_or(true, Value::is_null))
        .map(str::to_string)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    fn ws() -> &'static Path {
        Path::new(".")
    }

    #[tokio::test]
    async fn unknown_tool_returns_not_found_string() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.execute("nonexistent", json!({}), ws()).await,
            "Error: Tool 'nonexistent' not found"
        );
    }

    #[tokio::test]
    async fn registration_order_does_not_affect_execution() {
        let a = Fixed { name: "alpha", description: "a", output: "from alpha" };
        let b = Fixed { name: "beta", description: "b", output: "from beta" };

        let mut only_beta = ToolRegistry::new();
        only_beta.register(Arc::new(b));
        let expected = only_beta.execute("beta", json!({}), ws()).await;

        let mut forward = ToolRegistry::new();
        forward.register(Arc::new(a));
        forward.register(Arc::new(b));

        let mut reverse = ToolRegistry::new();
        reverse.register(Arc::new(b));
        reverse.register(Arc::new(a));

        assert_eq!(forward.execute("beta", json!({}), ws()).await, expected);
        assert_eq!(reverse.execute("beta", json!({}), ws()).await, expected);
    }

    #[tokio::test]
    async fn re_registering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Fixed { name: "dup", description: "old", output: "old" }));
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Fixed { name: "dup", description: "new", output: "new" }));

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["dup", "echo"]);
        assert_eq!(defs[0].description, "new");
        assert_eq!(registry.execute("dup", json!({}), ws()).await, "new");
    }

    #[test]
    fn empty_name_is_not_registered() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Fixed { name: "", description: "nameless", output: "" }));
        assert!(!registry.has_tools());
        assert!(registry.is_empty());
    }

    #[test]
    fn definitions_export_schema_records() {
        let mut registry = ToolRegistry::new();
        assert!(registry.definitions().is_empty());
        registry.register(Arc::new(Echo));
        assert!(registry.has_tools());
        assert_eq!(
            registry.definitions(),
            vec![ToolDefinition {
                name: "echo".to_string(),
                description: "Echo the text parameter".to_string(),
                input_schema: Echo.input_schema(),
            }]
        );
    }

    #[tokio::test]
    async fn tool_failure_becomes_error_string() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Failing));
        assert_eq!(
            registry.execute("failing", json!({}), ws()).await,
            "Error: disk on fire"
        );
    }

    #[tokio::test]
    async fn tool_panic_becomes_error_string() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Panicking));
        let result = registry.execute("panicking", json!({}), ws()).await;
        assert!(result.starts_with("Error: "), "got: {}", result);
        assert!(result.contains("unexpected state"));
    }

    #[tokio::test]
    async fn missing_required_parameter_is_reported() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        assert_eq!(
            registry.execute("echo", json!({}), ws()).await,
            "Error: Missing required parameter 'text'"
        );
        assert_eq!(
            registry.execute("echo", Value::Null, ws()).await,
            "Error: Missing required parameter 'text'"
        );
        assert_eq!(registry.execute("echo", json!({"text": "hi"}), ws()).await, "hi");
    }

    #[test]
    fn builtin_tools_are_registered_in_order() {
        let registry = ToolRegistry::with_builtin_tools();
        assert_eq!(
            registry.names(),
            vec!["get_time", "read_file", "write_file", "execute_command", "calculate", "http_get"]
        );
    }
}
