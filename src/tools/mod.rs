//! Tool invocation boundary
//!
//! The agent may ask the bridge to run named capabilities mid-conversation
//! (order lookup and the like). Backends are injected as [`Tool`]
//! implementations and looked up by name through a [`ToolRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// A named capability callable by the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError>;
}

type ToolFn = dyn Fn(Value) -> Result<Value, ToolError> + Send + Sync;

/// Adapts a synchronous closure into a [`Tool`].
pub struct FnTool {
    name: String,
    func: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        (self.func)(arguments)
    }
}

/// Name -> tool lookup table.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.invoke(arguments).await
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_registry() -> ToolRegistry {
        ToolRegistry::new().with_tool(FnTool::new("echo", |args| Ok(json!({ "echo": args }))))
    }

    #[tokio::test]
    async fn test_invoke_by_name() {
        let registry = echo_registry();
        let result = registry.invoke("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"echo": {"x": 1}}));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = echo_registry();
        let result = registry.invoke("missing", Value::Null).await;
        assert_eq!(result, Err(ToolError::NotFound("missing".to_string())));
    }

    #[tokio::test]
    async fn test_tool_errors_pass_through() {
        let registry = ToolRegistry::new().with_tool(FnTool::new("fail", |_| {
            Err(ToolError::Failed("Order 9 not found".to_string()))
        }));
        let err = registry.invoke("fail", Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Order 9 not found");
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = ToolRegistry::new()
            .with_tool(FnTool::new("place_order", |_| Ok(Value::Null)))
            .with_tool(FnTool::new("lookup_order", |_| Ok(Value::Null)));
        assert_eq!(registry.names(), vec!["lookup_order", "place_order"]);
        assert!(registry.contains("place_order"));
    }
}
