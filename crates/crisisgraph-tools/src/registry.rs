//! `Tool` trait, `ToolResult`, and the name-keyed `ToolRegistry`.

use crisisgraph_core::{Error, ToolDefinition};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Outcome of one tool call. Query failures are carried as `Error`.
#[derive(Clone, Debug)]
pub enum ToolResult {
    Text(String),
    Json(Value),
    Error(String),
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }
    pub fn error(s: impl Into<String>) -> Self { Self::Error(s.into()) }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        serde_json::to_value(value)
            .map(Self::Json)
            .unwrap_or_else(|e| Self::Error(format!("Failed to serialize result: {}", e)))
    }

    /// Rendering handed back to the caller: pretty JSON, plain text, or `Error: ...`.
    pub fn to_content_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Json(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
            Self::Error(e) => format!("Error: {}", e),
        }
    }

    pub fn is_error(&self) -> bool { matches!(self, Self::Error(_)) }

    pub fn as_json(&self) -> Option<&Value> {
        if let Self::Json(v) = self { Some(v) } else { None }
    }
}

impl From<Error> for ToolResult {
    fn from(e: Error) -> Self {
        Self::Error(e.to_string())
    }
}

/// One named query over the knowledge service or the decision memory.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Stable name, e.g. "graph_search".
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Usage guidance for the orchestration layer; empty when there is none.
    fn prompt(&self) -> &str { "" }

    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> Value;

    /// Graph queries are read-only; the decision memory is not.
    fn is_read_only(&self) -> bool { true }

    fn is_enabled(&self) -> bool { true }

    async fn execute(&self, args: Value) -> ToolResult;

    /// Races `execute` against `cancel`.
    async fn execute_cancellable(&self, args: Value, cancel: CancellationToken) -> ToolResult {
        tokio::select! {
            result = self.execute(args) => result,
            _ = cancel.cancelled() => ToolResult::text("[cancelled]"),
        }
    }

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Tools keyed by name. Listings come out in name order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self { Self::default() }

    /// Adds `tool`, replacing any tool registered under the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_shared(Arc::new(tool));
    }

    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    fn resolve(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolResult> {
        match self.tools.get(name) {
            Some(tool) if tool.is_enabled() => Ok(tool),
            Some(_) => Err(ToolResult::Error(format!("Tool '{}' is disabled", name))),
            None => Err(ToolResult::Error(format!("Tool not found: {}", name))),
        }
    }

    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        match self.resolve(name) {
            Ok(tool) => {
                debug!("tool call: {} {}", name, args);
                tool.execute(args).await
            }
            Err(e) => e,
        }
    }

    pub async fn execute_cancellable(
        &self,
        name: &str,
        args: Value,
        cancel: CancellationToken,
    ) -> ToolResult {
        match self.resolve(name) {
            Ok(tool) => tool.execute_cancellable(args, cancel).await,
            Err(e) => e,
        }
    }

    fn enabled(&self) -> impl Iterator<Item = &Arc<dyn Tool>> + '_ {
        self.tools.values().filter(|t| t.is_enabled())
    }

    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        self.enabled().map(|t| t.to_definition()).collect()
    }

    /// Non-empty prompts of the enabled tools, blank-line separated.
    pub fn combined_prompts(&self) -> String {
        self.enabled()
            .map(|t| t.prompt())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn list_read_only(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter_map(|(name, t)| t.is_read_only().then_some(name.as_str()))
            .collect()
    }
}
