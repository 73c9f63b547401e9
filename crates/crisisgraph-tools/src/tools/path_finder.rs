//! Shortest path or all simple paths between two nodes.

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_kg::KnowledgeService;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub struct PathFinderTool {
    knowledge: Arc<KnowledgeService>,
}

impl PathFinderTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for PathFinderTool {
    fn name(&self) -> &str {
        "path_finder"
    }

    fn description(&self) -> &str {
        "Find how two nodes are connected along outgoing edges. Returns the shortest path, or every \
         simple path when all_paths is true."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start": {"type": "string", "description": "Start node id"},
                "end": {"type": "string", "description": "End node id"},
                "max_depth": {
                    "type": "integer",
                    "description": "Hop bound for the shortest path, node bound for all paths"
                },
                "all_paths": {
                    "type": "boolean",
                    "description": "Enumerate every simple path instead of the shortest (default false)"
                }
            },
            "required": ["start", "end"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let start = match args::required_str(&args, "start") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let end = match args::required_str(&args, "end") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let max_depth = match args::optional_usize(&args, "max_depth") {
            Ok(d) => d,
            Err(e) => return e,
        };
        let all = args.get("all_paths").and_then(Value::as_bool).unwrap_or(false);

        debug!("path_finder: {} -> {} (all: {})", start, end, all);
        if all {
            match self.knowledge.all_paths(start, end, max_depth) {
                Ok(paths) => ToolResult::json(&json!({
                    "start": start,
                    "end": end,
                    "count": paths.len(),
                    "paths": paths,
                })),
                Err(e) => e.into(),
            }
        } else {
            match self.knowledge.shortest_path(start, end, max_depth) {
                Ok(path) => ToolResult::json(&json!({
                    "start": start,
                    "end": end,
                    "found": path.is_some(),
                    "hops": path.as_ref().map(|p| p.len() - 1),
                    "path": path,
                })),
                Err(e) => e.into(),
            }
        }
    }
}
