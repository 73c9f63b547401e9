//! Reachable nodes within N hops, with their distances

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_kg::KnowledgeService;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ReachableNodesTool {
    knowledge: Arc<KnowledgeService>,
}

impl ReachableNodesTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for ReachableNodesTool {
    fn name(&self) -> &str {
        "reachable_nodes"
    }

    fn description(&self) -> &str {
        "List every node reachable from a start node along outgoing edges within max_depth hops, \
         nearest first, with its minimum hop distance."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start": {"type": "string", "description": "Start node id"},
                "max_depth": {"type": "integer", "description": "Hop bound (default 5)"}
            },
            "required": ["start"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let start = match args::required_str(&args, "start") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let max_depth = match args::optional_usize(&args, "max_depth") {
            Ok(d) => d,
            Err(e) => return e,
        };
        match self.knowledge.reachable(start, max_depth) {
            Ok(reached) => ToolResult::json(&json!({
                "start": start,
                "count": reached.len(),
                "max_distance": reached.max_distance(),
                "reachable": reached,
            })),
            Err(e) => e.into(),
        }
    }
}
