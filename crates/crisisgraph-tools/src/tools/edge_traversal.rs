//! Edge traversal tool — the edges and neighbors of one node

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_core::Direction;
use crisisgraph_kg::KnowledgeService;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct EdgeTraversalTool {
    knowledge: Arc<KnowledgeService>,
}

impl EdgeTraversalTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for EdgeTraversalTool {
    fn name(&self) -> &str {
        "edge_traversal"
    }

    fn description(&self) -> &str {
        "Show a node and the relationships touching it (VIOLATED, COMPLIED, TRIGGERS, ...), \
         each tagged outgoing or incoming, plus the neighboring node ids."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "node_id": {
                    "type": "string",
                    "description": "Node id to inspect"
                },
                "direction": {
                    "type": "string",
                    "enum": ["out", "in", "both"],
                    "description": "Which edges to include (default both)"
                }
            },
            "required": ["node_id"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let node_id = match args::required_str(&args, "node_id") {
            Ok(id) => id,
            Err(e) => return e,
        };
        let direction: Direction = match args::parsed_or_default(&args, "direction") {
            Ok(d) => d,
            Err(e) => return e,
        };

        let node = match self.knowledge.node(node_id) {
            Ok(n) => n,
            Err(e) => return e.into(),
        };
        let edges = match self.knowledge.edges(node_id, direction) {
            Ok(edges) => edges,
            Err(e) => return e.into(),
        };
        let neighbors = match self.knowledge.neighbors(node_id, direction) {
            Ok(n) => n,
            Err(e) => return e.into(),
        };

        ToolResult::json(&json!({
            "node": node,
            "edges": edges,
            "neighbors": neighbors,
        }))
    }
}
