//! Mechanism lookup: second-order risk and financial effects

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_core::MechanismFilter;
use crisisgraph_kg::KnowledgeService;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct MechanismLookupTool {
    knowledge: Arc<KnowledgeService>,
}

impl MechanismLookupTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for MechanismLookupTool {
    fn name(&self) -> &str {
        "mechanism_lookup"
    }

    fn description(&self) -> &str {
        "Look up mechanisms (penalty multipliers, insurance voidance and similar second-order \
         effects). Give mechanism_id for one mechanism, or mechanism_type to list risk, financial or all."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mechanism_id": {
                    "type": "string",
                    "description": "Exact mechanism id"
                },
                "mechanism_type": {
                    "type": "string",
                    "enum": ["risk", "financial", "all"],
                    "description": "Which mechanisms to list (default all)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        if let Some(id) = args::optional_str(&args, "mechanism_id") {
            return match self.knowledge.node(id) {
                Ok(node) if node.kind.is_mechanism() => ToolResult::json(node),
                Ok(node) => ToolResult::error(format!("{} is a {}, not a mechanism", id, node.kind)),
                Err(e) => e.into(),
            };
        }

        let filter: MechanismFilter = match args::parsed_or_default(&args, "mechanism_type") {
            Ok(f) => f,
            Err(e) => return e,
        };
        let mechanisms = self.knowledge.mechanisms(filter);
        ToolResult::json(&json!({
            "count": mechanisms.len(),
            "mechanisms": mechanisms,
        }))
    }
}
