//! Rule lookup

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_core::RuleFilter;
use crisisgraph_kg::KnowledgeService;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct RuleLookupTool {
    knowledge: Arc<KnowledgeService>,
}

impl RuleLookupTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for RuleLookupTool {
    fn name(&self) -> &str {
        "rule_lookup"
    }

    fn description(&self) -> &str {
        "List rules filtered by type: hard (Law_Hard, weight 10), soft (Heuristic_Soft, weight 4-9) \
         or all. Sorted by weight, heaviest first."
    }

    fn prompt(&self) -> &str {
        "Rules returned by rule_lookup are ordered by authority. A Law_Hard rule (weight 10) always \
         dominates any Heuristic_Soft rule (weight 4-9), whatever the business case for the heuristic. \
         When a law and a heuristic conflict, follow the law."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "rule_type": {
                    "type": "string",
                    "enum": ["hard", "soft", "all"],
                    "description": "Which rules to return (default all)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let filter: RuleFilter = match args::parsed_or_default(&args, "rule_type") {
            Ok(f) => f,
            Err(e) => return e,
        };
        let rules = self.knowledge.rules(filter);
        ToolResult::json(&json!({
            "count": rules.len(),
            "rules": rules,
        }))
    }
}
