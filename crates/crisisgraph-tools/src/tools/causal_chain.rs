//! Causal chain tool — action → mechanisms → rules → precedents

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_kg::KnowledgeService;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct CausalChainTool {
    knowledge: Arc<KnowledgeService>,
}

impl CausalChainTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for CausalChainTool {
    fn name(&self) -> &str {
        "causal_chain_trace"
    }

    fn description(&self) -> &str {
        "Trace the consequences of an action: the first action matching the keywords, the mechanisms \
         it triggers, the rules it violates or complies with, matching precedents, and the composed \
         financial exposure."
    }

    fn prompt(&self) -> &str {
        "Before recommending an action, run causal_chain_trace on it. Mechanism multipliers compound: \
         two triggered multipliers of 3 mean nine times the base penalty."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action_keywords": {
                    "type": ["array", "string"],
                    "items": {"type": "string"},
                    "description": "Keywords identifying the action (e.g. [\"delay\", \"notification\"])"
                }
            },
            "required": ["action_keywords"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let keywords = match args::required_list(&args, "action_keywords") {
            Ok(k) => k,
            Err(e) => return e,
        };
        debug!("causal_chain_trace: {:?}", keywords);
        match self.knowledge.trace_causal_chain(keywords.as_slice()) {
            Ok(report) => ToolResult::json(&report),
            Err(e) => e.into(),
        }
    }
}
