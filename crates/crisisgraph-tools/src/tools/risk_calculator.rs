//! Risk calculator tool — financial, ethical and legal scores for a scenario

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_kg::{format_usd, KnowledgeService};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct RiskCalculatorTool {
    knowledge: Arc<KnowledgeService>,
}

impl RiskCalculatorTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for RiskCalculatorTool {
    fn name(&self) -> &str {
        "risk_calculator"
    }

    fn description(&self) -> &str {
        "Score a proposed course of action on financial, ethical and legal risk (3-10 each). \
         Detects concealment (penalty multiplier) and insurance voidance, and computes total exposure."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "The proposed action or scenario, in plain text"
                }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let description = match args::required_str(&args, "description") {
            Ok(d) => d,
            Err(e) => return e,
        };
        let assessment = self.knowledge.score_risk(description);
        ToolResult::json(&json!({
            "assessment": assessment,
            "total_exposure_usd": format_usd(assessment.total_exposure),
        }))
    }
}
