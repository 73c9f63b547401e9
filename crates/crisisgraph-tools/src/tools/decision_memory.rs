//! Decision memory tool — record decisions and consult past ones

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_core::Error;
use crisisgraph_memory::{FeedbackOutcome, MemoryStore, NewDecision, Verdict};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct DecisionMemoryTool {
    memory: Arc<MemoryStore>,
}

impl DecisionMemoryTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }

    fn record(&self, args: &Value) -> ToolResult {
        let scenario = match args::required_str(args, "scenario") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let verdict = args::optional_str(args, "verdict")
            .map(Verdict::from_label)
            .unwrap_or(Verdict::Unknown);
        let confidence = match args::optional_f64(args, "confidence") {
            Ok(c) => c,
            Err(e) => return e,
        };

        let mut decision = NewDecision::new(scenario, verdict);
        if let Some(precedent) = args::optional_str(args, "precedent_used") {
            decision = decision.with_precedent(precedent);
        }
        if let Some(rules) = args::string_list(args, "rules_cited") {
            decision = decision.with_rules(rules.into_iter().filter(|r| !r.is_empty()).collect());
        }
        if let Some(scores) = args.get("risk_scores").and_then(Value::as_object) {
            let scores: BTreeMap<String, f64> = scores
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                .collect();
            decision = decision.with_risk_scores(scores);
        }
        if let Some(c) = confidence {
            decision = decision.with_confidence(c);
        }

        match self.memory.record_decision(decision) {
            Ok(id) => ToolResult::json(&json!({"decision_id": id, "persisted": true})),
            Err(e) => e.into(),
        }
    }

    fn similar(&self, args: &Value) -> ToolResult {
        let scenario = match args::required_str(args, "scenario") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let limit = match args::optional_usize(args, "limit") {
            Ok(l) => l.unwrap_or(self.memory.config().similar_limit),
            Err(e) => return e,
        };
        let similar = self.memory.similar_decisions(scenario, limit);
        ToolResult::json(&json!({"count": similar.len(), "decisions": similar}))
    }

    fn recent(&self, args: &Value) -> ToolResult {
        let limit = match args::optional_usize(args, "limit") {
            Ok(l) => l.unwrap_or(self.memory.config().recent_limit),
            Err(e) => return e,
        };
        let recent = self.memory.recent_decisions(limit);
        ToolResult::json(&json!({"count": recent.len(), "decisions": recent}))
    }

    fn get(&self, args: &Value) -> ToolResult {
        let id = match args::required_str(args, "decision_id") {
            Ok(id) => id,
            Err(e) => return e,
        };
        match self.memory.decision_by_id(id) {
            Some(record) => ToolResult::json(&record),
            None => Error::not_found(format!("decision {}", id)).into(),
        }
    }

    fn feedback(&self, args: &Value) -> ToolResult {
        let id = match args::required_str(args, "decision_id") {
            Ok(id) => id,
            Err(e) => return e,
        };
        let outcome: FeedbackOutcome = match args::required_str(args, "outcome") {
            Ok(o) => match o.parse() {
                Ok(o) => o,
                Err(e) => return ToolResult::from(e),
            },
            Err(e) => return e,
        };
        let notes = args.get("notes").and_then(Value::as_str).unwrap_or("");
        match self.memory.add_feedback(id, outcome, notes) {
            Ok(()) => ToolResult::json(&json!({"decision_id": id, "outcome": outcome})),
            Err(e) => e.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for DecisionMemoryTool {
    fn name(&self) -> &str {
        "decision_memory"
    }

    fn description(&self) -> &str {
        "Persistent decision history. operation=record stores a verdict; similar finds past decisions \
         on overlapping scenarios; recent lists the latest; get fetches one by id; feedback records \
         whether a past decision held up; stats reports verdict counts, precedent usage and accuracy."
    }

    fn prompt(&self) -> &str {
        "Check decision_memory (operation=similar) for past verdicts on comparable scenarios before \
         deciding, and record the final verdict with operation=record."
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["record", "similar", "recent", "get", "feedback", "stats"]
                },
                "scenario": {"type": "string", "description": "Scenario text (record, similar)"},
                "verdict": {"type": "string", "enum": ["APPROVE", "REJECT", "UNKNOWN"]},
                "precedent_used": {"type": "string"},
                "rules_cited": {"type": ["array", "string"], "items": {"type": "string"}},
                "risk_scores": {"type": "object", "additionalProperties": {"type": "number"}},
                "confidence": {"type": "number"},
                "decision_id": {"type": "string", "description": "Decision id (get, feedback)"},
                "outcome": {"type": "string", "enum": ["correct", "incorrect", "partially_correct"]},
                "notes": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let operation = match args::required_str(&args, "operation") {
            Ok(op) => op,
            Err(e) => return e,
        };
        debug!("decision_memory: {}", operation);
        match operation {
            "record" => self.record(&args),
            "similar" => self.similar(&args),
            "recent" => self.recent(&args),
            "get" => self.get(&args),
            "feedback" => self.feedback(&args),
            "stats" => ToolResult::json(&self.memory.stats()),
            other => ToolResult::error(format!(
                "Unknown operation: {} (expected record, similar, recent, get, feedback or stats)",
                other
            )),
        }
    }
}
