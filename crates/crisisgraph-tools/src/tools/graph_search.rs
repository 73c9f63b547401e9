//! Keyword-scored search across node collections

use crate::args;
use crate::registry::{Tool, ToolResult};
use crisisgraph_core::Collection;
use crisisgraph_kg::KnowledgeService;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub struct GraphSearchTool {
    knowledge: Arc<KnowledgeService>,
}

impl GraphSearchTool {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for GraphSearchTool {
    fn name(&self) -> &str {
        "graph_search"
    }

    fn description(&self) -> &str {
        "Search the knowledge graph by keywords. A keyword matches a node when it appears inside \
         any of the node's tags or keywords. Results are ranked by the share of keywords matched."
    }

    fn prompt(&self) -> &str {
        "Use graph_search to find cases, precedents, actions and mechanisms related to a scenario. \
         Pass short literal keywords (e.g. \"gdpr\", \"breach\"), not sentences."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": ["array", "string"],
                    "items": {"type": "string"},
                    "description": "Keywords to match, as a list or a comma-separated string"
                },
                "collections": {
                    "type": ["array", "string"],
                    "items": {"type": "string", "enum": ["cases", "precedents", "rules", "mechanisms", "actions"]},
                    "description": "Collections to search (default: cases, precedents, actions, mechanisms)"
                }
            },
            "required": ["keywords"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let keywords = match args::required_list(&args, "keywords") {
            Ok(k) => k,
            Err(e) => return e,
        };
        let collections = match args::string_list(&args, "collections") {
            Some(names) => match names
                .iter()
                .filter(|n| !n.is_empty())
                .map(|n| n.parse::<Collection>())
                .collect::<crisisgraph_core::Result<Vec<_>>>()
            {
                Ok(c) => Some(c),
                Err(e) => return e.into(),
            },
            None => None,
        };

        debug!("graph_search: {:?} in {:?}", keywords, collections);
        match self.knowledge.search(keywords.as_slice(), collections.as_deref()) {
            Ok(results) => ToolResult::json(&json!({
                "keywords": keywords,
                "count": results.len(),
                "results": results,
            })),
            Err(e) => e.into(),
        }
    }
}
