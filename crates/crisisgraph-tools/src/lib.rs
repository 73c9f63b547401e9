//! crisisgraph-tools: the knowledge service and decision memory as named tools
//!
//! Tools take JSON arguments and return `ToolResult`s. Failures of the
//! underlying query come back as `ToolResult::Error`, never as panics.
//! `create_knowledge_registry` holds the read-only set; `create_default_registry`
//! adds the decision memory.

mod args;
pub mod registry;
pub mod tools;

pub use registry::{Tool, ToolRegistry, ToolResult};

use crisisgraph_kg::KnowledgeService;
use crisisgraph_memory::MemoryStore;
use std::sync::Arc;

/// Create the registry with every builtin tool.
pub fn create_default_registry(
    knowledge: Arc<KnowledgeService>,
    memory: Arc<MemoryStore>,
) -> ToolRegistry {
    let mut registry = create_knowledge_registry(knowledge);
    registry.register(tools::decision_memory::DecisionMemoryTool::new(memory));
    registry
}

/// Read-only registry over the knowledge graph alone.
pub fn create_knowledge_registry(knowledge: Arc<KnowledgeService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // --- Lookup and search ---
    registry.register(tools::graph_search::GraphSearchTool::new(knowledge.clone()));
    registry.register(tools::rule_lookup::RuleLookupTool::new(knowledge.clone()));
    registry.register(tools::mechanism_lookup::MechanismLookupTool::new(knowledge.clone()));

    // --- Traversal ---
    registry.register(tools::edge_traversal::EdgeTraversalTool::new(knowledge.clone()));
    registry.register(tools::path_finder::PathFinderTool::new(knowledge.clone()));
    registry.register(tools::reachable_nodes::ReachableNodesTool::new(knowledge.clone()));

    // --- Risk ---
    registry.register(tools::risk_calculator::RiskCalculatorTool::new(knowledge.clone()));
    registry.register(tools::causal_chain::CausalChainTool::new(knowledge));

    registry
}

/// Create a registry limited to `allowed_tools`. Unknown names are logged and skipped.
pub fn create_policy_registry(
    knowledge: Arc<KnowledgeService>,
    memory: Arc<MemoryStore>,
    allowed_tools: &[&str],
) -> ToolRegistry {
    let full = create_default_registry(knowledge, memory);
    let mut registry = ToolRegistry::new();
    for name in allowed_tools {
        match full.get(name) {
            Some(tool) => registry.register_shared(tool),
            None => tracing::warn!("Unknown tool in policy: {}", name),
        }
    }
    registry
}
