//! One file per tool. Knowledge tools hold an `Arc<KnowledgeService>`;
//! `decision_memory` holds the `MemoryStore`.

pub mod causal_chain;
pub mod decision_memory;
pub mod edge_traversal;
pub mod graph_search;
pub mod mechanism_lookup;
pub mod path_finder;
pub mod reachable_nodes;
pub mod risk_calculator;
pub mod rule_lookup;
