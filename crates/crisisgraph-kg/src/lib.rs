//! crisisgraph-kg — knowledge-graph reasoning over a read-only graph
//!
//! Loads cases, precedents, rules, mechanisms and actions with their typed edges,
//! indexes them once, and answers lookup, adjacency, path, reachability,
//! keyword-search, risk and causal-chain queries.

pub mod query;
pub mod risk;
pub mod service;
pub mod store;
pub mod traversal;

pub use query::normalize_keywords;
pub use risk::{
    format_usd, ChainReport, RiskAssessment, RiskEvaluator, RiskLevel, CONCEALMENT_MECHANISM,
    INSURANCE_VOID_MECHANISM,
};
pub use service::KnowledgeService;
pub use store::GraphStore;
pub use traversal::{Reached, ReachableSet};
