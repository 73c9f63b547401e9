//! Core types for crisisgraph

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Node kind, as written in the `type` field of the knowledge base.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Case,
    Precedent,
    #[serde(rename = "Law_Hard")]
    LawHard,
    #[serde(rename = "Heuristic_Soft")]
    HeuristicSoft,
    #[serde(rename = "Risk_Mechanism")]
    RiskMechanism,
    #[serde(rename = "Financial_Mechanism")]
    FinancialMechanism,
    Action,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Case => "Case",
            Self::Precedent => "Precedent",
            Self::LawHard => "Law_Hard",
            Self::HeuristicSoft => "Heuristic_Soft",
            Self::RiskMechanism => "Risk_Mechanism",
            Self::FinancialMechanism => "Financial_Mechanism",
            Self::Action => "Action",
        }
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, Self::LawHard | Self::HeuristicSoft)
    }

    pub fn is_mechanism(&self) -> bool {
        matches!(self, Self::RiskMechanism | Self::FinancialMechanism)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Case" => Ok(Self::Case),
            "Precedent" => Ok(Self::Precedent),
            "Law_Hard" => Ok(Self::LawHard),
            "Heuristic_Soft" => Ok(Self::HeuristicSoft),
            "Risk_Mechanism" => Ok(Self::RiskMechanism),
            "Financial_Mechanism" => Ok(Self::FinancialMechanism),
            "Action" => Ok(Self::Action),
            other => Err(Error::invalid_argument(format!("unknown node kind: {}", other))),
        }
    }
}

/// Top-level collections of the knowledge-base document.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Cases,
    Precedents,
    Rules,
    Mechanisms,
    Actions,
}

impl Collection {
    /// Load order.
    pub const ALL: [Collection; 5] = [
        Self::Cases,
        Self::Precedents,
        Self::Rules,
        Self::Mechanisms,
        Self::Actions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cases => "cases",
            Self::Precedents => "precedents",
            Self::Rules => "rules",
            Self::Mechanisms => "mechanisms",
            Self::Actions => "actions",
        }
    }

    /// Kind assigned to records that carry no `type` field.
    /// Rules and mechanisms have no default: their weight class must be explicit.
    pub fn default_kind(&self) -> Option<NodeKind> {
        match self {
            Self::Cases => Some(NodeKind::Case),
            Self::Precedents => Some(NodeKind::Precedent),
            Self::Actions => Some(NodeKind::Action),
            Self::Rules | Self::Mechanisms => None,
        }
    }

    pub fn accepts(&self, kind: NodeKind) -> bool {
        match self {
            Self::Cases => kind == NodeKind::Case,
            Self::Precedents => kind == NodeKind::Precedent,
            Self::Rules => kind.is_rule(),
            Self::Mechanisms => kind.is_mechanism(),
            Self::Actions => kind == NodeKind::Action,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cases" => Ok(Self::Cases),
            "precedents" => Ok(Self::Precedents),
            "rules" => Ok(Self::Rules),
            "mechanisms" => Ok(Self::Mechanisms),
            "actions" => Ok(Self::Actions),
            other => Err(Error::invalid_argument(format!("unknown collection: {}", other))),
        }
    }
}

// ===========================================================================
// Kind-specific payloads
// ===========================================================================
//
// Only `weight`, `multiplier_value` and the text fields the evaluator reads are
// typed. Descriptive attributes keep whatever JSON the document carries.

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaseAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dilemma: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_fact: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrecedentAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consequence: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_citation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleAttrs {
    /// Law_Hard carries 10, Heuristic_Soft 4 to 9.
    pub weight: u32,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MechanismAttrs {
    pub definition: String,
    pub effect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_impact: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_exposure: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActionAttrs {
    pub description: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NodePayload {
    Case(CaseAttrs),
    Precedent(PrecedentAttrs),
    Rule(RuleAttrs),
    Mechanism(MechanismAttrs),
    Action(ActionAttrs),
}

/// A typed entity in the knowledge graph.
///
/// Serializes flat: the envelope (`id`, `type`, `tags`, `keywords`) followed by
/// the kind-specific fields.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub payload: NodePayload,
}

impl Node {
    pub fn collection(&self) -> Collection {
        match self.payload {
            NodePayload::Case(_) => Collection::Cases,
            NodePayload::Precedent(_) => Collection::Precedents,
            NodePayload::Rule(_) => Collection::Rules,
            NodePayload::Mechanism(_) => Collection::Mechanisms,
            NodePayload::Action(_) => Collection::Actions,
        }
    }

    /// Tags followed by keywords. Both are lowercased at load.
    pub fn searchable(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().chain(self.keywords.iter()).map(String::as_str)
    }

    /// Substring containment against any tag or keyword.
    /// "ai" matches "claim": that over-match is part of the contract.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.searchable().any(|s| s.contains(keyword))
    }

    pub fn as_rule(&self) -> Option<&RuleAttrs> {
        match &self.payload {
            NodePayload::Rule(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_mechanism(&self) -> Option<&MechanismAttrs> {
        match &self.payload {
            NodePayload::Mechanism(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_precedent(&self) -> Option<&PrecedentAttrs> {
        match &self.payload {
            NodePayload::Precedent(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionAttrs> {
        match &self.payload {
            NodePayload::Action(a) => Some(a),
            _ => None,
        }
    }

    /// Rule weight, 0 for every other kind.
    pub fn weight(&self) -> u32 {
        self.as_rule().map(|r| r.weight).unwrap_or(0)
    }
}

/// A node returned by keyword search, with its relevance.
#[derive(Clone, Debug, Serialize)]
pub struct ScoredNode {
    #[serde(flatten)]
    pub node: Node,
    pub match_score: f64,
    #[serde(rename = "_collection")]
    pub collection: Collection,
}

// ===========================================================================
// Edges
// ===========================================================================

/// A directed, labeled relationship. The same pair may carry several labels.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relationship: String,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
        }
    }
}

/// Neighbor direction for adjacency queries.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
    #[default]
    Both,
}

impl Direction {
    /// Whether an edge seen from one of its endpoints falls inside this direction.
    pub fn admits(self, edge: EdgeDirection) -> bool {
        match self {
            Self::Out => edge == EdgeDirection::Outgoing,
            Self::In => edge == EdgeDirection::Incoming,
            Self::Both => true,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "out" | "outgoing" => Ok(Self::Out),
            "in" | "incoming" => Ok(Self::In),
            "both" => Ok(Self::Both),
            other => Err(Error::invalid_argument(format!("unknown direction: {}", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
}

/// An edge seen from one of its endpoints.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ConnectedEdge {
    pub direction: EdgeDirection,
    #[serde(flatten)]
    pub edge: Edge,
}

// ===========================================================================
// Filters
// ===========================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleFilter {
    Hard,
    Soft,
    #[default]
    All,
}

impl RuleFilter {
    pub fn admits(&self, kind: NodeKind) -> bool {
        match self {
            Self::Hard => kind == NodeKind::LawHard,
            Self::Soft => kind == NodeKind::HeuristicSoft,
            Self::All => kind.is_rule(),
        }
    }
}

impl FromStr for RuleFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "soft" => Ok(Self::Soft),
            "all" | "" => Ok(Self::All),
            other => Err(Error::invalid_argument(format!(
                "unknown rule type '{}' (expected hard, soft or all)",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MechanismFilter {
    Risk,
    Financial,
    #[default]
    All,
}

impl MechanismFilter {
    pub fn admits(&self, kind: NodeKind) -> bool {
        match self {
            Self::Risk => kind == NodeKind::RiskMechanism,
            Self::Financial => kind == NodeKind::FinancialMechanism,
            Self::All => kind.is_mechanism(),
        }
    }
}

impl FromStr for MechanismFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "risk" => Ok(Self::Risk),
            "financial" => Ok(Self::Financial),
            "all" | "" => Ok(Self::All),
            other => Err(Error::invalid_argument(format!(
                "unknown mechanism type '{}' (expected risk, financial or all)",
                other
            ))),
        }
    }
}

/// Tool definition handed to the orchestration layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}
