//! Graph store: owns the node and edge collections and the three lookup indices.
//!
//! Built once from the knowledge-base document and read-only afterwards.
//! Every edge endpoint must name a loaded node, and node ids are unique across
//! all collections; a document breaking either rule fails to load as a whole.

use crisisgraph_core::{
    ActionAttrs, CaseAttrs, Collection, ConnectedEdge, Direction, Edge, EdgeDirection, Error,
    MechanismAttrs, Node, NodeKind, NodePayload, PrecedentAttrs, Result, RuleAttrs,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Knowledge-base document as it appears on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KnowledgeBaseDocument {
    cases: Vec<RawNode>,
    precedents: Vec<RawNode>,
    rules: Vec<RawNode>,
    mechanisms: Vec<RawNode>,
    actions: Vec<RawNode>,
    edges: Vec<Edge>,
}

impl KnowledgeBaseDocument {
    fn take(&mut self, collection: Collection) -> Vec<RawNode> {
        std::mem::take(match collection {
            Collection::Cases => &mut self.cases,
            Collection::Precedents => &mut self.precedents,
            Collection::Rules => &mut self.rules,
            Collection::Mechanisms => &mut self.mechanisms,
            Collection::Actions => &mut self.actions,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default, rename = "type", alias = "kind")]
    kind: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(flatten)]
    attrs: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    /// All nodes in load order (collection order, then document order).
    nodes: Vec<Node>,
    collections: BTreeMap<Collection, Vec<usize>>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    source_index: HashMap<String, Vec<Edge>>,
    target_index: HashMap<String, Vec<Edge>>,
}

impl GraphStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a knowledge-base JSON file.
    ///
    /// A missing file yields an empty graph so the service stays usable;
    /// a file that exists but does not parse is a `Load` error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No knowledge base at {}, starting with an empty graph", path.display());
                return Ok(Self::empty());
            }
            Err(e) => return Err(Error::load(path, e.to_string())),
        };
        let store = Self::from_json(&content, path)?;
        info!(
            "Loaded knowledge base from {} ({} nodes, {} edges)",
            path.display(),
            store.node_count(),
            store.edge_count()
        );
        Ok(store)
    }

    /// Parse a knowledge-base document. `origin` only labels errors.
    pub fn from_json(content: &str, origin: &Path) -> Result<Self> {
        let mut doc: KnowledgeBaseDocument =
            serde_json::from_str(content).map_err(|e| Error::load(origin, e.to_string()))?;

        let mut store = Self::empty();
        for collection in Collection::ALL {
            for raw in doc.take(collection) {
                let node = convert_node(collection, raw).map_err(|reason| Error::load(origin, reason))?;
                store.insert_node(node).map_err(|reason| Error::load(origin, reason))?;
            }
        }
        for edge in std::mem::take(&mut doc.edges) {
            store.insert_edge(edge).map_err(|reason| Error::load(origin, reason))?;
        }
        debug!("Indexed {} nodes and {} edges", store.node_count(), store.edge_count());
        Ok(store)
    }

    fn insert_node(&mut self, node: Node) -> std::result::Result<(), String> {
        if self.node_index.contains_key(&node.id) {
            return Err(format!("duplicate node id: {}", node.id));
        }
        let idx = self.nodes.len();
        self.node_index.insert(node.id.clone(), idx);
        self.collections.entry(node.collection()).or_default().push(idx);
        self.nodes.push(node);
        Ok(())
    }

    fn insert_edge(&mut self, edge: Edge) -> std::result::Result<(), String> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.node_index.contains_key(endpoint) {
                return Err(format!(
                    "edge {} -[{}]-> {} references unknown node {}",
                    edge.source, edge.relationship, edge.target, endpoint
                ));
            }
        }
        self.source_index.entry(edge.source.clone()).or_default().push(edge.clone());
        self.target_index.entry(edge.target.clone()).or_default().push(edge.clone());
        self.edges.push(edge);
        Ok(())
    }

    // ===========================================================================
    // Collections
    // ===========================================================================

    /// Nodes of one collection in load order.
    pub fn collection(&self, collection: Collection) -> impl Iterator<Item = &Node> {
        self.collections
            .get(&collection)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.nodes[idx])
    }

    pub fn cases(&self) -> impl Iterator<Item = &Node> {
        self.collection(Collection::Cases)
    }

    pub fn precedents(&self) -> impl Iterator<Item = &Node> {
        self.collection(Collection::Precedents)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Node> {
        self.collection(Collection::Rules)
    }

    pub fn mechanisms(&self) -> impl Iterator<Item = &Node> {
        self.collection(Collection::Mechanisms)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Node> {
        self.collection(Collection::Actions)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ===========================================================================
    // Adjacency
    // ===========================================================================

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Edges leaving `id`, in load order. Empty for unknown ids.
    pub fn get_outgoing_edges(&self, id: &str) -> &[Edge] {
        self.source_index.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges entering `id`, in load order. Empty for unknown ids.
    pub fn get_incoming_edges(&self, id: &str) -> &[Edge] {
        self.target_index.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Deduplicated neighbor ids.
    pub fn get_neighbors(&self, id: &str, direction: Direction) -> BTreeSet<String> {
        let mut neighbors = BTreeSet::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            neighbors.extend(self.get_outgoing_edges(id).iter().map(|e| e.target.clone()));
        }
        if matches!(direction, Direction::In | Direction::Both) {
            neighbors.extend(self.get_incoming_edges(id).iter().map(|e| e.source.clone()));
        }
        neighbors
    }

    /// Outgoing neighbors in first-edge order, each id once. Traversal expands
    /// through this so results depend only on the document's edge order.
    pub(crate) fn out_neighbors(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.get_outgoing_edges(id)
            .iter()
            .map(|e| e.target.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Every edge touching `id`: outgoing first, then incoming. A self-loop is
    /// reported once, as outgoing.
    pub fn edges_of(&self, id: &str) -> Vec<ConnectedEdge> {
        let outgoing = self.get_outgoing_edges(id).iter().map(|e| ConnectedEdge {
            direction: EdgeDirection::Outgoing,
            edge: e.clone(),
        });
        let incoming = self
            .get_incoming_edges(id)
            .iter()
            .filter(|e| e.source != e.target)
            .map(|e| ConnectedEdge {
                direction: EdgeDirection::Incoming,
                edge: e.clone(),
            });
        outgoing.chain(incoming).collect()
    }
}

fn convert_node(collection: Collection, raw: RawNode) -> std::result::Result<Node, String> {
    let RawNode { id, kind, tags, keywords, mut attrs } = raw;
    if id.trim().is_empty() {
        return Err(format!("{} entry with empty id", collection));
    }

    let kind = match (kind, collection.default_kind()) {
        (Some(label), default) => match label.parse::<NodeKind>() {
            Ok(k) if collection.accepts(k) => k,
            Ok(k) => return Err(format!("{}: kind {} does not belong in {}", id, k, collection)),
            // Cases, precedents and actions may carry a finer-grained label of their own.
            Err(_) => match default {
                Some(d) => {
                    attrs.insert("subtype".into(), Value::String(label));
                    d
                }
                None => return Err(format!("{}: unknown {} kind '{}'", id, collection, label)),
            },
        },
        (None, Some(d)) => d,
        (None, None) => return Err(format!("{}: {} entries need a type", id, collection)),
    };

    let attrs = Value::Object(attrs);
    let parsed = match collection {
        Collection::Cases => serde_json::from_value::<CaseAttrs>(attrs).map(NodePayload::Case),
        Collection::Precedents => {
            serde_json::from_value::<PrecedentAttrs>(attrs).map(NodePayload::Precedent)
        }
        Collection::Rules => serde_json::from_value::<RuleAttrs>(attrs).map(NodePayload::Rule),
        Collection::Mechanisms => {
            serde_json::from_value::<MechanismAttrs>(attrs).map(NodePayload::Mechanism)
        }
        Collection::Actions => serde_json::from_value::<ActionAttrs>(attrs).map(NodePayload::Action),
    };
    let payload = parsed.map_err(|e| format!("{}: {}", id, e))?;

    Ok(Node {
        id,
        kind,
        tags: lowercase_all(tags),
        keywords: lowercase_all(keywords),
        payload,
    })
}

fn lowercase_all(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<GraphStore> {
        GraphStore::from_json(json, Path::new("test.json"))
    }

    const SMALL: &str = r#"{
        "rules": [
            {"id": "R_GDPR", "type": "Law_Hard", "weight": 10, "content": "Notify in 72h", "tags": ["GDPR"]}
        ],
        "actions": [
            {"id": "A_DELAY", "description": "Delay disclosure", "keywords": ["Delay", "wait"]}
        ],
        "edges": [
            {"source": "A_DELAY", "target": "R_GDPR", "relationship": "VIOLATED"},
            {"source": "A_DELAY", "target": "R_GDPR", "relationship": "IGNORES"}
        ]
    }"#;

    #[test]
    fn missing_collections_are_empty() {
        let g = parse(SMALL).unwrap();
        assert_eq!(g.cases().count(), 0);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn tags_and_keywords_are_lowercased() {
        let g = parse(SMALL).unwrap();
        assert_eq!(g.get_node("R_GDPR").unwrap().tags, vec!["gdpr"]);
        assert_eq!(g.get_node("A_DELAY").unwrap().keywords, vec!["delay", "wait"]);
        assert_eq!(g.get_node("A_DELAY").unwrap().kind, NodeKind::Action);
    }

    #[test]
    fn parallel_labels_are_distinct_edges() {
        let g = parse(SMALL).unwrap();
        assert_eq!(g.get_outgoing_edges("A_DELAY").len(), 2);
        assert_eq!(g.get_incoming_edges("R_GDPR").len(), 2);
        assert_eq!(g.get_neighbors("A_DELAY", Direction::Out).len(), 1);
        assert_eq!(g.out_neighbors("A_DELAY"), vec!["R_GDPR"]);
    }

    #[test]
    fn unknown_ids_have_no_edges() {
        let g = parse(SMALL).unwrap();
        assert!(g.get_outgoing_edges("NOPE").is_empty());
        assert!(g.get_incoming_edges("NOPE").is_empty());
        assert!(g.get_neighbors("NOPE", Direction::Both).is_empty());
        assert!(g.get_node("NOPE").is_none());
    }

    #[test]
    fn dangling_edge_fails_whole_load() {
        let err = parse(
            r#"{"actions": [{"id": "A"}], "edges": [{"source": "A", "target": "B", "relationship": "TRIGGERS"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert!(err.to_string().contains("unknown node B"));
    }

    #[test]
    fn duplicate_ids_across_collections_fail() {
        let err = parse(r#"{"cases": [{"id": "X"}], "actions": [{"id": "X"}]}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate node id"));
    }

    #[test]
    fn rules_need_a_rule_kind() {
        assert!(parse(r#"{"rules": [{"id": "R", "weight": 5}]}"#).is_err());
        assert!(parse(r#"{"rules": [{"id": "R", "type": "Risk_Mechanism"}]}"#).is_err());
        assert!(parse(r#"{"rules": [{"id": "R", "type": "Heuristic_Soft", "weight": 6}]}"#).is_ok());
    }

    #[test]
    fn unrecognised_case_label_kept_as_subtype() {
        let g = parse(r#"{"cases": [{"id": "C1", "type": "Case_Study", "dilemma": "x"}]}"#).unwrap();
        let node = g.get_node("C1").unwrap();
        assert_eq!(node.kind, NodeKind::Case);
        let v = serde_json::to_value(node).unwrap();
        assert_eq!(v["subtype"], "Case_Study");
        assert_eq!(v["dilemma"], "x");
    }

    #[test]
    fn descriptive_attributes_accept_any_json() {
        let g = parse(
            r#"{
                "cases": [{"id": "C1", "sentiment": "negative", "title": 42}],
                "precedents": [
                    {"id": "P1", "sentiment": -0.8, "consequence": {"fine_usd": 148000000}},
                    {"id": "P2", "legal_citation": ["GDPR Art. 33", "GDPR Art. 34"]}
                ],
                "rules": [{"id": "R1", "type": "Law_Hard", "weight": 10, "penalty": 20000000}]
            }"#,
        )
        .unwrap();
        assert_eq!(g.node_count(), 4);
        let v = serde_json::to_value(g.get_node("C1").unwrap()).unwrap();
        assert_eq!(v["sentiment"], "negative");
        assert_eq!(v["title"], 42);
        let p1 = g.get_node("P1").unwrap().as_precedent().unwrap();
        assert_eq!(p1.sentiment, Some(serde_json::json!(-0.8)));
        assert_eq!(p1.consequence.as_ref().unwrap()["fine_usd"], 148000000);
        let r1 = g.get_node("R1").unwrap().as_rule().unwrap();
        assert_eq!(r1.weight, 10);
        assert_eq!(r1.penalty, Some(serde_json::json!(20000000)));
    }

    #[test]
    fn typed_attributes_still_reject_wrong_types() {
        let err = parse(r#"{"rules": [{"id": "R1", "type": "Law_Hard", "weight": "heavy"}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn malformed_document_is_load_error() {
        assert!(matches!(parse("{not json"), Err(Error::Load { .. })));
        assert!(matches!(parse(r#"{"rules": 5}"#), Err(Error::Load { .. })));
    }

    #[test]
    fn missing_file_is_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let g = GraphStore::load(&dir.path().join("knowledge_base.json")).unwrap();
        assert!(g.is_empty());
        assert!(g.edges().is_empty());
    }

    #[test]
    fn edges_of_reports_both_directions() {
        let g = parse(SMALL).unwrap();
        let from_rule = g.edges_of("R_GDPR");
        assert_eq!(from_rule.len(), 2);
        assert!(from_rule.iter().all(|c| c.direction == EdgeDirection::Incoming));
        let from_action = g.edges_of("A_DELAY");
        assert!(from_action.iter().all(|c| c.direction == EdgeDirection::Outgoing));
    }
}
