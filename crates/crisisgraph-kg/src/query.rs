//! Typed filters and keyword-scored search over the graph collections.

use crate::store::GraphStore;
use crisisgraph_core::{Collection, Error, MechanismFilter, Node, Result, RuleFilter, ScoredNode};
use std::cmp::Ordering;
use tracing::debug;

/// Trim and lowercase caller keywords, dropping blanks. An empty keyword would
/// match every tag by containment, so it never reaches scoring.
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl GraphStore {
    /// Rules admitted by `filter`, heaviest first. Equal weights keep load order,
    /// so the first rule listed is the most authoritative.
    pub fn filter_rules(&self, filter: RuleFilter) -> Vec<&Node> {
        let mut rules: Vec<&Node> = self.rules().filter(|r| filter.admits(r.kind)).collect();
        rules.sort_by(|a, b| b.weight().cmp(&a.weight()));
        rules
    }

    /// Mechanisms admitted by `filter`, in load order.
    pub fn filter_mechanisms(&self, filter: MechanismFilter) -> Vec<&Node> {
        self.mechanisms().filter(|m| filter.admits(m.kind)).collect()
    }

    /// Score every node in `collections` by the share of `keywords` it contains.
    ///
    /// A keyword hits a node when it is a substring of any of the node's tags or
    /// keywords. Nodes without a hit are dropped; the rest are ordered by
    /// `match_score` descending and cut to `limit`.
    pub fn search_by_keywords<S: AsRef<str>>(
        &self,
        keywords: &[S],
        collections: &[Collection],
        limit: usize,
    ) -> Result<Vec<ScoredNode>> {
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            return Err(Error::invalid_argument("keyword search needs at least one keyword"));
        }

        let mut results = Vec::new();
        for &collection in collections {
            for node in self.collection(collection) {
                let matches = keywords.iter().filter(|k| node.matches_keyword(k)).count();
                if matches > 0 {
                    results.push(ScoredNode {
                        node: node.clone(),
                        match_score: matches as f64 / keywords.len() as f64,
                        collection,
                    });
                }
            }
        }

        results.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
        });
        debug!(
            "search {:?} over {:?}: {} hits, returning {}",
            keywords,
            collections,
            results.len(),
            results.len().min(limit)
        );
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisisgraph_core::NodeKind;
    use std::path::Path;

    fn graph() -> GraphStore {
        GraphStore::from_json(
            r#"{
                "rules": [
                    {"id": "H_REPUTATION", "type": "Heuristic_Soft", "weight": 7, "content": "Protect brand", "tags": ["reputation"]},
                    {"id": "L_GDPR", "type": "Law_Hard", "weight": 10, "content": "Art. 33", "tags": ["gdpr", "breach"]},
                    {"id": "H_CASH", "type": "Heuristic_Soft", "weight": 9, "content": "Preserve cash", "tags": ["cash"]},
                    {"id": "H_TRUST", "type": "Heuristic_Soft", "weight": 7, "content": "Keep trust", "tags": ["trust"]},
                    {"id": "L_SOX", "type": "Law_Hard", "weight": 10, "content": "SOX 404", "tags": ["sox"]}
                ],
                "mechanisms": [
                    {"id": "M_CONCEAL", "type": "Risk_Mechanism", "definition": "Penalty multiplier", "tags": ["concealment"]},
                    {"id": "M_INSURANCE", "type": "Financial_Mechanism", "definition": "Insurance void", "tags": ["insurance"]}
                ],
                "precedents": [
                    {"id": "P_EQUIFAX", "action": "Delayed notice", "tags": ["breach", "delay"]},
                    {"id": "P_CLAIM", "action": "Claim denied", "tags": ["claim"]}
                ]
            }"#,
            Path::new("test.json"),
        )
        .unwrap()
    }

    fn ids(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn rules_sorted_by_weight_stable() {
        let g = graph();
        assert_eq!(
            ids(&g.filter_rules(RuleFilter::All)),
            vec!["L_GDPR", "L_SOX", "H_CASH", "H_REPUTATION", "H_TRUST"]
        );
    }

    #[test]
    fn rule_filters_select_weight_class() {
        let g = graph();
        assert!(g.filter_rules(RuleFilter::Hard).iter().all(|r| r.kind == NodeKind::LawHard));
        assert_eq!(g.filter_rules(RuleFilter::Hard).len(), 2);
        assert_eq!(g.filter_rules(RuleFilter::Soft).len(), 3);
    }

    #[test]
    fn mechanism_filters() {
        let g = graph();
        assert_eq!(ids(&g.filter_mechanisms(MechanismFilter::Risk)), vec!["M_CONCEAL"]);
        assert_eq!(ids(&g.filter_mechanisms(MechanismFilter::Financial)), vec!["M_INSURANCE"]);
        assert_eq!(g.filter_mechanisms(MechanismFilter::All).len(), 2);
    }

    #[test]
    fn single_keyword_full_match() {
        let g = graph();
        let hits = g.search_by_keywords(&["GDPR"], &[Collection::Rules], 7).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, "L_GDPR");
        assert_eq!(hits[0].match_score, 1.0);
        assert_eq!(hits[0].collection, Collection::Rules);
    }

    #[test]
    fn partial_matches_rank_below_full() {
        let g = graph();
        let hits = g
            .search_by_keywords(&["breach", "delay"], &[Collection::Precedents, Collection::Rules], 7)
            .unwrap();
        assert_eq!(hits[0].node.id, "P_EQUIFAX");
        assert_eq!(hits[0].match_score, 1.0);
        assert_eq!(hits[1].node.id, "L_GDPR");
        assert_eq!(hits[1].match_score, 0.5);
    }

    #[test]
    fn substring_over_match_is_preserved() {
        let g = graph();
        let hits = g.search_by_keywords(&["ai"], &[Collection::Precedents], 7).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, "P_CLAIM");
    }

    #[test]
    fn only_requested_collections_are_searched() {
        let g = graph();
        let hits = g.search_by_keywords(&["breach"], &[Collection::Mechanisms], 7).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn limit_caps_results() {
        let g = graph();
        let hits = g.search_by_keywords(&["e"], &Collection::ALL, 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_keywords_rejected() {
        let g = graph();
        let none: [&str; 0] = [];
        assert!(matches!(
            g.search_by_keywords(&none, &[Collection::Rules], 7),
            Err(Error::InvalidArgument(_))
        ));
        assert!(g.search_by_keywords(&["  ", ""], &[Collection::Rules], 7).is_err());
    }
}
