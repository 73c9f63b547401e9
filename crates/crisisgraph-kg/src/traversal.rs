//! Traversal engine: shortest path, all-paths enumeration, bounded reachability.
//!
//! All three expand outgoing edges only, in document edge order. Unknown ids are
//! not errors here; they simply have no neighbors. Existence checks belong to
//! the caller (see `KnowledgeService`).

use crate::store::GraphStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// A node reached from the start, with its minimum hop distance.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Reached {
    pub id: String,
    pub distance: usize,
}

/// Reachable nodes in BFS discovery order, so distances never decrease
/// along the iteration.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ReachableSet {
    reached: Vec<Reached>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ReachableSet {
    fn insert(&mut self, id: &str, distance: usize) {
        self.index.insert(id.to_string(), self.reached.len());
        self.reached.push(Reached { id: id.to_string(), distance });
    }

    pub fn distance(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|&i| self.reached[i].distance)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.reached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reached.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reached> {
        self.reached.iter()
    }

    pub fn max_distance(&self) -> usize {
        self.reached.last().map(|r| r.distance).unwrap_or(0)
    }
}

impl GraphStore {
    /// Breadth-first search for the first (fewest-hop) path from `start` to `end`.
    ///
    /// Paths of up to `max_depth` hops are found. `start == end` returns
    /// `[start]` without touching the graph.
    pub fn shortest_path(&self, start: &str, end: &str, max_depth: usize) -> Option<Vec<String>> {
        if start == end {
            return Some(vec![start.to_string()]);
        }

        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<Vec<&str>> = VecDeque::from([vec![start]]);

        while let Some(path) = queue.pop_front() {
            if path.len() > max_depth {
                continue;
            }
            let current = path[path.len() - 1];

            for neighbor in self.out_neighbors(current) {
                if neighbor == end {
                    let mut found: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                    found.push(neighbor.to_string());
                    return Some(found);
                }
                if visited.insert(neighbor) {
                    let mut next = path.clone();
                    next.push(neighbor);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Every simple path from `start` to `end` holding at most `max_depth` nodes.
    ///
    /// A node is never revisited within one path, so cycles terminate; distinct
    /// paths may still share nodes. Order follows depth-first edge order.
    pub fn all_paths<'a>(&'a self, start: &'a str, end: &str, max_depth: usize) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        let mut path = vec![start];
        let mut visited: HashSet<&'a str> = HashSet::from([start]);
        self.collect_paths(start, end, max_depth, &mut path, &mut visited, &mut paths);
        paths
    }

    fn collect_paths<'a>(
        &'a self,
        current: &'a str,
        end: &str,
        max_depth: usize,
        path: &mut Vec<&'a str>,
        visited: &mut HashSet<&'a str>,
        paths: &mut Vec<Vec<String>>,
    ) {
        if path.len() > max_depth {
            return;
        }
        if current == end {
            paths.push(path.iter().map(|s| s.to_string()).collect());
            return;
        }

        for neighbor in self.out_neighbors(current) {
            if visited.insert(neighbor) {
                path.push(neighbor);
                self.collect_paths(neighbor, end, max_depth, path, visited, paths);
                path.pop();
                visited.remove(neighbor);
            }
        }
    }

    /// Nodes reachable from `start` within `max_depth` hops, with their minimum
    /// distance. `start` itself is included at distance 0.
    pub fn reachable_set(&self, start: &str, max_depth: usize) -> ReachableSet {
        let mut reachable = ReachableSet::default();
        reachable.insert(start, 0);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.out_neighbors(current) {
                if !reachable.contains(neighbor) {
                    reachable.insert(neighbor, depth + 1);
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// A -> B -> C -> D, A -> C, C -> A (cycle), D isolated from E.
    fn graph() -> GraphStore {
        GraphStore::from_json(
            r#"{
                "actions": [
                    {"id": "A"}, {"id": "B"}, {"id": "C"}, {"id": "D"}, {"id": "E"}
                ],
                "edges": [
                    {"source": "A", "target": "B", "relationship": "LEADS_TO"},
                    {"source": "B", "target": "C", "relationship": "LEADS_TO"},
                    {"source": "C", "target": "D", "relationship": "LEADS_TO"},
                    {"source": "A", "target": "C", "relationship": "SKIPS_TO"},
                    {"source": "C", "target": "A", "relationship": "LOOPS_BACK"}
                ]
            }"#,
            Path::new("test.json"),
        )
        .unwrap()
    }

    #[test]
    fn shortest_path_same_node() {
        assert_eq!(graph().shortest_path("A", "A", 0), Some(vec!["A".to_string()]));
    }

    #[test]
    fn shortest_path_takes_fewest_hops() {
        let g = graph();
        assert_eq!(g.shortest_path("A", "D", 5).unwrap(), vec!["A", "C", "D"]);
    }

    #[test]
    fn shortest_path_respects_depth() {
        let g = graph();
        assert!(g.shortest_path("A", "D", 1).is_none());
        assert!(g.shortest_path("A", "D", 2).is_some());
    }

    #[test]
    fn shortest_path_unreachable() {
        let g = graph();
        assert!(g.shortest_path("A", "E", 10).is_none());
        assert!(g.shortest_path("D", "A", 10).is_none());
        assert!(g.shortest_path("NOPE", "A", 10).is_none());
    }

    #[test]
    fn all_paths_enumerates_in_edge_order() {
        let g = graph();
        let paths = g.all_paths("A", "D", 4);
        assert_eq!(
            paths,
            vec![
                vec!["A", "B", "C", "D"],
                vec!["A", "C", "D"],
            ]
        );
    }

    #[test]
    fn all_paths_prunes_by_node_count() {
        let g = graph();
        assert_eq!(g.all_paths("A", "D", 3), vec![vec!["A", "C", "D"]]);
        assert!(g.all_paths("A", "D", 2).is_empty());
    }

    #[test]
    fn all_paths_terminates_on_cycles() {
        let g = graph();
        let paths = g.all_paths("C", "B", 10);
        assert_eq!(paths, vec![vec!["C", "A", "B"]]);
    }

    #[test]
    fn shortest_never_longer_than_any_enumerated_path() {
        let g = graph();
        let shortest = g.shortest_path("A", "D", 4).unwrap();
        for p in g.all_paths("A", "D", 4) {
            assert!(shortest.len() <= p.len());
        }
    }

    #[test]
    fn reachable_keeps_minimum_distance() {
        let g = graph();
        let r = g.reachable_set("A", 5);
        assert_eq!(r.distance("A"), Some(0));
        assert_eq!(r.distance("B"), Some(1));
        assert_eq!(r.distance("C"), Some(1));
        assert_eq!(r.distance("D"), Some(2));
        assert!(!r.contains("E"));
        let distances: Vec<usize> = r.iter().map(|x| x.distance).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn reachable_bounded_by_depth() {
        let g = graph();
        let r = g.reachable_set("A", 1);
        assert_eq!(r.len(), 3);
        assert!(r.iter().all(|x| x.distance <= 1));
        assert_eq!(g.reachable_set("A", 0).len(), 1);
    }

    #[test]
    fn reachable_serializes_as_list() {
        let r = graph().reachable_set("D", 3);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, serde_json::json!([{"id": "D", "distance": 0}]));
    }
}
