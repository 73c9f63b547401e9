//! KnowledgeService — the validated query surface over one loaded graph.
//!
//! Construct it explicitly and pass it around, or go through
//! `KnowledgeService::shared`, which loads the graph at most once per process.

use crate::risk::{ChainReport, RiskAssessment, RiskEvaluator};
use crate::store::GraphStore;
use crate::traversal::ReachableSet;
use crisisgraph_core::{
    Collection, ConnectedEdge, CrisisConfig, Direction, Error, MechanismFilter, Node, Result,
    RuleFilter, ScoredNode,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

static SHARED: OnceLock<Arc<KnowledgeService>> = OnceLock::new();
static SHARED_INIT: Mutex<()> = Mutex::new(());

pub struct KnowledgeService {
    graph: Arc<GraphStore>,
    evaluator: RiskEvaluator,
    config: CrisisConfig,
}

impl KnowledgeService {
    pub fn new(graph: Arc<GraphStore>, config: CrisisConfig) -> Self {
        Self {
            graph,
            evaluator: RiskEvaluator::new(config.risk.clone()),
            config,
        }
    }

    /// Load the graph named in `config.graph.path`.
    pub fn load(config: CrisisConfig) -> Result<Self> {
        let graph = GraphStore::load(&config.graph.path)?;
        Ok(Self::new(Arc::new(graph), config))
    }

    /// Process-wide instance. The first caller loads; concurrent first callers
    /// wait on the init lock and then share the same instance. Later `config`
    /// values are ignored. A failed load leaves the handle unset.
    pub fn shared(config: &CrisisConfig) -> Result<Arc<Self>> {
        if let Some(existing) = SHARED.get() {
            return Ok(existing.clone());
        }
        let _guard = SHARED_INIT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = SHARED.get() {
            return Ok(existing.clone());
        }
        let service = Arc::new(Self::load(config.clone())?);
        // Only this thread sets under the init lock.
        let _ = SHARED.set(service.clone());
        Ok(service)
    }

    /// The process-wide instance, if one has been loaded.
    pub fn try_shared() -> Option<Arc<Self>> {
        SHARED.get().cloned()
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn config(&self) -> &CrisisConfig {
        &self.config
    }

    fn require(&self, id: &str) -> Result<&Node> {
        if id.trim().is_empty() {
            return Err(Error::invalid_argument("node id must not be empty"));
        }
        self.graph
            .get_node(id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))
    }

    fn require_depth(max_depth: usize) -> Result<usize> {
        if max_depth == 0 {
            return Err(Error::invalid_argument("max_depth must be at least 1"));
        }
        Ok(max_depth)
    }

    // ===========================================================================
    // Lookup
    // ===========================================================================

    pub fn node(&self, id: &str) -> Result<&Node> {
        self.require(id)
    }

    /// Edges touching `id` in `direction`, each tagged outgoing or incoming.
    pub fn edges(&self, id: &str, direction: Direction) -> Result<Vec<ConnectedEdge>> {
        self.require(id)?;
        let mut edges = self.graph.edges_of(id);
        edges.retain(|e| direction.admits(e.direction));
        Ok(edges)
    }

    pub fn neighbors(&self, id: &str, direction: Direction) -> Result<BTreeSet<String>> {
        self.require(id)?;
        Ok(self.graph.get_neighbors(id, direction))
    }

    // ===========================================================================
    // Filters and search
    // ===========================================================================

    pub fn rules(&self, filter: RuleFilter) -> Vec<&Node> {
        self.graph.filter_rules(filter)
    }

    pub fn mechanisms(&self, filter: MechanismFilter) -> Vec<&Node> {
        self.graph.filter_mechanisms(filter)
    }

    fn default_collections(&self) -> Vec<Collection> {
        self.config
            .search
            .default_collections
            .iter()
            .filter_map(|name| match name.parse::<Collection>() {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!("Ignoring search.default_collections entry: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Keyword search over `collections`, or the configured defaults when `None`,
    /// capped at `search.max_results`.
    pub fn search<S: AsRef<str>>(
        &self,
        keywords: &[S],
        collections: Option<&[Collection]>,
    ) -> Result<Vec<ScoredNode>> {
        let defaults;
        let collections = match collections {
            Some(c) => c,
            None => {
                defaults = self.default_collections();
                defaults.as_slice()
            }
        };
        self.graph
            .search_by_keywords(keywords, collections, self.config.search.max_results)
    }

    // ===========================================================================
    // Traversal
    // ===========================================================================

    /// Shortest path; `Ok(None)` when `end` is out of reach. `start == end` is
    /// `[start]` for any depth.
    pub fn shortest_path(
        &self,
        start: &str,
        end: &str,
        max_depth: Option<usize>,
    ) -> Result<Option<Vec<String>>> {
        self.require(start)?;
        self.require(end)?;
        if start == end {
            return Ok(Some(vec![start.to_string()]));
        }
        let depth = Self::require_depth(max_depth.unwrap_or(self.config.traversal.path_max_depth))?;
        let path = self.graph.shortest_path(start, end, depth);
        debug!("shortest_path {} -> {} (depth {}): {:?}", start, end, depth, path);
        Ok(path)
    }

    pub fn all_paths(
        &self,
        start: &str,
        end: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<Vec<String>>> {
        self.require(start)?;
        self.require(end)?;
        let depth =
            Self::require_depth(max_depth.unwrap_or(self.config.traversal.all_paths_max_depth))?;
        let paths = self.graph.all_paths(start, end, depth);
        debug!("all_paths {} -> {} (depth {}): {} found", start, end, depth, paths.len());
        Ok(paths)
    }

    pub fn reachable(&self, start: &str, max_depth: Option<usize>) -> Result<ReachableSet> {
        self.require(start)?;
        let depth = max_depth.unwrap_or(self.config.traversal.reachable_max_depth);
        Ok(self.graph.reachable_set(start, depth))
    }

    // ===========================================================================
    // Risk
    // ===========================================================================

    pub fn score_risk(&self, description: &str) -> RiskAssessment {
        self.evaluator.score_risk(description)
    }

    pub fn trace_causal_chain<S: AsRef<str>>(&self, action_keywords: &[S]) -> Result<ChainReport> {
        self.evaluator.trace_causal_chain(
            &self.graph,
            action_keywords,
            self.config.search.chain_precedent_limit,
        )
    }
}
