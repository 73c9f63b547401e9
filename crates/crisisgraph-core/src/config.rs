//! crisisgraph configuration
//!
//! Graph location, search caps, traversal depths, risk thresholds and
//! decision-memory settings. Every section may be omitted from the TOML file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisConfig {
    /// Knowledge-base source.
    pub graph: GraphConfig,
    /// Keyword search.
    pub search: SearchConfig,
    /// Default depth bounds for path and reachability queries.
    pub traversal: TraversalConfig,
    /// Risk scoring keywords, weights and thresholds.
    pub risk: RiskConfig,
    /// Decision memory.
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Knowledge-base JSON document. A missing file loads an empty graph.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cap on keyword search results.
    pub max_results: usize,
    /// Precedents surfaced per causal-chain trace.
    pub chain_precedent_limit: usize,
    /// Collections searched when the caller names none.
    pub default_collections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Hop bound for shortest-path search.
    pub path_max_depth: usize,
    /// Node bound for all-paths enumeration.
    pub all_paths_max_depth: usize,
    /// Hop bound for reachability.
    pub reachable_max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Base fine in USD before mechanism multipliers.
    pub base_penalty_estimate: f64,
    /// Insurance coverage lost when the insurance-void mechanism fires.
    pub insurance_loss_default: f64,
    /// Penalty multiplier applied when concealment is detected.
    pub concealment_multiplier: f64,
    /// Factor applied to the legal score on concealment.
    pub concealment_legal_factor: f64,
    /// Starting score for each dimension.
    pub base_score: f64,
    /// Added per matched dimension keyword.
    pub keyword_increment: f64,
    /// Added to the financial score when insurance is voided.
    pub insurance_financial_increment: f64,
    /// Ceiling for every dimension.
    pub max_score: f64,
    /// Total above this is CRITICAL.
    pub critical_threshold: f64,
    /// Total above this is HIGH, otherwise MEDIUM.
    pub high_threshold: f64,
    pub financial_keywords: Vec<String>,
    pub ethical_keywords: Vec<String>,
    pub legal_keywords: Vec<String>,
    pub concealment_keywords: Vec<String>,
    pub insurance_void_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Decision history document. Rewritten in full on every write.
    pub path: PathBuf,
    /// Characters of scenario text kept in each record.
    pub preview_chars: usize,
    /// Shared tokens a stored decision must exceed to count as similar.
    pub min_overlap: usize,
    pub similar_limit: usize,
    pub recent_limit: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for GraphConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("knowledge_base.json") }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 7,
            chain_precedent_limit: 3,
            default_collections: strings(&["cases", "precedents", "actions", "mechanisms"]),
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self { path_max_depth: 5, all_paths_max_depth: 4, reachable_max_depth: 5 }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_penalty_estimate: 1_000_000.0,
            insurance_loss_default: 20_000_000.0,
            concealment_multiplier: 3.5,
            concealment_legal_factor: 1.5,
            base_score: 3.0,
            keyword_increment: 2.0,
            insurance_financial_increment: 3.0,
            max_score: 10.0,
            critical_threshold: 7.0,
            high_threshold: 5.0,
            financial_keywords: strings(&[
                "million", "bankruptcy", "critical", "40%", "major", "insurance",
            ]),
            ethical_keywords: strings(&[
                "fraud", "corruption", "deception", "lie", "steal", "bribe", "conceal", "hide",
            ]),
            legal_keywords: strings(&[
                "criminal", "felony", "gdpr", "sanction", "lawsuit", "prison", "72h",
            ]),
            concealment_keywords: strings(&[
                "conceal", "hide", "delay", "cover up", "wait", "disguise",
            ]),
            insurance_void_keywords: strings(&["delay", "wait", "2 week", "72h", "insurance"]),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("decision_history.json"),
            preview_chars: 200,
            min_overlap: 3,
            similar_limit: 5,
            recent_limit: 10,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================
// Loading
// ============================================================

impl CrisisConfig {
    /// Reads `path`. A missing or unparseable file yields the defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Strict parse; `load` swallows what this reports.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Starter file contents for `crisisgraph config`.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let c = CrisisConfig::default();
        assert_eq!(c.search.max_results, 7);
        assert_eq!(c.risk.concealment_multiplier, 3.5);
        assert_eq!(c.risk.base_penalty_estimate, 1_000_000.0);
        assert_eq!(c.risk.insurance_loss_default, 20_000_000.0);
        assert_eq!(c.memory.min_overlap, 3);
        assert!(c.risk.concealment_keywords.contains(&"disguise".to_string()));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let c = CrisisConfig::from_toml("[risk]\nconcealment_multiplier = 2.0\n").unwrap();
        assert_eq!(c.risk.concealment_multiplier, 2.0);
        assert_eq!(c.risk.high_threshold, 5.0);
        assert_eq!(c.search.max_results, 7);
    }

    #[test]
    fn toml_roundtrip() {
        let c = CrisisConfig::default();
        let back = CrisisConfig::from_toml(&c.to_toml()).unwrap();
        assert_eq!(back.traversal.all_paths_max_depth, 4);
        assert_eq!(back.risk.legal_keywords, c.risk.legal_keywords);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = CrisisConfig::load(&dir.path().join("nope.toml"));
        assert_eq!(c.search.chain_precedent_limit, 3);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            CrisisConfig::from_toml("[search]\nmax_results = \"many\""),
            Err(crate::Error::Config(_))
        ));
    }
}
