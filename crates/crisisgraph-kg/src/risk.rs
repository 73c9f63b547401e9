//! Risk scoring and causal-chain tracing.
//!
//! Scoring is literal keyword matching over the scenario text against the
//! configured lists; no language understanding. Exposure is
//! `base_penalty × multiplier + insurance_loss`.

use crate::query::normalize_keywords;
use crate::store::GraphStore;
use crisisgraph_core::config::RiskConfig;
use crisisgraph_core::{Collection, Error, NodeKind, Result, ScoredNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

pub const CONCEALMENT_MECHANISM: &str = "CONCEPT_CONCEALMENT_MULTIPLIER";
pub const INSURANCE_VOID_MECHANISM: &str = "CONCEPT_INSURANCE_VOID";

/// LOW and UNASSESSED are never produced by scoring; they mark the absence
/// of a computation.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Unassessed,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
            Self::Unassessed => write!(f, "UNASSESSED"),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RiskAssessment {
    pub financial_score: f64,
    pub ethical_score: f64,
    pub legal_score: f64,
    /// Mean of the three scores, one decimal.
    pub total_risk: f64,
    pub risk_level: RiskLevel,
    pub mechanisms_triggered: Vec<String>,
    pub penalty_multiplier: f64,
    pub insurance_loss: f64,
    pub total_exposure: f64,
    pub exposure_formula: String,
}

impl RiskAssessment {
    /// Scores in the shape the decision memory stores them.
    pub fn score_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("financial".to_string(), self.financial_score),
            ("ethical".to_string(), self.ethical_score),
            ("legal".to_string(), self.legal_score),
            ("total".to_string(), self.total_risk),
        ])
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChainAction {
    pub id: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TriggeredMechanism {
    pub mechanism_id: String,
    pub relationship: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub definition: String,
    pub effect: String,
    pub multiplier: Option<f64>,
    pub financial_impact: Option<serde_json::Value>,
    pub typical_exposure: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RuleHit {
    pub rule_id: String,
    /// VIOLATED, COMPLIED, ...
    pub relationship: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub weight: u32,
    pub content: String,
    pub penalty: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PrecedentMatch {
    pub precedent_id: String,
    pub match_score: f64,
    pub action: Option<serde_json::Value>,
    pub consequence: Option<serde_json::Value>,
    pub legal_citation: Option<serde_json::Value>,
}

impl From<&ScoredNode> for PrecedentMatch {
    fn from(hit: &ScoredNode) -> Self {
        let attrs = hit.node.as_precedent();
        Self {
            precedent_id: hit.node.id.clone(),
            match_score: hit.match_score,
            action: attrs.and_then(|p| p.action.clone()),
            consequence: attrs.and_then(|p| p.consequence.clone()),
            legal_citation: attrs.and_then(|p| p.legal_citation.clone()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CausalChain {
    pub triggered_mechanisms: Vec<TriggeredMechanism>,
    pub rules: Vec<RuleHit>,
    pub matching_precedents: Vec<PrecedentMatch>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExposureCalculation {
    pub penalty_multiplier: f64,
    pub insurance_exposure: f64,
    pub total_exposure: f64,
    pub total_risk_formula: String,
}

/// Action → mechanisms → rules → precedents, with the composed exposure.
#[derive(Clone, Debug, Serialize)]
pub struct ChainReport {
    pub action: ChainAction,
    pub causal_chain: CausalChain,
    pub exposure_calculation: ExposureCalculation,
}

pub struct RiskEvaluator {
    config: RiskConfig,
}

impl RiskEvaluator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    fn dimension_score(&self, text: &str, keywords: &[String]) -> f64 {
        let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
        (self.config.base_score + self.config.keyword_increment * hits as f64).min(self.config.max_score)
    }

    fn level_for(&self, total: f64) -> RiskLevel {
        if total > self.config.critical_threshold {
            RiskLevel::Critical
        } else if total > self.config.high_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }

    /// Score a free-text scenario on the financial, ethical and legal axes.
    ///
    /// Concealment and insurance voiding are detected independently; either,
    /// both or neither may fire.
    pub fn score_risk(&self, description: &str) -> RiskAssessment {
        let c = &self.config;
        let text = description.to_lowercase();

        let mut financial = self.dimension_score(&text, &c.financial_keywords);
        let ethical = self.dimension_score(&text, &c.ethical_keywords);
        let mut legal = self.dimension_score(&text, &c.legal_keywords);

        let mut mechanisms = Vec::new();
        let mut multiplier = 1.0;
        let mut insurance_loss = 0.0;

        if contains_any(&text, &c.concealment_keywords) {
            mechanisms.push(CONCEALMENT_MECHANISM.to_string());
            multiplier = c.concealment_multiplier;
            legal = (legal * c.concealment_legal_factor).min(c.max_score);
        }

        if contains_any(&text, &c.insurance_void_keywords) {
            mechanisms.push(INSURANCE_VOID_MECHANISM.to_string());
            insurance_loss = c.insurance_loss_default;
            financial = (financial + c.insurance_financial_increment).min(c.max_score);
        }

        let mean = (financial + ethical + legal) / 3.0;
        let total_exposure = c.base_penalty_estimate * multiplier + insurance_loss;
        let assessment = RiskAssessment {
            financial_score: financial,
            ethical_score: ethical,
            legal_score: legal,
            total_risk: round1(mean),
            // Thresholds compare the unrounded mean.
            risk_level: self.level_for(mean),
            mechanisms_triggered: mechanisms,
            penalty_multiplier: multiplier,
            insurance_loss,
            total_exposure,
            exposure_formula: format!(
                "({} × {}) + {} = {}",
                format_usd(c.base_penalty_estimate),
                multiplier,
                format_usd(insurance_loss),
                format_usd(total_exposure)
            ),
        };
        debug!(
            "risk: total={} level={} mechanisms={:?}",
            assessment.total_risk, assessment.risk_level, assessment.mechanisms_triggered
        );
        assessment
    }

    /// Trace the causal chain of the first action whose tags or keywords
    /// contain any of `action_keywords`.
    ///
    /// The first matching action in load order wins, not the best-scoring one.
    pub fn trace_causal_chain<S: AsRef<str>>(
        &self,
        graph: &GraphStore,
        action_keywords: &[S],
        precedent_limit: usize,
    ) -> Result<ChainReport> {
        let keywords = normalize_keywords(action_keywords);
        if keywords.is_empty() {
            return Err(Error::invalid_argument("causal chain trace needs at least one action keyword"));
        }

        let action = graph
            .actions()
            .find(|a| keywords.iter().any(|k| a.matches_keyword(k)))
            .ok_or_else(|| Error::not_found(format!("no action matching: {}", keywords.join(", "))))?;

        let mut mechanisms = Vec::new();
        let mut rules = Vec::new();
        for edge in graph.get_outgoing_edges(&action.id) {
            let Some(target) = graph.get_node(&edge.target) else { continue };
            if let Some(m) = target.as_mechanism() {
                mechanisms.push(TriggeredMechanism {
                    mechanism_id: target.id.clone(),
                    relationship: edge.relationship.clone(),
                    kind: target.kind,
                    definition: m.definition.clone(),
                    effect: m.effect.clone(),
                    multiplier: m.multiplier_value,
                    financial_impact: m.financial_impact.clone(),
                    typical_exposure: m.typical_exposure.clone(),
                });
            } else if let Some(r) = target.as_rule() {
                rules.push(RuleHit {
                    rule_id: target.id.clone(),
                    relationship: edge.relationship.clone(),
                    kind: target.kind,
                    weight: r.weight,
                    content: r.content.clone(),
                    penalty: r.penalty.clone(),
                });
            }
        }

        let precedents = graph
            .search_by_keywords(keywords.as_slice(), &[Collection::Precedents], precedent_limit)?
            .iter()
            .map(PrecedentMatch::from)
            .collect();

        let exposure = self.chain_exposure(&mechanisms);
        debug!(
            "chain from {}: {} mechanisms, {} rules, multiplier {}",
            action.id,
            mechanisms.len(),
            rules.len(),
            exposure.penalty_multiplier
        );

        Ok(ChainReport {
            action: ChainAction {
                id: action.id.clone(),
                description: action.as_action().map(|a| a.description.clone()).unwrap_or_default(),
            },
            causal_chain: CausalChain {
                triggered_mechanisms: mechanisms,
                rules,
                matching_precedents: precedents,
            },
            exposure_calculation: exposure,
        })
    }

    /// Mechanisms compose multiplicatively. A mechanism reached over several
    /// edge labels counts once.
    fn chain_exposure(&self, mechanisms: &[TriggeredMechanism]) -> ExposureCalculation {
        let mut seen = HashSet::new();
        let mut multiplier = 1.0;
        let mut insurance = 0.0;
        for m in mechanisms {
            if !seen.insert(m.mechanism_id.as_str()) {
                continue;
            }
            if let Some(value) = m.multiplier {
                multiplier *= value;
            }
            if m.definition.to_lowercase().contains("insurance") {
                insurance = self.config.insurance_loss_default;
            }
        }
        let total = self.config.base_penalty_estimate * multiplier + insurance;
        ExposureCalculation {
            penalty_multiplier: multiplier,
            insurance_exposure: insurance,
            total_exposure: total,
            total_risk_formula: format!("(Base_Penalty × {}) + {}", multiplier, format_usd(insurance)),
        }
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Whole dollars with thousands separators: `$23,500,000`.
pub fn format_usd(amount: f64) -> String {
    let whole = amount.round().abs() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if amount < 0.0 && whole > 0 {
        format!("-${}", out)
    } else {
        format!("${}", out)
    }
}
