//! Decision and feedback records, and the persisted log that holds them.

use chrono::{DateTime, NaiveDateTime, Utc};
use crisisgraph_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Approve,
    Reject,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Map a free-form verdict label, falling back to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }
}

/// Stored labels are read with `from_label`, so older logs carrying
/// `APPROVED` or an unrecognised verdict still load.
impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVE" | "APPROVED" => Ok(Self::Approve),
            "REJECT" | "REJECTED" => Ok(Self::Reject),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(Error::invalid_argument(format!("unknown verdict: {}", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Correct,
    Incorrect,
    PartiallyCorrect,
}

impl FeedbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::PartiallyCorrect => "partially_correct",
        }
    }
}

impl fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "correct" => Ok(Self::Correct),
            "incorrect" => Ok(Self::Incorrect),
            "partially_correct" | "partial" => Ok(Self::PartiallyCorrect),
            other => Err(Error::invalid_argument(format!(
                "unknown feedback outcome: {} (expected correct, incorrect or partially_correct)",
                other
            ))),
        }
    }
}

/// One completed evaluation. Never modified after it is appended.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub id: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "scenario_hash")]
    pub scenario_fingerprint: String,
    pub scenario_preview: String,
    pub verdict: Verdict,
    #[serde(default)]
    pub precedent_used: Option<String>,
    #[serde(default)]
    pub risk_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub rules_cited: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeedbackRecord {
    pub decision_id: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub outcome: FeedbackOutcome,
    #[serde(default)]
    pub notes: String,
}

/// RFC 3339, or an offset-less ISO 8601 timestamp taken as UTC.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

/// The persisted document: `{decisions, precedent_usage, feedback}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryLog {
    pub decisions: Vec<DecisionRecord>,
    pub precedent_usage: BTreeMap<String, u64>,
    pub feedback: Vec<FeedbackRecord>,
}

/// Input to `MemoryStore::record_decision`.
#[derive(Clone, Debug)]
pub struct NewDecision {
    pub scenario: String,
    pub verdict: Verdict,
    pub precedent_used: Option<String>,
    pub risk_scores: BTreeMap<String, f64>,
    pub rules_cited: Vec<String>,
    pub confidence: Option<f64>,
}

impl NewDecision {
    pub fn new(scenario: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            scenario: scenario.into(),
            verdict,
            precedent_used: None,
            risk_scores: BTreeMap::new(),
            rules_cited: Vec::new(),
            confidence: None,
        }
    }

    pub fn with_precedent(mut self, precedent_id: impl Into<String>) -> Self {
        self.precedent_used = Some(precedent_id.into());
        self
    }

    pub fn with_risk_scores(mut self, scores: BTreeMap<String, f64>) -> Self {
        self.risk_scores = scores;
        self
    }

    pub fn with_rules(mut self, rules: Vec<String>) -> Self {
        self.rules_cited = rules;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A stored decision with its bag-of-words overlap score against a query.
#[derive(Clone, Debug, Serialize)]
pub struct SimilarDecision {
    #[serde(flatten)]
    pub record: DecisionRecord,
    pub similarity_score: f64,
}

/// Aggregates over the whole log.
#[derive(Clone, Debug, Serialize)]
pub struct MemoryStats {
    pub total_decisions: usize,
    pub verdict_distribution: BTreeMap<String, usize>,
    pub precedent_usage: BTreeMap<String, u64>,
    pub feedback_count: usize,
    pub feedback_accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_labels() {
        assert_eq!("approve".parse::<Verdict>().unwrap(), Verdict::Approve);
        assert_eq!(Verdict::from_label("Rejected"), Verdict::Reject);
        assert_eq!(Verdict::from_label("maybe"), Verdict::Unknown);
        assert_eq!(serde_json::to_value(Verdict::Reject).unwrap(), "REJECT");
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(
            "partially-correct".parse::<FeedbackOutcome>().unwrap(),
            FeedbackOutcome::PartiallyCorrect
        );
        assert!("wrong".parse::<FeedbackOutcome>().is_err());
        assert_eq!(
            serde_json::to_value(FeedbackOutcome::PartiallyCorrect).unwrap(),
            "partially_correct"
        );
    }

    #[test]
    fn legacy_hash_field_is_accepted() {
        let record: DecisionRecord = serde_json::from_str(
            r#"{
                "id": "DEC_20240101_120000",
                "timestamp": "2024-01-01T12:00:00Z",
                "scenario_hash": "abcd1234abcd1234",
                "scenario_preview": "Breach at Acme",
                "verdict": "REJECT"
            }"#,
        )
        .unwrap();
        assert_eq!(record.scenario_fingerprint, "abcd1234abcd1234");
        assert!(record.rules_cited.is_empty());
        assert!(record.precedent_used.is_none());
    }

    #[test]
    fn offset_less_timestamps_read_as_utc() {
        let record: FeedbackRecord = serde_json::from_str(
            r#"{"decision_id": "DEC_1", "timestamp": "2024-01-01T12:00:00.123456", "outcome": "correct"}"#,
        )
        .unwrap();
        assert_eq!(record.timestamp.to_rfc3339(), "2024-01-01T12:00:00.123456+00:00");

        let record: FeedbackRecord = serde_json::from_str(
            r#"{"decision_id": "DEC_1", "timestamp": "2024-01-01T12:00:00", "outcome": "incorrect"}"#,
        )
        .unwrap();
        assert_eq!(record.timestamp.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        let bad = serde_json::from_str::<FeedbackRecord>(
            r#"{"decision_id": "DEC_1", "timestamp": "yesterday", "outcome": "correct"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn stored_verdicts_are_read_leniently() {
        let verdicts: Vec<Verdict> =
            serde_json::from_str(r#"["APPROVED", "reject", "ESCALATE"]"#).unwrap();
        assert_eq!(verdicts, vec![Verdict::Approve, Verdict::Reject, Verdict::Unknown]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let log: MemoryLog = serde_json::from_str(r#"{"decisions": []}"#).unwrap();
        assert!(log.precedent_usage.is_empty());
        assert!(log.feedback.is_empty());
    }
}
