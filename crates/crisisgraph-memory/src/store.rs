//! MemoryStore — append-only decision log with synchronous full-file persistence.
//!
//! Readers snapshot the current `Arc<MemoryLog>` and iterate without holding
//! any lock. Writers serialise on `write_lock`, build the next log from a copy
//! of the snapshot, swap it in, then rewrite the file (temp file + rename).

use crate::fingerprint::{fingerprint, tokenize};
use crate::record::{
    DecisionRecord, FeedbackOutcome, FeedbackRecord, MemoryLog, MemoryStats, NewDecision,
    SimilarDecision,
};
use chrono::Utc;
use crisisgraph_core::config::MemoryConfig;
use crisisgraph_core::{Error, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

pub struct MemoryStore {
    path: Option<PathBuf>,
    config: MemoryConfig,
    log: RwLock<Arc<MemoryLog>>,
    write_lock: Mutex<()>,
    /// The file on disk could not be parsed; it is moved aside before the
    /// first rewrite.
    unreadable_on_disk: AtomicBool,
}

impl MemoryStore {
    /// Open the log at `config.path`. A missing or unreadable file starts an
    /// empty log; the first write creates it. An unparseable file is kept as
    /// `<name>.json.corrupt-<timestamp>` when that first write happens.
    pub fn load(config: MemoryConfig) -> Self {
        let path = config.path.clone();
        let (log, unreadable) = read_log(&path);
        info!(
            "Decision memory {}: {} decisions, {} feedback records",
            path.display(),
            log.decisions.len(),
            log.feedback.len()
        );
        Self {
            path: Some(path),
            config,
            log: RwLock::new(Arc::new(log)),
            write_lock: Mutex::new(()),
            unreadable_on_disk: AtomicBool::new(unreadable),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory(config: MemoryConfig) -> Self {
        Self {
            path: None,
            config,
            log: RwLock::new(Arc::new(MemoryLog::default())),
            write_lock: Mutex::new(()),
            unreadable_on_disk: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// The current log. Later writes do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<MemoryLog> {
        self.log
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // ===========================================================================
    // Writes
    // ===========================================================================

    /// Append a decision and persist. Returns the new decision id.
    ///
    /// On a persistence failure the decision stays in the in-memory log and
    /// `Error::Persistence` is returned; it is lost on restart.
    pub fn record_decision(&self, decision: NewDecision) -> Result<String> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut next = (*self.snapshot()).clone();

        let now = Utc::now();
        let id = format!(
            "DEC_{}_{:04}",
            now.format("%Y%m%d_%H%M%S"),
            next.decisions.len() + 1
        );

        if let Some(precedent) = &decision.precedent_used {
            *next.precedent_usage.entry(precedent.clone()).or_insert(0) += 1;
        }
        next.decisions.push(DecisionRecord {
            id: id.clone(),
            timestamp: now,
            scenario_fingerprint: fingerprint(&decision.scenario),
            scenario_preview: preview(&decision.scenario, self.config.preview_chars),
            verdict: decision.verdict,
            precedent_used: decision.precedent_used,
            risk_scores: decision.risk_scores,
            rules_cited: decision.rules_cited,
            confidence: decision.confidence,
        });

        let next = self.swap(next);
        info!("Recorded decision {} ({})", id, decision.verdict);
        self.persist(&next).map_err(|e| {
            warn!("Decision {} kept in memory only: {}", id, e);
            e
        })?;
        Ok(id)
    }

    /// Append a feedback record. The decision id is not checked; dangling
    /// feedback is accepted and kept.
    pub fn add_feedback(
        &self,
        decision_id: &str,
        outcome: FeedbackOutcome,
        notes: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut next = (*self.snapshot()).clone();

        if !next.decisions.iter().any(|d| d.id == decision_id) {
            debug!("Feedback for unknown decision {}", decision_id);
        }
        next.feedback.push(FeedbackRecord {
            decision_id: decision_id.to_string(),
            timestamp: Utc::now(),
            outcome,
            notes: notes.to_string(),
        });

        let next = self.swap(next);
        info!("Feedback on {}: {}", decision_id, outcome);
        self.persist(&next)
    }

    fn swap(&self, next: MemoryLog) -> Arc<MemoryLog> {
        let next = Arc::new(next);
        *self.log.write().unwrap_or_else(|p| p.into_inner()) = next.clone();
        next
    }

    fn persist(&self, log: &MemoryLog) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fail = |reason: String| Error::persistence(path, reason);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        if self.unreadable_on_disk.load(AtomicOrdering::Acquire) {
            let backup = path.with_extension(format!(
                "json.corrupt-{}",
                Utc::now().format("%Y%m%d_%H%M%S")
            ));
            std::fs::rename(path, &backup)
                .map_err(|e| fail(format!("cannot move unreadable log aside: {}", e)))?;
            warn!("Unreadable decision log moved to {}", backup.display());
            self.unreadable_on_disk.store(false, AtomicOrdering::Release);
        }

        let content = serde_json::to_string_pretty(log).map_err(|e| fail(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| fail(e.to_string()))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(fail(e.to_string()));
        }
        debug!("Persisted {} decisions to {}", log.decisions.len(), path.display());
        Ok(())
    }

    // ===========================================================================
    // Reads
    // ===========================================================================

    /// Stored decisions sharing more than `min_overlap` words with `scenario`,
    /// scored by `overlap / |scenario words|`, best first.
    pub fn similar_decisions(&self, scenario: &str, limit: usize) -> Vec<SimilarDecision> {
        let query = tokenize(scenario);
        if query.is_empty() {
            return Vec::new();
        }

        let log = self.snapshot();
        let mut similar: Vec<SimilarDecision> = log
            .decisions
            .iter()
            .filter_map(|record| {
                let overlap = tokenize(&record.scenario_preview)
                    .intersection(&query)
                    .count();
                (overlap > self.config.min_overlap).then(|| SimilarDecision {
                    record: record.clone(),
                    similarity_score: overlap as f64 / query.len() as f64,
                })
            })
            .collect();

        similar.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        });
        similar.truncate(limit);
        similar
    }

    pub fn decision_by_id(&self, id: &str) -> Option<DecisionRecord> {
        self.snapshot().decisions.iter().find(|d| d.id == id).cloned()
    }

    /// The last `limit` decisions, newest first.
    pub fn recent_decisions(&self, limit: usize) -> Vec<DecisionRecord> {
        self.snapshot()
            .decisions
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn precedent_stats(&self) -> BTreeMap<String, u64> {
        self.snapshot().precedent_usage.clone()
    }

    /// Decision count per verdict. Verdicts never recorded are absent.
    pub fn verdict_distribution(&self) -> BTreeMap<String, usize> {
        verdict_counts(&self.snapshot())
    }

    /// Share of feedback records marked correct; 0.0 with no feedback.
    pub fn feedback_accuracy(&self) -> f64 {
        accuracy(&self.snapshot())
    }

    /// Every aggregate, computed from one snapshot.
    pub fn stats(&self) -> MemoryStats {
        let log = self.snapshot();
        MemoryStats {
            total_decisions: log.decisions.len(),
            verdict_distribution: verdict_counts(&log),
            precedent_usage: log.precedent_usage.clone(),
            feedback_count: log.feedback.len(),
            feedback_accuracy: accuracy(&log),
        }
    }
}

fn verdict_counts(log: &MemoryLog) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for d in &log.decisions {
        *counts.entry(d.verdict.to_string()).or_insert(0) += 1;
    }
    counts
}

fn accuracy(log: &MemoryLog) -> f64 {
    if log.feedback.is_empty() {
        return 0.0;
    }
    let correct = log
        .feedback
        .iter()
        .filter(|f| f.outcome == FeedbackOutcome::Correct)
        .count();
    correct as f64 / log.feedback.len() as f64
}

/// The log at `path`, and whether a file exists there that failed to parse.
fn read_log(path: &Path) -> (MemoryLog, bool) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (MemoryLog::default(), false),
        Err(e) => {
            warn!("Cannot read {}: {}. Starting with an empty log", path.display(), e);
            return (MemoryLog::default(), false);
        }
    };
    match serde_json::from_str(&content) {
        Ok(log) => (log, false),
        Err(e) => {
            warn!("Corrupt decision log {}: {}. Starting with an empty log", path.display(), e);
            (MemoryLog::default(), true)
        }
    }
}

/// First `max_chars` characters, with `...` appended when cut.
fn preview(scenario: &str, max_chars: usize) -> String {
    let mut chars = scenario.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
