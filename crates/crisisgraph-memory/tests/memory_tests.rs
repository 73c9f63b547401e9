//! Tests for crisisgraph-memory: recording, similarity, aggregates, and persistence on disk

use crisisgraph_core::config::MemoryConfig;
use crisisgraph_memory::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const EQUIFAX: &str = "Customer database breach discovered, legal suggests waiting two weeks before notifying regulators";

fn config_at(path: &Path) -> MemoryConfig {
    MemoryConfig {
        path: path.to_path_buf(),
        ..MemoryConfig::default()
    }
}

fn scores() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("financial".to_string(), 6.0),
        ("ethical".to_string(), 5.0),
        ("legal".to_string(), 7.5),
        ("total".to_string(), 6.2),
    ])
}

// ===========================================================================
// Recording
// ===========================================================================

#[test]
fn record_fills_every_field() {
    let store = MemoryStore::in_memory(MemoryConfig::default());
    let id = store
        .record_decision(
            NewDecision::new(EQUIFAX, Verdict::Reject)
                .with_precedent("PREC_EQUIFAX_2017")
                .with_risk_scores(scores())
                .with_rules(vec!["LAW_GDPR_ART33".into(), "HEUR_TRUST".into()])
                .with_confidence(0.9),
        )
        .unwrap();

    let record = store.decision_by_id(&id).unwrap();
    assert_eq!(record.verdict, Verdict::Reject);
    assert_eq!(record.scenario_fingerprint, fingerprint(EQUIFAX));
    assert_eq!(record.scenario_preview, EQUIFAX);
    assert_eq!(record.precedent_used.as_deref(), Some("PREC_EQUIFAX_2017"));
    assert_eq!(record.rules_cited.len(), 2);
    assert_eq!(record.risk_scores["legal"], 7.5);
    assert_eq!(record.confidence, Some(0.9));
    assert_eq!(store.precedent_stats()["PREC_EQUIFAX_2017"], 1);
}

#[test]
fn long_scenarios_are_previewed() {
    let store = MemoryStore::in_memory(MemoryConfig::default());
    let long = "word ".repeat(100);
    let id = store.record_decision(NewDecision::new(long.clone(), Verdict::Unknown)).unwrap();
    let record = store.decision_by_id(&id).unwrap();
    assert_eq!(record.scenario_preview.chars().count(), 203);
    assert!(record.scenario_preview.ends_with("..."));
    assert_eq!(record.scenario_fingerprint, fingerprint(&long));
}

#[test]
fn unknown_decision_id_is_none() {
    let store = MemoryStore::in_memory(MemoryConfig::default());
    assert!(store.decision_by_id("DEC_NOPE").is_none());
}

// ===========================================================================
// Similarity
// ===========================================================================

#[test]
fn same_scenario_is_most_similar() {
    let store = MemoryStore::in_memory(MemoryConfig::default());
    store
        .record_decision(NewDecision::new(
            "Supplier invoices look inflated, board wants to restate quarterly revenue",
            Verdict::Approve,
        ))
        .unwrap();
    let id = store.record_decision(NewDecision::new(EQUIFAX, Verdict::Reject)).unwrap();

    let similar = store.similar_decisions(EQUIFAX, 5);
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].record.id, id);
    assert_eq!(similar[0].similarity_score, 1.0);
}

#[test]
fn similar_results_ranked_and_limited() {
    let store = MemoryStore::in_memory(MemoryConfig::default());
    store.record_decision(NewDecision::new("alpha beta gamma delta", Verdict::Approve)).unwrap();
    store
        .record_decision(NewDecision::new("alpha beta gamma delta epsilon zeta", Verdict::Approve))
        .unwrap();
    store
        .record_decision(NewDecision::new("alpha beta gamma delta epsilon", Verdict::Reject))
        .unwrap();

    let query = "alpha beta gamma delta epsilon zeta";
    let all = store.similar_decisions(query, 5);
    let scores: Vec<f64> = all.iter().map(|s| s.similarity_score).collect();
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(scores[0], 1.0);

    assert_eq!(store.similar_decisions(query, 1).len(), 1);
}

// ===========================================================================
// Aggregates
// ===========================================================================

#[test]
fn aggregates_over_log() {
    let store = MemoryStore::in_memory(MemoryConfig::default());
    let a = store
        .record_decision(NewDecision::new("one", Verdict::Reject).with_precedent("P1"))
        .unwrap();
    let b = store
        .record_decision(NewDecision::new("two", Verdict::Reject).with_precedent("P1"))
        .unwrap();
    store
        .record_decision(NewDecision::new("three", Verdict::Approve).with_precedent("P2"))
        .unwrap();

    let dist = store.verdict_distribution();
    assert_eq!(dist["REJECT"], 2);
    assert_eq!(dist["APPROVE"], 1);
    assert!(!dist.contains_key("UNKNOWN"));

    let usage = store.precedent_stats();
    assert_eq!(usage["P1"], 2);
    assert_eq!(usage["P2"], 1);

    let recent = store.recent_decisions(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].scenario_preview, "three");
    assert_eq!(recent[1].id, b);

    assert_eq!(store.feedback_accuracy(), 0.0);
    store.add_feedback(&a, FeedbackOutcome::Correct, "").unwrap();
    store.add_feedback(&b, FeedbackOutcome::Incorrect, "regulator fined anyway").unwrap();
    store.add_feedback(&b, FeedbackOutcome::PartiallyCorrect, "").unwrap();
    store.add_feedback(&a, FeedbackOutcome::Correct, "").unwrap();
    assert_eq!(store.feedback_accuracy(), 0.5);

    let stats = store.stats();
    assert_eq!(stats.total_decisions, 3);
    assert_eq!(stats.feedback_count, 4);
    assert_eq!(stats.feedback_accuracy, 0.5);
}

// ===========================================================================
// Persistence
// ===========================================================================

#[test]
fn reload_yields_identical_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("decision_history.json");

    let store = MemoryStore::load(config_at(&path));
    let id = store
        .record_decision(
            NewDecision::new(EQUIFAX, Verdict::Reject)
                .with_precedent("PREC_EQUIFAX_2017")
                .with_risk_scores(scores())
                .with_confidence(0.85),
        )
        .unwrap();
    store
        .record_decision(NewDecision::new("second scenario", Verdict::Approve))
        .unwrap();
    store.add_feedback(&id, FeedbackOutcome::Correct, "held up").unwrap();
    assert!(path.exists());

    let reloaded = MemoryStore::load(config_at(&path));
    assert_eq!(*reloaded.snapshot(), *store.snapshot());
    assert_eq!(reloaded.recent_decisions(10)[1].id, id);
}

#[test]
fn persisted_document_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let store = MemoryStore::load(config_at(&path));
    store
        .record_decision(NewDecision::new("shape check", Verdict::Approve).with_precedent("P1"))
        .unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc["decisions"].is_array());
    assert_eq!(doc["precedent_usage"]["P1"], 1);
    assert!(doc["feedback"].as_array().unwrap().is_empty());
    assert_eq!(doc["decisions"][0]["verdict"], "APPROVE");
    assert!(doc["decisions"][0]["scenario_fingerprint"].is_string());
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::load(config_at(&dir.path().join("absent.json")));
    assert!(store.snapshot().decisions.is_empty());
}

#[test]
fn corrupt_file_is_moved_aside_before_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = MemoryStore::load(config_at(&path));
    assert!(store.snapshot().decisions.is_empty());
    // Nothing moves until the log is rewritten.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");

    store.record_decision(NewDecision::new("fresh start", Verdict::Unknown)).unwrap();
    store.record_decision(NewDecision::new("second entry", Verdict::Unknown)).unwrap();

    let backups: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().contains(".corrupt-"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "{ not json");

    let reloaded = MemoryStore::load(config_at(&path));
    assert_eq!(reloaded.snapshot().decisions.len(), 2);
}

#[test]
fn history_with_naive_timestamps_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(
        &path,
        r#"{
            "decisions": [{
                "id": "DEC_20240101_120000",
                "timestamp": "2024-01-01T12:00:00.123456",
                "scenario_hash": "0123456789abcdef",
                "scenario_preview": "Customer database breach discovered, legal suggests waiting two weeks",
                "verdict": "REJECT",
                "precedent_used": "PREC_EQUIFAX_2017",
                "risk_scores": {"financial": 7, "legal": 9.5},
                "rules_cited": ["LAW_GDPR_ART33"],
                "confidence": null
            }],
            "precedent_usage": {"PREC_EQUIFAX_2017": 1},
            "feedback": [{
                "decision_id": "DEC_20240101_120000",
                "timestamp": "2024-01-02T09:30:00",
                "outcome": "correct",
                "notes": ""
            }]
        }"#,
    )
    .unwrap();

    let store = MemoryStore::load(config_at(&path));
    let log = store.snapshot();
    assert_eq!(log.decisions.len(), 1);
    assert_eq!(log.feedback.len(), 1);
    assert_eq!(log.decisions[0].scenario_fingerprint, "0123456789abcdef");
    assert_eq!(log.decisions[0].risk_scores["financial"], 7.0);
    assert_eq!(
        log.decisions[0].timestamp.to_rfc3339(),
        "2024-01-01T12:00:00.123456+00:00"
    );

    // Appending keeps the older entries.
    let id = store.record_decision(NewDecision::new(EQUIFAX, Verdict::Reject)).unwrap();
    assert!(id.ends_with("_0002"));
    let reloaded = MemoryStore::load(config_at(&path));
    assert_eq!(reloaded.snapshot().decisions.len(), 2);
    assert_eq!(reloaded.precedent_stats()["PREC_EQUIFAX_2017"], 1);
    assert_eq!(reloaded.feedback_accuracy(), 1.0);
}

// ===========================================================================
// Concurrency
// ===========================================================================

#[test]
fn concurrent_writers_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let store = Arc::new(MemoryStore::load(config_at(&path)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                for j in 0..5 {
                    store
                        .record_decision(NewDecision::new(format!("thread {} decision {}", i, j), Verdict::Approve))
                        .unwrap();
                    let _ = store.similar_decisions("thread decision", 3);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let log = store.snapshot();
    assert_eq!(log.decisions.len(), 40);
    let mut ids: Vec<&str> = log.decisions.iter().map(|d| d.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
    assert_eq!(MemoryStore::load(config_at(&path)).snapshot().decisions.len(), 40);
}
