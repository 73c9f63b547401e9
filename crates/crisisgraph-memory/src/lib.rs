//! crisisgraph-memory — persistent decision history
//!
//! Decisions are appended, never rewritten; corrections arrive as separate
//! feedback records. The whole log is flushed to disk on every write.

pub mod fingerprint;
pub mod record;
pub mod store;

pub use fingerprint::{fingerprint, normalize, tokenize};
pub use record::{
    DecisionRecord, FeedbackOutcome, FeedbackRecord, MemoryLog, MemoryStats, NewDecision,
    SimilarDecision, Verdict,
};
pub use store::MemoryStore;
