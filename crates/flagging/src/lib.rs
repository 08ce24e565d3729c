//! Coordination flagging for the insider coordination engine.
//!
//! This crate handles:
//! - Partitioning records into coordination groups per direction
//! - Price-span tolerance evaluation (absolute OR relative to the median)
//! - Broadcasting group verdicts onto per-row flag columns
//! - Legacy single-direction column aliases

pub mod grouping;
pub mod tolerance;
pub mod broadcast;
pub mod alias;
pub mod engine;

pub use grouping::{membership, partition, CoordinationGroup};
pub use tolerance::{GroupEvaluation, PriceSpan, ToleranceConfig, ToleranceEvaluator};
pub use broadcast::{broadcast, read_verdict, write_direction_columns};
pub use alias::write_legacy_columns;
pub use engine::{FlaggingEngine, FlaggingOutcome, PassSummary, RunSummary};
