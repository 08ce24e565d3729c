//! Filing ingestion and normalization for the insider coordination engine.
//!
//! This crate handles:
//! - Header alias resolution for US Form 4 and FI PDMR tables
//! - Record normalization (direction, dates, prices, identities)
//! - Source filtering (OTC tickers, 10%-owners, transaction codes)
//! - FI duplicate-filing resolution

pub mod normalizer;
pub mod us;
pub mod fi;
pub mod dedup;

pub use normalizer::{policy_for, DropReason, NormalizationStats, Normalized, RowOutcome, SourcePolicy};
pub use us::UsPolicy;
pub use fi::FiPolicy;
pub use dedup::{DedupStats, DuplicateResolver, Resolved};
