//! Duplicate-filing resolution for FI PDMR records.
//!
//! The FI register republishes a transaction as `Revised` (amendment) or
//! `History` (restatement). Only one filing per underlying transaction may
//! count towards a coordination group, so each duplicate set collapses to one
//! authoritative record. Rows are never removed from the output table; the
//! resolver only decides which records form the working set.

use insider_core::{Direction, RevisionStatus, TransactionRecord};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;
use tracing::debug;

/// Counts of a dedup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Records offered to the resolver.
    pub input: u64,
    /// Records without a direction (never in the working set).
    pub no_direction: u64,
    /// `History` records left out.
    pub history_excluded: u64,
    /// Records superseded by a better filing of the same transaction.
    pub duplicates_collapsed: u64,
    /// Records in the working set.
    pub working: u64,
}

/// Working set chosen from a record slice.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    /// Indices into the record slice, ascending.
    pub working: Vec<usize>,
    pub stats: DedupStats,
}

impl Resolved {
    /// Every directed record is in the working set (no dedup).
    pub fn passthrough(records: &[TransactionRecord]) -> Self {
        let working: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.direction.is_some())
            .map(|(i, _)| i)
            .collect();
        let stats = DedupStats {
            input: records.len() as u64,
            no_direction: (records.len() - working.len()) as u64,
            working: working.len() as u64,
            ..DedupStats::default()
        };
        Self { working, stats }
    }
}

/// Identity of the underlying transaction a filing describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TransactionKey<'a> {
    direction: Direction,
    insider_id: &'a str,
    issuer_key: &'a str,
    reference_date: Option<chrono::NaiveDate>,
    currency: Option<&'a str>,
    instrument_id: Option<&'a str>,
    price: Option<OrderedFloat<f64>>,
}

impl<'a> TransactionKey<'a> {
    fn of(record: &'a TransactionRecord, direction: Direction) -> Self {
        Self {
            direction,
            insider_id: &record.insider_id,
            issuer_key: &record.issuer_key,
            reference_date: record.reference_date,
            currency: record.currency.as_deref(),
            instrument_id: record.instrument_id.as_deref(),
            price: record.price.map(OrderedFloat),
        }
    }
}

/// Collapses duplicate filings into one authoritative record each.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    /// Keep `History` publications in the working set.
    keep_history: bool,
    /// Prefer `Revised` over `Notification` (inverted when false).
    prefer_revised: bool,
}

impl DuplicateResolver {
    /// Create a resolver.
    pub fn new(keep_history: bool, prefer_revised: bool) -> Self {
        Self {
            keep_history,
            prefer_revised,
        }
    }

    /// Status preference; higher wins.
    fn status_rank(&self, status: Option<RevisionStatus>) -> u8 {
        match (status, self.prefer_revised) {
            (Some(RevisionStatus::Revised), true) | (Some(RevisionStatus::Notification), false) => 2,
            (Some(RevisionStatus::Notification), true) | (Some(RevisionStatus::Revised), false) => 1,
            _ => 0,
        }
    }

    /// Ordering of two filings of the same transaction; `Greater` is preferred.
    ///
    /// Status rank, then completeness (trade date, volume), then the latest
    /// publication date, then the earliest row.
    fn preference(&self, a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
        let key = |r: &TransactionRecord| {
            (
                self.status_rank(r.revision_status),
                completeness(r),
                r.publication_date,
                Reverse(r.row),
            )
        };
        key(a).cmp(&key(b))
    }

    /// Choose the working set from a slice of records.
    pub fn resolve(&self, records: &[TransactionRecord]) -> Resolved {
        let mut stats = DedupStats {
            input: records.len() as u64,
            ..DedupStats::default()
        };

        // transaction -> index of the best filing seen so far
        let mut best: HashMap<TransactionKey<'_>, usize> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            let Some(direction) = record.direction else {
                stats.no_direction += 1;
                continue;
            };
            if !self.keep_history && record.revision_status == Some(RevisionStatus::History) {
                stats.history_excluded += 1;
                continue;
            }

            let key = TransactionKey::of(record, direction);
            match best.get_mut(&key) {
                Some(current) => {
                    stats.duplicates_collapsed += 1;
                    if self.preference(record, &records[*current]) == Ordering::Greater {
                        debug!(
                            insider = %record.insider_id,
                            issuer = %record.issuer_key,
                            kept_row = record.row,
                            superseded_row = records[*current].row,
                            "duplicate filing superseded"
                        );
                        *current = idx;
                    }
                }
                None => {
                    best.insert(key, idx);
                }
            }
        }

        let mut working: Vec<usize> = best.into_values().collect();
        working.sort_unstable();
        stats.working = working.len() as u64;

        Resolved { working, stats }
    }
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new(false, true)
    }
}

/// How many of trade date and volume a record carries.
///
/// Price is part of the transaction key, so it is equal within a duplicate set.
fn completeness(record: &TransactionRecord) -> u8 {
    record.transaction_date.is_some() as u8 + record.volume.is_some() as u8
}
