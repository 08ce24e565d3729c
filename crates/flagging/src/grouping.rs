//! Partition of normalized records into coordination groups.
//!
//! Groups are keyed by the source policy's [`GroupKey`] within one direction
//! pass. A `BTreeMap` keeps iteration (and therefore logging and summaries)
//! deterministic.

use insider_core::{Direction, GroupKey, TransactionRecord};
use insider_ingestion::SourcePolicy;
use std::collections::{BTreeMap, BTreeSet};

/// Records considered jointly for one coordination verdict.
#[derive(Debug, Clone)]
pub struct CoordinationGroup<'a> {
    /// Shared key of all members.
    pub key: GroupKey,
    /// Direction of the pass that built the group.
    pub direction: Direction,
    /// Working-set members, in input order.
    pub members: Vec<&'a TransactionRecord>,
}

impl<'a> CoordinationGroup<'a> {
    fn new(key: GroupKey, direction: Direction) -> Self {
        Self {
            key,
            direction,
            members: Vec::new(),
        }
    }

    /// Number of unique insiders, priced or not.
    pub fn distinct_parties(&self) -> u32 {
        self.members
            .iter()
            .map(|r| r.insider_id.as_str())
            .collect::<BTreeSet<_>>()
            .len() as u32
    }

    /// Prices of the priced members.
    pub fn prices(&self) -> Vec<f64> {
        self.members.iter().filter_map(|r| r.price).collect()
    }

    /// Table rows of the members.
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|r| r.row)
    }
}

/// Partition the working set of one direction.
///
/// `working` indexes into `records`; records of the other direction (or with
/// no direction) are skipped.
pub fn partition<'a>(
    policy: &dyn SourcePolicy,
    records: &'a [TransactionRecord],
    working: &[usize],
    direction: Direction,
) -> BTreeMap<GroupKey, CoordinationGroup<'a>> {
    let mut groups: BTreeMap<GroupKey, CoordinationGroup<'a>> = BTreeMap::new();
    for record in working.iter().filter_map(|&i| records.get(i)) {
        if record.direction != Some(direction) {
            continue;
        }
        let key = policy.group_key(record);
        groups
            .entry(key.clone())
            .or_insert_with(|| CoordinationGroup::new(key, direction))
            .members
            .push(record);
    }
    groups
}

/// Group key to member table rows, for every normalized record of the
/// direction (working set or not).
///
/// Superseded duplicates and excluded `History` filings land on the same key
/// as their authoritative record, so they receive that group's verdict.
pub fn membership(
    policy: &dyn SourcePolicy,
    records: &[TransactionRecord],
    direction: Direction,
) -> BTreeMap<GroupKey, Vec<usize>> {
    let mut index: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.direction == Some(direction)) {
        index.entry(policy.group_key(record)).or_default().push(record.row);
    }
    index
}
