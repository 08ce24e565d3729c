//! Coordination flagging engine.
//!
//! Combines normalization, dedup, grouping, tolerance evaluation and the
//! column writers into one entry point. The engine is a pure function of
//! (table, config): flag columns are never read back as input, and every run
//! overwrites them.

use crate::alias::write_legacy_columns;
use crate::broadcast::{broadcast, write_direction_columns};
use crate::grouping::{membership, partition};
use crate::tolerance::{ToleranceConfig, ToleranceEvaluator};
use insider_core::{Config, Direction, FlagSet, GroupVerdict, Result, Source, Table};
use insider_ingestion::{policy_for, DedupStats, NormalizationStats, SourcePolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Summary of one direction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub direction: Direction,
    /// Groups built from the working set.
    pub groups: usize,
    /// Groups flagged as coordinated.
    pub matched_groups: usize,
    /// Rows carrying a matched verdict.
    pub flagged_rows: usize,
}

/// Summary of a flagging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub source: Source,
    /// Rows in the input table.
    pub rows: usize,
    /// Normalization counts (the dropped-row sink).
    pub normalization: NormalizationStats,
    /// Dedup counts.
    pub dedup: DedupStats,
    /// One entry per evaluated direction, Buy first.
    pub passes: Vec<PassSummary>,
}

impl RunSummary {
    fn empty(source: Source) -> Self {
        Self {
            source,
            rows: 0,
            normalization: NormalizationStats::default(),
            dedup: DedupStats::default(),
            passes: Vec::new(),
        }
    }

    /// Pass summary for a direction, if it was evaluated.
    pub fn pass(&self, direction: Direction) -> Option<&PassSummary> {
        self.passes.iter().find(|p| p.direction == direction)
    }

    /// Serialize as JSON for caller-level reporting.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Per-row flags plus the run summary.
#[derive(Debug, Clone)]
pub struct FlaggingOutcome {
    /// One entry per table row.
    pub flags: Vec<FlagSet>,
    pub summary: RunSummary,
}

/// Coordination flagging engine.
pub struct FlaggingEngine {
    config: Config,
    evaluator: ToleranceEvaluator,
    us: Box<dyn SourcePolicy>,
    fi: Box<dyn SourcePolicy>,
}

impl FlaggingEngine {
    /// Create a new engine. Fails on invalid thresholds or FI patterns.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            evaluator: ToleranceEvaluator::new(ToleranceConfig::from(&config.flagging)),
            us: policy_for(Source::Us, &config)?,
            fi: policy_for(Source::Fi, &config)?,
            config,
        })
    }

    /// Get the run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn policy(&self, source: Source) -> &dyn SourcePolicy {
        match source {
            Source::Us => self.us.as_ref(),
            Source::Fi => self.fi.as_ref(),
        }
    }

    /// Compute per-row flags without touching the table.
    pub fn evaluate(&self, table: &Table, source: Source) -> Result<FlaggingOutcome> {
        if table.is_empty() {
            return Ok(FlaggingOutcome {
                flags: Vec::new(),
                summary: RunSummary::empty(source),
            });
        }

        let policy = self.policy(source);
        let settings = &self.config.flagging;
        let normalized = policy.normalize(table, settings.date_basis)?;
        let resolved = policy.deduplicate(&normalized.records);
        let records = &normalized.records;

        let mut flags = vec![FlagSet::default(); table.len()];
        let mut passes = Vec::new();

        for &direction in settings.directions.directions() {
            let groups = partition(policy, records, &resolved.working, direction);

            let mut verdicts: BTreeMap<_, GroupVerdict> = BTreeMap::new();
            let mut matched_groups = 0;
            for (key, group) in &groups {
                let evaluation = self.evaluator.evaluate(group);
                if evaluation.is_match() {
                    matched_groups += 1;
                    debug!(
                        direction = direction.suffix(),
                        issuer = %key.issuer_key,
                        date = ?key.reference_date,
                        parties = evaluation.distinct_parties,
                        span_abs = evaluation.verdict.span_abs,
                        span_pct = evaluation.verdict.span_pct,
                        basis = %evaluation.verdict.basis,
                        "coordinated group"
                    );
                }
                verdicts.insert(key.clone(), evaluation.verdict);
            }

            let index = membership(policy, records, direction);
            let flagged_rows = broadcast(&mut flags, direction, &index, &verdicts);

            passes.push(PassSummary {
                direction,
                groups: groups.len(),
                matched_groups,
                flagged_rows,
            });
        }

        let summary = RunSummary {
            source,
            rows: table.len(),
            normalization: normalized.stats,
            dedup: resolved.stats,
            passes,
        };

        info!(
            source = ?source,
            rows = summary.rows,
            kept = summary.normalization.kept,
            dropped = summary.normalization.dropped(),
            working = summary.dedup.working,
            matched_buy = summary.pass(Direction::Buy).map(|p| p.matched_groups),
            matched_sell = summary.pass(Direction::Sell).map(|p| p.matched_groups),
            "coordination flagging complete"
        );

        Ok(FlaggingOutcome { flags, summary })
    }

    /// Evaluate and write the Buy, Sell and legacy columns onto the table.
    pub fn flag(&self, table: &mut Table, source: Source) -> Result<RunSummary> {
        let outcome = self.evaluate(table, source)?;
        for direction in Direction::ALL {
            write_direction_columns(table, direction, &outcome.flags)?;
        }
        write_legacy_columns(table, &outcome.flags)?;
        Ok(outcome.summary)
    }
}
