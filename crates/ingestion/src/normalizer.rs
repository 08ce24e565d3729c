//! Record normalization shared by both filing sources.
//!
//! A [`SourcePolicy`] turns the rows of an upstream table into
//! [`TransactionRecord`]s, picks the working set used for flagging and builds
//! the group key of a record. The US and FI variants live in `us` and `fi`.

use crate::dedup::Resolved;
use crate::fi::FiPolicy;
use crate::us::UsPolicy;
use chrono::NaiveDate;
use insider_core::{Config, DateBasis, Direction, GroupKey, Result, Source, Table, TransactionRecord};
use serde::Serialize;

/// Source-specific normalization, dedup and grouping policy.
pub trait SourcePolicy {
    /// Source this policy handles.
    fn source(&self) -> Source;

    /// Normalize every row of the table. Dropped rows are only counted.
    ///
    /// Fails when a mandatory column is absent.
    fn normalize(&self, table: &Table, basis: DateBasis) -> Result<Normalized>;

    /// Select the records that take part in tolerance evaluation.
    fn deduplicate(&self, records: &[TransactionRecord]) -> Resolved;

    /// Key of the coordination group a record belongs to.
    fn group_key(&self, record: &TransactionRecord) -> GroupKey;
}

/// Build the policy for a source.
pub fn policy_for(source: Source, config: &Config) -> Result<Box<dyn SourcePolicy>> {
    Ok(match source {
        Source::Us => Box::new(UsPolicy::new(config.us.clone())),
        Source::Fi => Box::new(FiPolicy::new(&config.fi)?),
    })
}

/// Why a row was left out of the normalized set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// Transaction code mapped to no direction.
    UnrecognizedCode,
    /// Code outside the configured include-set.
    ExcludedCode,
    /// OTC / foreign-listed ticker.
    Otc,
    /// Filing by a 10%-owner reporting person.
    TenPercentOwner,
}

/// Outcome of normalizing one row.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Kept(TransactionRecord),
    Dropped(DropReason),
}

/// Row counts of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    /// Rows in the input table.
    pub total_rows: u64,
    /// Rows that produced a record.
    pub kept: u64,
    /// Kept records read as buys.
    pub buy: u64,
    /// Kept records read as sells.
    pub sell: u64,
    /// Kept records with no direction (FI).
    pub no_direction: u64,
    pub dropped_unrecognized: u64,
    pub dropped_excluded_code: u64,
    pub dropped_otc: u64,
    pub dropped_ten_percent_owner: u64,
}

impl NormalizationStats {
    /// Total rows dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_unrecognized
            + self.dropped_excluded_code
            + self.dropped_otc
            + self.dropped_ten_percent_owner
    }

    fn record(&mut self, outcome: &RowOutcome) {
        self.total_rows += 1;
        match outcome {
            RowOutcome::Kept(record) => {
                self.kept += 1;
                match record.direction {
                    Some(Direction::Buy) => self.buy += 1,
                    Some(Direction::Sell) => self.sell += 1,
                    None => self.no_direction += 1,
                }
            }
            RowOutcome::Dropped(DropReason::UnrecognizedCode) => self.dropped_unrecognized += 1,
            RowOutcome::Dropped(DropReason::ExcludedCode) => self.dropped_excluded_code += 1,
            RowOutcome::Dropped(DropReason::Otc) => self.dropped_otc += 1,
            RowOutcome::Dropped(DropReason::TenPercentOwner) => self.dropped_ten_percent_owner += 1,
        }
    }
}

/// Normalized records plus the dropped-row sink.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Kept records, in table order.
    pub records: Vec<TransactionRecord>,
    /// Row counts.
    pub stats: NormalizationStats,
}

impl FromIterator<RowOutcome> for Normalized {
    fn from_iter<I: IntoIterator<Item = RowOutcome>>(iter: I) -> Self {
        let mut normalized = Normalized::default();
        for outcome in iter {
            normalized.stats.record(&outcome);
            if let RowOutcome::Kept(record) = outcome {
                normalized.records.push(record);
            }
        }
        normalized
    }
}

/// Canonical form of a header for alias matching.
pub fn header_key(name: &str) -> String {
    collapse_whitespace(name)
        .to_lowercase()
        .replace(['\u{2013}', '\u{2014}'], "-")
}

/// Find the first column whose header matches one of the aliases.
pub fn find_column(table: &Table, aliases: &[&str]) -> Option<usize> {
    let headers: Vec<String> = table.columns().iter().map(|c| header_key(c)).collect();
    aliases
        .iter()
        .map(|alias| header_key(alias))
        .find_map(|alias| headers.iter().position(|h| *h == alias))
}

/// Collapse whitespace runs and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-cased, whitespace-collapsed identity key.
pub fn identity_key(text: &str) -> String {
    collapse_whitespace(text).to_uppercase()
}

/// Parse a date cell: ISO, day-first with `/` or `-`; time suffixes are ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let token = text
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?;
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// Pick the grouping date for the run's basis.
pub fn reference_date(
    basis: DateBasis,
    publication: Option<NaiveDate>,
    transaction: Option<NaiveDate>,
) -> Option<NaiveDate> {
    match basis {
        DateBasis::Publication => publication,
        DateBasis::Transaction => transaction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_key() {
        assert_eq!(header_key("  Publication   Date "), "publication date");
        assert_eq!(header_key("Volym\u{2013}enhet"), "volym-enhet");
    }

    #[test]
    fn test_find_column_uses_first_alias_present() {
        let table = Table::new(["Emittent", "Pris", "Price"]);
        assert_eq!(find_column(&table, &["issuer", "emittent"]), Some(0));
        assert_eq!(find_column(&table, &["price", "pris"]), Some(2));
        assert_eq!(find_column(&table, &["isin"]), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 11);
        assert_eq!(parse_date("2025-08-11"), expected);
        assert_eq!(parse_date("11/08/2025"), expected);
        assert_eq!(parse_date("11-08-2025"), expected);
        assert_eq!(parse_date("2025-08-11 08:30:00"), expected);
        assert_eq!(parse_date("2025-08-11T08:30:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_identity_key() {
        assert_eq!(identity_key("  jane   doe "), "JANE DOE");
    }

    #[test]
    fn test_stats_from_outcomes() {
        let mut buy = TransactionRecord::new(0, Source::Us, "ACME", "A");
        buy.direction = Some(Direction::Buy);
        let normalized: Normalized = vec![
            RowOutcome::Kept(buy),
            RowOutcome::Dropped(DropReason::Otc),
            RowOutcome::Dropped(DropReason::UnrecognizedCode),
        ]
        .into_iter()
        .collect();

        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.stats.total_rows, 3);
        assert_eq!(normalized.stats.buy, 1);
        assert_eq!(normalized.stats.dropped(), 2);
    }
}
