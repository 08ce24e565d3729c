//! Swedish FI PDMR normalization.
//!
//! FI exports carry English or Swedish headers, day-first dates and
//! locale-formatted numbers. Direction is read from the free-text nature of
//! the transaction; duplicates are resolved by [`DuplicateResolver`].

use crate::dedup::{DuplicateResolver, Resolved};
use crate::normalizer::{
    collapse_whitespace, find_column, identity_key, parse_date, reference_date, Normalized,
    RowOutcome, SourcePolicy,
};
use insider_core::config::FiConfig;
use insider_core::{
    DateBasis, Direction, Error, GroupKey, Result, RevisionStatus, Source, Table,
    TransactionRecord,
};
use regex::{Regex, RegexBuilder};

const PUBLICATION_DATE: &[&str] = &["publication date", "publiceringsdatum", "pub_date"];
const TRANSACTION_DATE: &[&str] = &["transaction date", "transaktionsdatum", "tx_date"];
const ISSUER: &[&str] = &["issuer", "emittent"];
const PDMR: &[&str] = &[
    "person discharging managerial responsibilities",
    "person i ledande ställning",
    "buyer",
];
const ASSOCIATED: &[&str] = &["closely associated", "närstående", "associated"];
const NATURE: &[&str] = &["nature of transaction", "karaktär", "transaktionstyp", "nature"];
const INSTRUMENT: &[&str] = &["instrument name", "instrumentnamn", "instrument"];
const ISIN: &[&str] = &["isin"];
const VOLUME: &[&str] = &["volume", "volym"];
const PRICE: &[&str] = &["price", "pris"];
const CURRENCY: &[&str] = &["currency", "valuta"];
const STATUS: &[&str] = &["status"];

/// Resolved column positions of an FI table.
#[derive(Debug, Clone, Copy)]
struct FiColumns {
    publication_date: Option<usize>,
    transaction_date: Option<usize>,
    issuer: usize,
    pdmr: Option<usize>,
    associated: Option<usize>,
    nature: usize,
    instrument: Option<usize>,
    isin: Option<usize>,
    volume: Option<usize>,
    price: Option<usize>,
    currency: Option<usize>,
    status: Option<usize>,
}

impl FiColumns {
    fn bind(table: &Table, basis: DateBasis) -> Result<Self> {
        let columns = Self {
            publication_date: find_column(table, PUBLICATION_DATE),
            transaction_date: find_column(table, TRANSACTION_DATE),
            issuer: find_column(table, ISSUER).ok_or_else(|| Error::missing_column("Issuer/Emittent"))?,
            pdmr: find_column(table, PDMR),
            associated: find_column(table, ASSOCIATED),
            nature: find_column(table, NATURE)
                .ok_or_else(|| Error::missing_column("Nature of transaction/Karaktär"))?,
            instrument: find_column(table, INSTRUMENT),
            isin: find_column(table, ISIN),
            volume: find_column(table, VOLUME),
            price: find_column(table, PRICE),
            currency: find_column(table, CURRENCY),
            status: find_column(table, STATUS),
        };
        match basis {
            DateBasis::Publication if columns.publication_date.is_none() => {
                Err(Error::missing_column("Publication date/Publiceringsdatum"))
            }
            DateBasis::Transaction if columns.transaction_date.is_none() => {
                Err(Error::missing_column("Transaction date/Transaktionsdatum"))
            }
            _ => Ok(columns),
        }
    }
}

/// Normalization policy for FI PDMR tables.
#[derive(Debug, Clone)]
pub struct FiPolicy {
    buy: Regex,
    sell: Regex,
    number: Regex,
    resolver: DuplicateResolver,
}

impl FiPolicy {
    /// Create a policy; fails when a nature pattern does not compile.
    pub fn new(config: &FiConfig) -> Result<Self> {
        let compile = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::config(format!("invalid nature pattern '{pattern}': {e}")))
        };
        Ok(Self {
            buy: compile(&config.buy_pattern)?,
            sell: compile(&config.sell_pattern)?,
            number: Regex::new(r"-?\d+(?:\.\d+)?").map_err(|e| Error::config(e.to_string()))?,
            resolver: DuplicateResolver::new(config.keep_history, config.prefer_revised),
        })
    }

    /// Direction from the nature text; ambiguous or unknown text yields `None`.
    pub fn classify_nature(&self, nature: &str) -> Option<Direction> {
        match (self.buy.is_match(nature), self.sell.is_match(nature)) {
            (true, false) => Some(Direction::Buy),
            (false, true) => Some(Direction::Sell),
            _ => None,
        }
    }

    /// Lenient number parse for FI cells (`"1 234,50 SEK"` -> 1234.5).
    pub fn parse_number(&self, text: &str) -> Option<f64> {
        let mut compact: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{00a0}')
            .collect();
        if compact.contains(',') {
            compact = if compact.contains('.') {
                compact.replace(',', "")
            } else {
                compact.replace(',', ".")
            };
        }
        self.number
            .find(&compact)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn normalize_row(&self, table: &Table, row: usize, cols: &FiColumns, basis: DateBasis) -> RowOutcome {
        let issuer = table
            .text(row, Some(cols.issuer))
            .map(|s| identity_key(&s))
            .unwrap_or_default();
        let pdmr = table.text(row, cols.pdmr).map(|s| identity_key(&s)).unwrap_or_default();
        let insider = match table.text(row, cols.associated) {
            Some(assoc) => format!("{} / {}", pdmr, identity_key(&assoc)),
            None => pdmr,
        };

        let mut record = TransactionRecord::new(row, Source::Fi, issuer, insider);
        record.direction = table
            .text(row, Some(cols.nature))
            .and_then(|s| self.classify_nature(&collapse_whitespace(&s)));
        record.publication_date = table.text(row, cols.publication_date).and_then(|s| parse_date(&s));
        record.transaction_date = table.text(row, cols.transaction_date).and_then(|s| parse_date(&s));
        record.reference_date = reference_date(basis, record.publication_date, record.transaction_date);
        record.price = table
            .text(row, cols.price)
            .and_then(|s| self.parse_number(&s))
            .filter(|p| *p >= 0.0);
        record.volume = table.text(row, cols.volume).and_then(|s| self.parse_number(&s));
        record.revision_status = table.text(row, cols.status).and_then(|s| RevisionStatus::parse(&s));
        record.currency = table.text(row, cols.currency).map(|s| identity_key(&s));
        record.instrument_id = table
            .text(row, cols.isin)
            .or_else(|| table.text(row, cols.instrument))
            .map(|s| identity_key(&s));
        RowOutcome::Kept(record)
    }
}

impl SourcePolicy for FiPolicy {
    fn source(&self) -> Source {
        Source::Fi
    }

    fn normalize(&self, table: &Table, basis: DateBasis) -> Result<Normalized> {
        let cols = FiColumns::bind(table, basis)?;
        Ok((0..table.len())
            .map(|row| self.normalize_row(table, row, &cols, basis))
            .collect())
    }

    fn deduplicate(&self, records: &[TransactionRecord]) -> Resolved {
        self.resolver.resolve(records)
    }

    fn group_key(&self, record: &TransactionRecord) -> GroupKey {
        GroupKey {
            issuer_key: record.issuer_key.clone(),
            reference_date: record.reference_date,
            currency: record.currency.clone(),
            instrument_id: record.instrument_id.clone(),
        }
    }
}
