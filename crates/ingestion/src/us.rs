//! US SEC Form 4 normalization.
//!
//! Direction comes from the Form 4 transaction code. OTC tickers and
//! 10%-owner filings are dropped unless the configuration retains them.

use crate::dedup::Resolved;
use crate::normalizer::{
    find_column, identity_key, parse_date, reference_date, DropReason, Normalized, RowOutcome,
    SourcePolicy,
};
use insider_core::config::UsConfig;
use insider_core::{
    DateBasis, Direction, Error, GroupKey, Result, Source, Table, TransactionRecord,
};
use std::collections::HashSet;
use tracing::warn;

const ISSUER: &[&str] = &["issuer", "issuer_name", "issuerName"];
const TICKER: &[&str] = &["ticker", "symbol", "issuerTradingSymbol"];
const BUYER: &[&str] = &["buyer", "insider", "rptOwnerName", "reporting_person"];
const TRADE_DATE: &[&str] = &["trade_date", "transaction_date", "transactionDate"];
const FILING_DATE: &[&str] = &["filing_date", "date_filed", "publication_date"];
const PRICE: &[&str] = &["price", "transactionPricePerShare"];
const SHARES: &[&str] = &["shares", "transactionShares", "volume"];
const CODE: &[&str] = &["transaction_code", "transactionCode", "code"];
const TEN_PERCENT: &[&str] = &["is_ten_percent_owner", "isTenPercentOwner", "ten_percent_owner"];

/// Resolved column positions of a US table.
#[derive(Debug, Clone, Copy)]
struct UsColumns {
    issuer: Option<usize>,
    ticker: Option<usize>,
    buyer: Option<usize>,
    trade_date: Option<usize>,
    filing_date: Option<usize>,
    price: Option<usize>,
    shares: Option<usize>,
    code: usize,
    ten_percent: Option<usize>,
}

impl UsColumns {
    fn bind(table: &Table, basis: DateBasis) -> Result<Self> {
        let columns = Self {
            issuer: find_column(table, ISSUER),
            ticker: find_column(table, TICKER),
            buyer: find_column(table, BUYER),
            trade_date: find_column(table, TRADE_DATE),
            filing_date: find_column(table, FILING_DATE),
            price: find_column(table, PRICE),
            shares: find_column(table, SHARES),
            code: find_column(table, CODE).ok_or_else(|| Error::missing_column("transaction_code"))?,
            ten_percent: find_column(table, TEN_PERCENT),
        };
        if columns.issuer.is_none() && columns.ticker.is_none() {
            return Err(Error::missing_column("issuer"));
        }
        match basis {
            DateBasis::Publication if columns.filing_date.is_none() => {
                Err(Error::missing_column("filing_date"))
            }
            DateBasis::Transaction if columns.trade_date.is_none() => {
                Err(Error::missing_column("trade_date"))
            }
            _ => Ok(columns),
        }
    }
}

/// Normalization policy for US Form 4 tables.
#[derive(Debug, Clone)]
pub struct UsPolicy {
    config: UsConfig,
    buy_codes: HashSet<String>,
    sell_codes: HashSet<String>,
    include_codes: Option<HashSet<String>>,
}

impl UsPolicy {
    /// Create a policy from the US rules.
    pub fn new(config: UsConfig) -> Self {
        let code_set = |codes: &[String]| -> HashSet<String> {
            codes.iter().map(|c| c.trim().to_ascii_uppercase()).collect()
        };
        Self {
            buy_codes: code_set(&config.buy_codes),
            sell_codes: code_set(&config.sell_codes),
            include_codes: config.include_codes.as_deref().map(code_set),
            config,
        }
    }

    /// Map a transaction code to a direction, or say why the row goes.
    pub fn classify_code(&self, code: &str) -> std::result::Result<Direction, DropReason> {
        let code = code.trim().to_ascii_uppercase();
        if let Some(include) = &self.include_codes {
            if !include.contains(&code) {
                return Err(DropReason::ExcludedCode);
            }
        }
        if self.buy_codes.contains(&code) {
            Ok(Direction::Buy)
        } else if self.sell_codes.contains(&code) {
            Ok(Direction::Sell)
        } else {
            Err(DropReason::UnrecognizedCode)
        }
    }

    /// Whether a ticker looks OTC / foreign-listed.
    pub fn is_otc_symbol(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        symbol.is_empty() || symbol.contains('.') || symbol.chars().count() > self.config.max_symbol_len
    }

    fn normalize_row(&self, table: &Table, row: usize, cols: &UsColumns, basis: DateBasis) -> RowOutcome {
        let code = table.text(row, Some(cols.code)).unwrap_or_default();
        let direction = match self.classify_code(&code) {
            Ok(direction) => direction,
            Err(reason) => return RowOutcome::Dropped(reason),
        };

        let ticker = table.text(row, cols.ticker);
        if !self.config.keep_otc && cols.ticker.is_some() && self.is_otc_symbol(ticker.as_deref().unwrap_or("")) {
            return RowOutcome::Dropped(DropReason::Otc);
        }
        if !self.config.keep_ten_percent_owners
            && table.text(row, cols.ten_percent).is_some_and(|v| is_truthy(&v))
        {
            return RowOutcome::Dropped(DropReason::TenPercentOwner);
        }

        let issuer = table
            .text(row, cols.issuer)
            .or(ticker)
            .map(|s| identity_key(&s))
            .unwrap_or_default();
        let insider = table
            .text(row, cols.buyer)
            .map(|s| identity_key(&s))
            .unwrap_or_default();

        let mut record = TransactionRecord::new(row, Source::Us, issuer, insider);
        record.direction = Some(direction);
        record.publication_date = table.text(row, cols.filing_date).and_then(|s| parse_date(&s));
        record.transaction_date = table.text(row, cols.trade_date).and_then(|s| parse_date(&s));
        record.reference_date = reference_date(basis, record.publication_date, record.transaction_date);
        record.price = table.text(row, cols.price).and_then(|s| parse_decimal(&s));
        record.volume = table.text(row, cols.shares).and_then(|s| parse_decimal(&s));
        RowOutcome::Kept(record)
    }
}

impl SourcePolicy for UsPolicy {
    fn source(&self) -> Source {
        Source::Us
    }

    fn normalize(&self, table: &Table, basis: DateBasis) -> Result<Normalized> {
        let cols = UsColumns::bind(table, basis)?;
        if cols.ticker.is_none() && !self.config.keep_otc {
            warn!("no ticker column, OTC filter not applied");
        }
        Ok((0..table.len())
            .map(|row| self.normalize_row(table, row, &cols, basis))
            .collect())
    }

    fn deduplicate(&self, records: &[TransactionRecord]) -> Resolved {
        Resolved::passthrough(records)
    }

    fn group_key(&self, record: &TransactionRecord) -> GroupKey {
        GroupKey {
            issuer_key: record.issuer_key.clone(),
            reference_date: record.reference_date,
            currency: None,
            instrument_id: None,
        }
    }
}

/// Plain decimal; negative or non-finite values count as missing.
fn parse_decimal(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn is_truthy(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "x"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use insider_core::Cell;

    const HEADER: [&str; 8] = [
        "buyer",
        "issuer",
        "ticker",
        "trade_date",
        "filing_date",
        "price",
        "transaction_code",
        "is_ten_percent_owner",
    ];

    fn make_table(rows: &[[&str; 8]]) -> Table {
        let mut table = Table::new(HEADER);
        for row in rows {
            table
                .push_row(row.iter().map(|s| Cell::from(*s)).collect())
                .unwrap();
        }
        table
    }

    #[test]
    fn test_default_code_mapping() {
        let policy = UsPolicy::new(UsConfig::default());
        assert_eq!(policy.classify_code("p"), Ok(Direction::Buy));
        assert_eq!(policy.classify_code(" A "), Ok(Direction::Buy));
        assert_eq!(policy.classify_code("F"), Ok(Direction::Sell));
        assert_eq!(policy.classify_code("M"), Err(DropReason::UnrecognizedCode));
    }

    #[test]
    fn test_include_codes_restrict() {
        let policy = UsPolicy::new(UsConfig {
            include_codes: Some(vec!["P".to_string(), "C".to_string()]),
            ..UsConfig::default()
        });
        assert_eq!(policy.classify_code("P"), Ok(Direction::Buy));
        assert_eq!(policy.classify_code("A"), Err(DropReason::ExcludedCode));
        assert_eq!(policy.classify_code("S"), Err(DropReason::ExcludedCode));
    }

    #[test]
    fn test_otc_symbols() {
        let policy = UsPolicy::new(UsConfig::default());
        assert!(policy.is_otc_symbol(""));
        assert!(policy.is_otc_symbol("BRK.B"));
        assert!(policy.is_otc_symbol("ABCDEFG"));
        assert!(!policy.is_otc_symbol("ACME"));
    }

    #[test]
    fn test_normalize_rows() {
        let table = make_table(&[
            ["jane doe", "Acme Corp", "ACME", "2025-08-08", "2025-08-11", "10.01", "P", "false"],
            ["big fund", "Acme Corp", "ACME", "2025-08-08", "2025-08-11", "10.00", "P", "true"],
            ["john roe", "Pink Co", "PINK.F", "2025-08-08", "2025-08-11", "1.00", "P", "false"],
            ["ann poe", "Acme Corp", "ACME", "2025-08-08", "2025-08-11", "n/a", "S", "0"],
            ["bob", "Acme Corp", "ACME", "2025-08-08", "2025-08-11", "10.00", "M", "0"],
        ]);
        let policy = UsPolicy::new(UsConfig::default());
        let normalized = policy.normalize(&table, DateBasis::Publication).unwrap();

        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.stats.dropped_ten_percent_owner, 1);
        assert_eq!(normalized.stats.dropped_otc, 1);
        assert_eq!(normalized.stats.dropped_unrecognized, 1);
        assert_eq!(normalized.stats.buy, 1);
        assert_eq!(normalized.stats.sell, 1);

        let first = &normalized.records[0];
        assert_eq!(first.row, 0);
        assert_eq!(first.issuer_key, "ACME CORP");
        assert_eq!(first.insider_id, "JANE DOE");
        assert_eq!(first.reference_date, NaiveDate::from_ymd_opt(2025, 8, 11));
        assert_relative_eq!(first.price.unwrap(), 10.01);

        let unpriced = &normalized.records[1];
        assert_eq!(unpriced.row, 3);
        assert_eq!(unpriced.direction, Some(Direction::Sell));
        assert!(unpriced.price.is_none());
    }

    #[test]
    fn test_retention_flags() {
        let table = make_table(&[
            ["big fund", "Acme Corp", "ACME", "2025-08-08", "2025-08-11", "10.00", "P", "true"],
            ["john roe", "Pink Co", "PINK.F", "2025-08-08", "2025-08-11", "1.00", "P", "false"],
        ]);
        let policy = UsPolicy::new(UsConfig {
            keep_otc: true,
            keep_ten_percent_owners: true,
            ..UsConfig::default()
        });
        let normalized = policy.normalize(&table, DateBasis::Transaction).unwrap();
        assert_eq!(normalized.records.len(), 2);
        assert_eq!(
            normalized.records[0].reference_date,
            NaiveDate::from_ymd_opt(2025, 8, 8)
        );
    }

    #[test]
    fn test_missing_columns() {
        let policy = UsPolicy::new(UsConfig::default());
        let table = Table::new(["buyer", "issuer", "filing_date"]);
        assert!(matches!(
            policy.normalize(&table, DateBasis::Publication),
            Err(Error::MissingColumn(_))
        ));

        let table = Table::new(["issuer", "transaction_code", "filing_date"]);
        assert!(policy.normalize(&table, DateBasis::Publication).is_ok());
        assert!(matches!(
            policy.normalize(&table, DateBasis::Transaction),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_group_key_ignores_instrument() {
        let policy = UsPolicy::new(UsConfig::default());
        let mut record = TransactionRecord::new(0, Source::Us, "ACME", "A");
        record.instrument_id = Some("X".to_string());
        let key = policy.group_key(&record);
        assert_eq!(key.issuer_key, "ACME");
        assert!(key.instrument_id.is_none());
        assert!(key.currency.is_none());
    }
}
