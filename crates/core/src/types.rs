//! Core data types for the insider coordination engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Basis label when the absolute span test passed (whatever the relative test says).
pub const BASIS_ABS: &str = "abs";
/// Basis label when only the relative span test passed.
pub const BASIS_PCT: &str = "pct";

/// Trading direction of an insider transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Acquisition of the issuer's securities.
    Buy,
    /// Disposal of the issuer's securities.
    Sell,
}

impl Direction {
    /// Both directions, in evaluation order.
    pub const ALL: [Direction; 2] = [Direction::Buy, Direction::Sell];

    /// Column-name suffix ("buy" / "sell").
    #[inline]
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }

    /// Names of the flag columns written for this direction.
    pub fn columns(self) -> FlagColumns {
        match self {
            Direction::Buy => FlagColumns::BUY,
            Direction::Sell => FlagColumns::SELL,
        }
    }
}

/// Which direction passes a run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionSelection {
    Buy,
    Sell,
    Both,
}

impl DirectionSelection {
    /// Directions to evaluate, Buy first.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            DirectionSelection::Buy => &[Direction::Buy],
            DirectionSelection::Sell => &[Direction::Sell],
            DirectionSelection::Both => &Direction::ALL,
        }
    }

    /// Whether the given direction is evaluated.
    pub fn includes(self, direction: Direction) -> bool {
        self.directions().contains(&direction)
    }
}

/// Regulatory source of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// US SEC Form 4.
    Us,
    /// Swedish FI PDMR register.
    Fi,
}

/// Which date a coordination group is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBasis {
    /// Filing / publication date.
    Publication,
    /// Trade / transaction date.
    Transaction,
}

/// Publication status of an FI filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevisionStatus {
    /// First publication of a transaction.
    Notification,
    /// Amended publication superseding an earlier one.
    Revised,
    /// Historical restatement.
    History,
}

impl RevisionStatus {
    /// Parse a status cell (case-insensitive). Unknown text yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "notification" => Some(RevisionStatus::Notification),
            "revised" => Some(RevisionStatus::Revised),
            "history" => Some(RevisionStatus::History),
            _ => None,
        }
    }
}

/// A normalized insider transaction, tied back to its table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Index of the originating row in the input table.
    pub row: usize,
    /// Filing source.
    pub source: Source,
    /// Normalized issuer identity.
    pub issuer_key: String,
    /// Normalized reporting-person identity.
    pub insider_id: String,
    /// Resolved direction; `None` when the nature text matched neither pattern.
    pub direction: Option<Direction>,
    /// Date used for grouping (per the run's date basis).
    pub reference_date: Option<NaiveDate>,
    /// Publication / filing date.
    pub publication_date: Option<NaiveDate>,
    /// Trade date.
    pub transaction_date: Option<NaiveDate>,
    /// Price per share; `None` when missing or unparseable.
    pub price: Option<f64>,
    /// Number of shares / units.
    pub volume: Option<f64>,
    /// FI publication status.
    pub revision_status: Option<RevisionStatus>,
    /// FI currency.
    pub currency: Option<String>,
    /// FI instrument identity (ISIN or instrument name).
    pub instrument_id: Option<String>,
}

impl TransactionRecord {
    /// Create a record with only the identity fields set.
    pub fn new(row: usize, source: Source, issuer_key: impl Into<String>, insider_id: impl Into<String>) -> Self {
        Self {
            row,
            source,
            issuer_key: issuer_key.into(),
            insider_id: insider_id.into(),
            direction: None,
            reference_date: None,
            publication_date: None,
            transaction_date: None,
            price: None,
            volume: None,
            revision_status: None,
            currency: None,
            instrument_id: None,
        }
    }

    /// Whether the record carries a usable price.
    #[inline]
    pub fn is_priced(&self) -> bool {
        self.price.is_some()
    }
}

/// Key of a coordination group (within one direction pass).
///
/// `currency` and `instrument_id` are only populated for FI records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub issuer_key: String,
    pub reference_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub instrument_id: Option<String>,
}

/// Verdict of one coordination group, broadcast to each of its rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupVerdict {
    /// Whether the group was flagged as coordinated.
    pub matched: bool,
    /// Distinct insiders in the group.
    pub distinct_parties: u32,
    /// Absolute price span (max - min).
    pub span_abs: f64,
    /// Span relative to the median price.
    pub span_pct: f64,
    /// Which tolerance test(s) passed.
    pub basis: String,
}

impl GroupVerdict {
    /// The all-default verdict: `(false, 0, NaN, NaN, "")`.
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            distinct_parties: 0,
            span_abs: f64::NAN,
            span_pct: f64::NAN,
            basis: String::new(),
        }
    }

    /// Whether this is the all-default tuple.
    pub fn is_default(&self) -> bool {
        !self.matched
            && self.distinct_parties == 0
            && self.span_abs.is_nan()
            && self.span_pct.is_nan()
            && self.basis.is_empty()
    }
}

/// NaN spans compare equal, so two default verdicts are equal.
impl PartialEq for GroupVerdict {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }
        self.matched == other.matched
            && self.distinct_parties == other.distinct_parties
            && same(self.span_abs, other.span_abs)
            && same(self.span_pct, other.span_pct)
            && self.basis == other.basis
    }
}

impl Default for GroupVerdict {
    fn default() -> Self {
        Self::unmatched()
    }
}

/// Per-row flag tuples for both directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSet {
    pub buy: GroupVerdict,
    pub sell: GroupVerdict,
}

impl FlagSet {
    /// Flags for one direction.
    pub fn get(&self, direction: Direction) -> &GroupVerdict {
        match direction {
            Direction::Buy => &self.buy,
            Direction::Sell => &self.sell,
        }
    }

    /// Mutable flags for one direction.
    pub fn get_mut(&mut self, direction: Direction) -> &mut GroupVerdict {
        match direction {
            Direction::Buy => &mut self.buy,
            Direction::Sell => &mut self.sell,
        }
    }
}

/// Output column names of one flag tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagColumns {
    pub coordinated: &'static str,
    pub parties: &'static str,
    pub span_abs: &'static str,
    pub span_pct: &'static str,
    pub basis: &'static str,
}

impl FlagColumns {
    /// Buy-direction columns.
    pub const BUY: FlagColumns = FlagColumns {
        coordinated: "coordinated_buy",
        parties: "coordinated_buy_parties",
        span_abs: "coord_buy_span_abs",
        span_pct: "coord_buy_span_pct",
        basis: "coord_buy_basis",
    };

    /// Sell-direction columns.
    pub const SELL: FlagColumns = FlagColumns {
        coordinated: "coordinated_sell",
        parties: "coordinated_sell_parties",
        span_abs: "coord_sell_span_abs",
        span_pct: "coord_sell_span_pct",
        basis: "coord_sell_basis",
    };

    /// Single-direction column names kept for older consumers (mirror Buy).
    pub const LEGACY: FlagColumns = FlagColumns {
        coordinated: "coordinated",
        parties: "coordinated_buyers",
        span_abs: "coord_span_abs",
        span_pct: "coord_span_pct",
        basis: "coord_basis",
    };

    /// All five names, in output order.
    pub fn names(&self) -> [&'static str; 5] {
        [
            self.coordinated,
            self.parties,
            self.span_abs,
            self.span_pct,
            self.basis,
        ]
    }
}
