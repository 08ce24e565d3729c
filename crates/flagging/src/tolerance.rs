//! Price-tolerance evaluation of coordination groups.
//!
//! A group matches when enough distinct insiders traded and the priced
//! members sit within the absolute or the relative span tolerance. Unpriced
//! members count as parties but never widen the span.

use crate::grouping::CoordinationGroup;
use insider_core::config::FlaggingConfig;
use insider_core::{GroupVerdict, BASIS_ABS, BASIS_PCT};
use serde::Serialize;
use statrs::statistics::{Data, Median};

/// Slack on tolerance comparisons, so `10.02 - 10.00` passes `abs_tol = 0.02`.
pub const EPS: f64 = 1e-9;

/// Thresholds for tolerance evaluation.
#[derive(Debug, Clone)]
pub struct ToleranceConfig {
    /// Maximum absolute span.
    pub abs_tol: f64,
    /// Maximum span relative to the median price.
    pub pct_tol: f64,
    /// Minimum distinct insiders.
    pub min_parties: u32,
    /// Minimum priced members.
    pub min_priced: u32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self::from(&FlaggingConfig::default())
    }
}

impl From<&FlaggingConfig> for ToleranceConfig {
    fn from(config: &FlaggingConfig) -> Self {
        Self {
            abs_tol: config.abs_tol,
            pct_tol: config.pct_tol,
            min_parties: config.min_parties,
            min_priced: config.min_priced,
        }
    }
}

/// Dispersion of a group's priced members.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSpan {
    /// Number of priced members.
    pub priced: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// `max - min`.
    pub span_abs: f64,
    /// `span_abs / median`; 0 when the median is zero.
    pub span_pct: f64,
}

impl PriceSpan {
    /// Span of a price list; `None` when it is empty.
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let median = Data::new(prices.to_vec()).median();
        let span_abs = max - min;
        let span_pct = if median.is_finite() && median != 0.0 {
            span_abs / median
        } else {
            0.0
        };
        Some(Self {
            priced: prices.len(),
            min,
            max,
            median,
            span_abs,
            span_pct,
        })
    }

    /// Whether the relative test can apply; a zero median reports
    /// `span_pct = 0` but never passes it.
    #[inline]
    pub fn has_relative_basis(&self) -> bool {
        self.median.is_finite() && self.median != 0.0
    }
}

/// Full result of evaluating one group.
#[derive(Debug, Clone)]
pub struct GroupEvaluation {
    /// Unique insiders in the group.
    pub distinct_parties: u32,
    /// Price dispersion; `None` for unpriced-only groups.
    pub span: Option<PriceSpan>,
    /// Absolute span test passed.
    pub abs_ok: bool,
    /// Relative span test passed.
    pub pct_ok: bool,
    /// Verdict broadcast to the group's rows.
    pub verdict: GroupVerdict,
}

impl GroupEvaluation {
    /// Whether the group was flagged.
    #[inline]
    pub fn is_match(&self) -> bool {
        self.verdict.matched
    }
}

/// Tolerance evaluator.
#[derive(Debug, Clone)]
pub struct ToleranceEvaluator {
    config: ToleranceConfig,
}

impl ToleranceEvaluator {
    /// Create a new evaluator.
    pub fn new(config: ToleranceConfig) -> Self {
        Self { config }
    }

    /// Evaluate a group.
    pub fn evaluate(&self, group: &CoordinationGroup<'_>) -> GroupEvaluation {
        self.evaluate_parts(group.distinct_parties(), &group.prices())
    }

    /// Evaluate from a party count and the priced members' prices.
    pub fn evaluate_parts(&self, distinct_parties: u32, prices: &[f64]) -> GroupEvaluation {
        let span = PriceSpan::from_prices(prices);

        let (abs_ok, pct_ok) = match &span {
            Some(s) if s.priced >= self.config.min_priced as usize => (
                s.span_abs <= self.config.abs_tol + EPS,
                s.has_relative_basis() && s.span_pct <= self.config.pct_tol + EPS,
            ),
            _ => (false, false),
        };

        let matched = distinct_parties >= self.config.min_parties && (abs_ok || pct_ok);
        let verdict = match (&span, matched) {
            (Some(s), true) => GroupVerdict {
                matched: true,
                distinct_parties,
                span_abs: s.span_abs,
                span_pct: s.span_pct,
                basis: basis_label(abs_ok, pct_ok).to_string(),
            },
            _ => GroupVerdict::unmatched(),
        };

        GroupEvaluation {
            distinct_parties,
            span,
            abs_ok,
            pct_ok,
            verdict,
        }
    }
}

impl Default for ToleranceEvaluator {
    fn default() -> Self {
        Self::new(ToleranceConfig::default())
    }
}

/// Label of the test that decided the match; the absolute test takes precedence.
fn basis_label(abs_ok: bool, pct_ok: bool) -> &'static str {
    match (abs_ok, pct_ok) {
        (true, _) => BASIS_ABS,
        (false, true) => BASIS_PCT,
        (false, false) => "",
    }
}
