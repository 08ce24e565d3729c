//! Configuration structures for the insider coordination engine.

use crate::error::{Error, Result};
use crate::types::{DateBasis, DirectionSelection};
use serde::{Deserialize, Serialize};

/// Main configuration for a flagging run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grouping and tolerance configuration.
    pub flagging: FlaggingConfig,
    /// US Form 4 normalization rules.
    pub us: UsConfig,
    /// FI PDMR normalization and dedup rules.
    pub fi: FiConfig,
}

impl Config {
    /// Parse a (possibly partial) JSON document; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check thresholds and rule tables for values the engine cannot use.
    pub fn validate(&self) -> Result<()> {
        let f = &self.flagging;
        if !f.abs_tol.is_finite() || f.abs_tol < 0.0 {
            return Err(Error::config(format!("abs_tol must be a non-negative number, got {}", f.abs_tol)));
        }
        if !f.pct_tol.is_finite() || f.pct_tol < 0.0 {
            return Err(Error::config(format!("pct_tol must be a non-negative number, got {}", f.pct_tol)));
        }
        if f.min_parties == 0 {
            return Err(Error::config("min_parties must be at least 1"));
        }
        if f.min_priced == 0 {
            return Err(Error::config("min_priced must be at least 1"));
        }
        if self.us.buy_codes.is_empty() && self.us.sell_codes.is_empty() {
            return Err(Error::config("us: no transaction codes mapped to a direction"));
        }
        if self.fi.buy_pattern.trim().is_empty() || self.fi.sell_pattern.trim().is_empty() {
            return Err(Error::config("fi: nature patterns must not be empty"));
        }
        Ok(())
    }
}

/// Grouping and tolerance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlaggingConfig {
    /// Direction pass(es) to evaluate.
    pub directions: DirectionSelection,
    /// Which date keys a group.
    pub date_basis: DateBasis,
    /// Maximum absolute price span for a match.
    pub abs_tol: f64,
    /// Maximum span relative to the median price for a match.
    pub pct_tol: f64,
    /// Minimum distinct insiders in a group.
    pub min_parties: u32,
    /// Minimum priced members before the tolerance tests apply.
    pub min_priced: u32,
}

impl Default for FlaggingConfig {
    fn default() -> Self {
        Self {
            directions: DirectionSelection::Buy,
            date_basis: DateBasis::Publication,
            abs_tol: 0.02,
            pct_tol: 0.003,
            min_parties: 2,
            min_priced: 1,
        }
    }
}

/// US Form 4 normalization rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsConfig {
    /// Transaction codes read as acquisitions.
    pub buy_codes: Vec<String>,
    /// Transaction codes read as disposals.
    pub sell_codes: Vec<String>,
    /// If set, only these codes are kept.
    pub include_codes: Option<Vec<String>>,
    /// Keep OTC / foreign-listed tickers.
    pub keep_otc: bool,
    /// Keep filings by 10%-owner reporting persons.
    pub keep_ten_percent_owners: bool,
    /// Symbols longer than this are treated as OTC.
    pub max_symbol_len: usize,
}

impl Default for UsConfig {
    fn default() -> Self {
        Self {
            buy_codes: vec!["P".to_string(), "C".to_string(), "A".to_string()],
            sell_codes: vec!["S".to_string(), "D".to_string(), "F".to_string()],
            include_codes: None,
            keep_otc: false,
            keep_ten_percent_owners: false,
            max_symbol_len: 6,
        }
    }
}

/// FI PDMR normalization and dedup rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiConfig {
    /// Case-insensitive pattern for acquisitions in the nature text.
    pub buy_pattern: String,
    /// Case-insensitive pattern for disposals in the nature text.
    pub sell_pattern: String,
    /// Keep `History` publications in the working set.
    pub keep_history: bool,
    /// Prefer `Revised` over `Notification` on duplicate filings.
    pub prefer_revised: bool,
}

impl Default for FiConfig {
    fn default() -> Self {
        Self {
            buy_pattern: "acquisition|purchase|förvärv|köp".to_string(),
            sell_pattern: "sale|disposal|försälj|avyttr".to_string(),
            keep_history: false,
            prefer_revised: true,
        }
    }
}
