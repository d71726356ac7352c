//! crates/subtrack_core/src/currency.rs
//!
//! Price parsing and conversion into the home currency.
//!
//! The parser is deliberately forgiving: prices are free text typed by the user,
//! so anything it cannot make sense of becomes a zero value in the home currency
//! instead of an error.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// The currency every amount is normalised into.
pub const HOME_CURRENCY: &str = "INR";

/// Symbols that follow the rate of an ISO code after a live refresh.
const SYMBOL_ALIASES: &[(&str, &str)] = &[("₹", "INR"), ("$", "USD"), ("€", "EUR"), ("£", "GBP")];

/// Units of INR per unit, used until the first successful refresh.
const FALLBACK_RATES: &[(&str, f64)] = &[
    ("₹", 1.0),
    ("INR", 1.0),
    ("$", 85.5),
    ("USD", 85.5),
    ("€", 93.0),
    ("EUR", 93.0),
    ("£", 108.0),
    ("GBP", 108.0),
];

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex"));

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RateError {
    #[error("reference rates do not include the home currency {0}")]
    MissingHome(String),
}

/// Result of parsing a free-text price.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    pub value: f64,
    /// The matched symbol or code, as it appears in the rate table.
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Fallback,
    Live,
}

/// Mapping from currency symbol or code to units of home currency per unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    home: String,
    rates: BTreeMap<String, f64>,
    source: RateSource,
    updated_at: Option<DateTime<Utc>>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::fallback()
    }
}

impl RateTable {
    /// The built-in table of approximate rates.
    pub fn fallback() -> Self {
        Self {
            home: HOME_CURRENCY.to_string(),
            rates: FALLBACK_RATES
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            source: RateSource::Fallback,
            updated_at: None,
        }
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn source(&self) -> RateSource {
        self.source
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    /// Replaces or adds a single entry.
    pub fn set_rate(&mut self, currency: impl Into<String>, rate: f64) {
        self.rates.insert(currency.into(), rate);
    }

    /// Keys ordered so that a code is never matched as part of a longer one.
    fn keys_longest_first(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        keys.sort_by_key(|k| (Reverse(k.chars().count()), *k));
        keys
    }

    /// Splits a price such as `"$9.99"` or `"1,299 INR"` into value and currency.
    pub fn parse_price(&self, text: &str) -> ParsedPrice {
        let clean = text.trim();
        if clean.is_empty() {
            return ParsedPrice {
                value: 0.0,
                currency: self.home.clone(),
            };
        }

        let (currency, remainder) = match self
            .keys_longest_first()
            .into_iter()
            .find(|key| clean.contains(key))
        {
            Some(key) => (key.to_string(), clean.replacen(key, "", 1)),
            None => (self.home.clone(), clean.to_string()),
        };

        ParsedPrice {
            value: leading_number(&remainder.replace(',', "")).unwrap_or(0.0),
            currency,
        }
    }

    /// Converts a price into the home currency. Unknown currencies count 1:1.
    pub fn convert_to_home(&self, text: &str) -> f64 {
        let parsed = self.parse_price(text);
        parsed.value * self.rate(&parsed.currency).unwrap_or(1.0)
    }

    /// Converts a home amount into `currency`.
    ///
    /// Returns the currency actually used: the home tag when `currency` has no
    /// usable rate.
    pub fn to_display(&self, amount_home: f64, currency: &str) -> (String, f64) {
        match self.rate(currency).filter(|r| r.is_finite() && *r > 0.0) {
            Some(rate) => (currency.to_string(), amount_home / rate),
            None => (self.home.clone(), amount_home),
        }
    }

    /// Applies a table keyed by some reference currency (for example
    /// `{"USD": 1.0, "INR": 83.2, ...}`) and returns how many codes were updated.
    ///
    /// Each code becomes `rate[home] / rate[code]`, so the reference currency
    /// itself does not matter. Symbol aliases are patched from their codes.
    pub fn apply_reference_rates(
        &mut self,
        reference: &HashMap<String, f64>,
        at: DateTime<Utc>,
    ) -> Result<usize, RateError> {
        let home_rate = reference
            .get(&self.home)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| RateError::MissingHome(self.home.clone()))?;

        let mut updated = 0;
        for (code, rate) in reference {
            if !rate.is_finite() || *rate <= 0.0 {
                continue;
            }
            self.rates.insert(code.clone(), home_rate / rate);
            updated += 1;
        }

        for (symbol, code) in SYMBOL_ALIASES {
            if let Some(rate) = self.rate(code) {
                self.rates.insert(symbol.to_string(), rate);
            }
        }

        self.source = RateSource::Live;
        self.updated_at = Some(at);
        Ok(updated)
    }
}

/// Parses the leading decimal number of `text`, ignoring leading whitespace.
fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
