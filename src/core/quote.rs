//! Quote data model shared by every tier

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

/// ISO code of the fixed base unit all quotes are priced in.
pub const BASE_CURRENCY: &str = "THB";
pub const BASE_CURRENCY_NAME: &str = "Thai Baht";

/// Rates for one foreign currency, expressed as base-unit price per foreign unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub code: String,
    pub name: String,
    pub buying_sight: f64,
    pub buying_transfer: f64,
    pub selling: f64,
    pub average: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_buying_sight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_buying_transfer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_selling: Option<f64>,
}

impl RateQuote {
    pub fn new(
        code: &str,
        name: &str,
        buying_sight: f64,
        buying_transfer: f64,
        selling: f64,
        average: f64,
    ) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            buying_sight,
            buying_transfer,
            selling,
            average,
            original_buying_sight: None,
            original_buying_transfer: None,
            original_selling: None,
        }
    }

    /// The base unit priced against itself.
    pub fn base_unit() -> Self {
        Self::new(BASE_CURRENCY, BASE_CURRENCY_NAME, 1.0, 1.0, 1.0, 1.0)
    }
}

/// Quotes keyed by currency code. Ordered so rendering is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteTable(BTreeMap<String, RateQuote>);

impl QuoteTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a quote under its own code, replacing any earlier entry.
    pub fn insert(&mut self, quote: RateQuote) {
        self.0.insert(quote.code.clone(), quote);
    }

    pub fn get(&self, code: &str) -> Option<&RateQuote> {
        self.0.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn quotes(&self) -> impl Iterator<Item = &RateQuote> {
        self.0.values()
    }

    pub fn quotes_mut(&mut self) -> impl Iterator<Item = &mut RateQuote> {
        self.0.values_mut()
    }

    /// Returns the table with the synthesized base-unit entry, replacing any
    /// base-unit row a source may have supplied.
    pub fn with_base_unit(mut self) -> Self {
        self.insert(RateQuote::base_unit());
        self
    }
}

impl FromIterator<RateQuote> for QuoteTable {
    fn from_iter<I: IntoIterator<Item = RateQuote>>(iter: I) -> Self {
        let mut table = QuoteTable::new();
        for quote in iter {
            table.insert(quote);
        }
        table
    }
}

/// Which tier ended up supplying a quote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Primary,
    Alternate,
    Backup,
    Fallback,
}

impl Provenance {
    /// Suffix appended to the last-updated timestamp. Primary has none.
    pub fn suffix(&self) -> &'static str {
        match self {
            Provenance::Primary => "",
            Provenance::Alternate => " (Alternative Source)",
            Provenance::Backup => " (Backup Source)",
            Provenance::Fallback => " (Fallback Data)",
        }
    }

    /// Cache lifetime for data from this tier, given the configured duration.
    pub fn ttl(&self, cache_duration_secs: u64) -> Duration {
        let secs = match self {
            Provenance::Primary => cache_duration_secs,
            Provenance::Alternate | Provenance::Backup => cache_duration_secs.min(1800),
            Provenance::Fallback => cache_duration_secs.min(900),
        };
        Duration::from_secs(secs)
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Provenance::Primary => "primary",
                Provenance::Alternate => "alternate",
                Provenance::Backup => "backup",
                Provenance::Fallback => "fallback",
            }
        )
    }
}

/// Formats a fetch time the way `last_updated` strings carry it.
pub fn format_last_updated(fetched_at: &DateTime<Local>, provenance: Provenance) -> String {
    format!(
        "{}{}",
        fetched_at.format("%Y-%m-%d %H:%M:%S"),
        provenance.suffix()
    )
}

/// A quote table as handed to callers of a rates request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesPayload {
    pub rates: QuoteTable,
    pub last_updated: String,
    pub provenance: Provenance,
}
