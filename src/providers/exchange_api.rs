//! Adapters for public JSON feeds quoting foreign units per one base unit.

use crate::core::config::SourceConfig;
use crate::core::error::RateError;
use crate::core::quote::{QuoteTable, RateQuote};
use crate::providers::transport::FetchRequest;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Codes picked out of a feed; everything else it lists is ignored.
pub const COMMON_CURRENCIES: [&str; 13] = [
    "USD", "EUR", "GBP", "JPY", "CNY", "AUD", "SGD", "HKD", "CAD", "CHF", "MYR", "KRW", "TWD",
];

/// Display name for a currency code, or the code itself when unknown.
pub fn currency_name(code: &str) -> &str {
    match code {
        "USD" => "US Dollar",
        "EUR" => "Euro",
        "GBP" => "British Pound",
        "JPY" => "Japanese Yen",
        "CNY" => "Chinese Yuan",
        "AUD" => "Australian Dollar",
        "SGD" => "Singapore Dollar",
        "HKD" => "Hong Kong Dollar",
        "CAD" => "Canadian Dollar",
        "CHF" => "Swiss Franc",
        "MYR" => "Malaysian Ringgit",
        "KRW" => "South Korean Won",
        "TWD" => "Taiwan Dollar",
        other => other,
    }
}

/// A feed value as a number; numeric strings are accepted too.
fn feed_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    rates: HashMap<String, serde_json::Value>,
}

/// A feed endpoint together with the label used in errors and logs.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub label: &'static str,
    pub source: SourceConfig,
}

impl FeedSource {
    pub fn new(label: &'static str, source: SourceConfig) -> Self {
        Self { label, source }
    }

    pub fn request(&self, verify_tls: bool) -> FetchRequest {
        FetchRequest::new(&self.source.url, self.source.timeout()).verify_tls(verify_tls)
    }

    /// Turns a `{ "rates": { CODE: per_base_unit } }` document into quotes.
    ///
    /// Each value is inverted to a base-unit price per foreign unit and given
    /// a synthetic spread around it. Codes outside [`COMMON_CURRENCIES`] and
    /// values that are not positive numbers are skipped.
    pub fn adapt(&self, body: &str) -> Result<QuoteTable, RateError> {
        let feed: FeedResponse = serde_json::from_str(body).map_err(|e| {
            debug!(feed = self.label, error = %e, "Feed did not parse");
            RateError::InvalidResponse(format!("{} API", self.label))
        })?;

        let rates = COMMON_CURRENCIES
            .iter()
            .filter_map(|code| {
                let per_base = feed_value(feed.rates.get(*code)?)?;
                if !per_base.is_finite() || per_base <= 0.0 {
                    return None;
                }
                let rate = 1.0 / per_base;
                Some(RateQuote::new(
                    code,
                    currency_name(code),
                    rate * 0.98,
                    rate * 0.99,
                    rate * 1.01,
                    rate,
                ))
            })
            .collect();

        Ok(rates)
    }
}
