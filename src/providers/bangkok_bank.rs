//! Parsing the bank's published rates page.
//!
//! Two strategies are tried in order: a scan of the rendered rate table, then
//! the inline `exchangeRates` array some page revisions embed in a script.
//! Neither does I/O; both hand back an empty table when the page does not
//! have the shape they look for.

use crate::core::config::SourceConfig;
use crate::core::numeric::clean_rate;
use crate::core::quote::{BASE_CURRENCY, QuoteTable, RateQuote};
use crate::providers::transport::FetchRequest;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static RATE_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"table[class*="table-rate"]"#).expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static CURRENCY_CODE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="currency-code"]"#).expect("valid selector")
});
static CURRENCY_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="currency-name"]"#).expect("valid selector")
});
static EMBEDDED_RATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)var\s+exchangeRates\s*=\s*(\[.*?\]);").expect("valid regex")
});

/// Builds the page request with browser-like headers.
pub fn page_request(source: &SourceConfig, verify_tls: bool) -> FetchRequest {
    FetchRequest::new(&source.url, source.timeout())
        .header("User-Agent", BROWSER_USER_AGENT)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "max-age=0")
        .verify_tls(verify_tls)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Rows of the `table-rate` table.
    StructuredScan,
    /// The inline `var exchangeRates = [...]` assignment.
    EmbeddedData,
}

impl ParseStrategy {
    /// Strategies in the order they are attempted.
    pub const ORDER: [ParseStrategy; 2] =
        [ParseStrategy::StructuredScan, ParseStrategy::EmbeddedData];

    pub fn parse(&self, html: &str) -> QuoteTable {
        match self {
            ParseStrategy::StructuredScan => scan_rate_table(html),
            ParseStrategy::EmbeddedData => extract_embedded_rates(html),
        }
    }
}

/// Runs the strategies in order and returns the first non-empty table.
pub fn parse_rates(html: &str) -> QuoteTable {
    for strategy in ParseStrategy::ORDER {
        let rates = strategy.parse(html);
        if !rates.is_empty() {
            debug!(?strategy, count = rates.len(), "Parsed rates page");
            return rates;
        }
        debug!(?strategy, "Strategy found no rates");
    }
    QuoteTable::new()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn scan_rate_table(html: &str) -> QuoteTable {
    let document = Html::parse_document(html);
    let mut rates = QuoteTable::new();

    let Some(table) = document.select(&RATE_TABLE).next() else {
        return rates;
    };

    // First row is the header
    for row in table.select(&ROW).skip(1) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        if cells.len() < 5 {
            continue;
        }

        let Some(code) = first_text(cells[0], &CURRENCY_CODE) else {
            continue;
        };
        if code == BASE_CURRENCY {
            continue;
        }
        let name = first_text(cells[0], &CURRENCY_NAME).unwrap_or_else(|| code.clone());

        rates.insert(RateQuote::new(
            &code,
            &name,
            clean_rate(&element_text(cells[1])),
            clean_rate(&element_text(cells[2])),
            clean_rate(&element_text(cells[3])),
            clean_rate(&element_text(cells[4])),
        ));
    }

    rates
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn value_rate(item: &Value, key: &str) -> Option<f64> {
    item.get(key).and_then(value_text).map(|s| clean_rate(&s))
}

fn extract_embedded_rates(html: &str) -> QuoteTable {
    let mut rates = QuoteTable::new();

    let Some(captures) = EMBEDDED_RATES.captures(html) else {
        return rates;
    };
    let items: Vec<Value> = match serde_json::from_str(&captures[1]) {
        Ok(items) => items,
        Err(e) => {
            debug!(error = %e, "Embedded rates are not a JSON array");
            return rates;
        }
    };

    for item in &items {
        let (Some(code), Some(buying_sight), Some(buying_transfer), Some(selling)) = (
            item.get("currencyCode").and_then(value_text),
            value_rate(item, "buyingRateSight"),
            value_rate(item, "buyingRateTransfer"),
            value_rate(item, "sellingRate"),
        ) else {
            continue;
        };
        let code = code.trim().to_string();
        if code.is_empty() || code == BASE_CURRENCY {
            continue;
        }

        let name = item
            .get("currencyName")
            .and_then(value_text)
            .unwrap_or_else(|| code.clone());
        let average = value_rate(item, "averageRate").unwrap_or(0.0);

        rates.insert(RateQuote::new(
            &code,
            &name,
            buying_sight,
            buying_transfer,
            selling,
            average,
        ));
    }

    rates
}
